//! # Thread affinity of a subscription.

/// Where a subscriber's action runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThreadOption {
    /// On the publisher's thread, before `publish` returns.
    #[default]
    Publisher,
    /// On a worker thread; `publish` does not wait for it.
    Background,
    /// On the execution context attached to the channel (UI loop, actor, ...).
    Context,
}

impl ThreadOption {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ThreadOption::Publisher => "publisher",
            ThreadOption::Background => "background",
            ThreadOption::Context => "context",
        }
    }
}
