//! # Delivery strategies.
//!
//! A subscription decides *whether* to call its action (filter, relationship
//! gate); a [`Delivery`] decides *where* the call runs.
//!
//! ```text
//! ExecutionStrategy::invoke(payload)
//!     │ filter + gate passed
//!     ▼
//! Delivery::deliver(job)
//!     ├── Immediate        ─► job() on the publisher thread     ─► Completed
//!     ├── Background       ─► spawn_blocking / named OS thread  ─► Queued
//!     └── ContextDelivery  ─► ExecutionContext::post(job)       ─► Queued
//! ```
//!
//! ## Panic handling
//! - `Immediate` lets a panic unwind into the channel, which records it as a
//!   publish failure and moves on to the next subscriber.
//! - `Background` jobs are wrapped in `catch_unwind`; a panic is logged.
//!   The publisher has already returned by then.
//! - Context jobs are isolated by the context itself (see [`ContextLoop`](crate::ContextLoop)).

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::BusConfig;
use crate::dispatch::context::ExecutionContext;
use crate::dispatch::thread::ThreadOption;

/// Unit of work handed to a delivery strategy.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Outcome of offering a payload to one subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Filter or relationship gate rejected the payload.
    Skipped,
    /// Action ran to completion on the publisher thread.
    Completed,
    /// Action was handed to another thread or context.
    Queued,
    /// The job could not be handed over.
    Failed(String),
}

impl Dispatched {
    /// True if the action ran or will run.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Dispatched::Completed | Dispatched::Queued)
    }
}

/// Where and how an accepted job runs.
pub trait Delivery: Send + Sync {
    /// Runs or schedules `job`.
    fn deliver(&self, job: Job) -> Dispatched;

    /// Thread option this strategy implements.
    fn thread_option(&self) -> ThreadOption;
}

/// Runs the job inline.
#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl Delivery for Immediate {
    fn deliver(&self, job: Job) -> Dispatched {
        job();
        Dispatched::Completed
    }

    fn thread_option(&self) -> ThreadOption {
        ThreadOption::Publisher
    }
}

/// Fire-and-forget delivery on a worker thread.
///
/// The runtime is looked up on every delivery, from the publisher's thread,
/// never cached: a runtime current at subscribe time may have shut down.
#[derive(Clone, Debug)]
pub struct Background {
    prefer_runtime: bool,
    thread_name: String,
}

impl Background {
    /// Uses the publisher's tokio runtime when `config.prefer_runtime` is set.
    pub fn new(config: &BusConfig) -> Self {
        Self {
            prefer_runtime: config.prefer_runtime,
            thread_name: config.thread_name().to_string(),
        }
    }

    /// Always spawns a named OS thread per job.
    pub fn on_threads(thread_name: impl Into<String>) -> Self {
        Self {
            prefer_runtime: false,
            thread_name: thread_name.into(),
        }
    }

    /// True if jobs go to the publisher's tokio blocking pool when one is current.
    pub fn prefers_runtime(&self) -> bool {
        self.prefer_runtime
    }

    fn runtime(&self) -> Option<Handle> {
        if !self.prefer_runtime {
            return None;
        }
        Handle::try_current().ok()
    }
}

impl Delivery for Background {
    fn deliver(&self, job: Job) -> Dispatched {
        let job = move || {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(job)) {
                tracing::warn!(
                    panic = %panic_message(&*panic_err),
                    "background subscriber panicked"
                );
            }
        };

        if let Some(runtime) = self.runtime() {
            drop(runtime.spawn_blocking(job));
            return Dispatched::Queued;
        }

        match std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(job)
        {
            Ok(_) => Dispatched::Queued,
            Err(err) => {
                tracing::error!(thread = %self.thread_name, error = %err, "failed to spawn background thread");
                Dispatched::Failed(format!("spawn {}: {err}", self.thread_name))
            }
        }
    }

    fn thread_option(&self) -> ThreadOption {
        ThreadOption::Background
    }
}

/// Posts jobs onto an [`ExecutionContext`].
#[derive(Clone)]
pub struct ContextDelivery {
    context: Arc<dyn ExecutionContext>,
}

impl ContextDelivery {
    pub fn new(context: Arc<dyn ExecutionContext>) -> Self {
        Self { context }
    }
}

impl Delivery for ContextDelivery {
    fn deliver(&self, job: Job) -> Dispatched {
        if self.context.post(job) {
            Dispatched::Queued
        } else {
            Dispatched::Failed(format!("context `{}` is closed", self.context.name()))
        }
    }

    fn thread_option(&self) -> ThreadOption {
        ThreadOption::Context
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(panic_err: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic_err.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_immediate_runs_inline() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        let out = Immediate.deliver(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));
        assert_eq!(out, Dispatched::Completed);
        assert_eq!(rx.try_recv().unwrap(), caller);
    }

    #[test]
    fn test_background_without_runtime_uses_named_thread() {
        let caller = std::thread::current().id();
        let background = Background::on_threads("bg-test");
        assert!(!background.prefers_runtime());

        let (tx, rx) = mpsc::channel();
        let out = background.deliver(Box::new(move || {
            let me = std::thread::current();
            tx.send((me.id(), me.name().map(str::to_string))).unwrap();
        }));
        assert_eq!(out, Dispatched::Queued);

        let (id, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(id, caller);
        assert_eq!(name.as_deref(), Some("bg-test"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_background_prefers_runtime() {
        let background = Background::new(&BusConfig::default());
        assert!(background.prefers_runtime());

        let (tx, rx) = tokio::sync::oneshot::channel();
        assert!(background
            .deliver(Box::new(move || {
                let name = std::thread::current().name().map(str::to_string);
                let _ = tx.send(name);
            }))
            .is_delivered());
        assert_ne!(rx.await.unwrap().as_deref(), Some("commbus-background"));
    }

    #[test]
    fn test_background_outlives_subscribe_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let background = runtime.block_on(async { Background::new(&BusConfig::default()) });
        drop(runtime);

        let (tx, rx) = mpsc::channel();
        let out = background.deliver(Box::new(move || {
            tx.send(std::thread::current().name().map(str::to_string)).unwrap();
        }));
        assert_eq!(out, Dispatched::Queued);

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("commbus-background"));
    }

    #[test]
    fn test_background_panic_is_contained() {
        let background = Background::on_threads("bg-panic");
        let out = background.deliver(Box::new(|| panic!("boom")));
        assert_eq!(out, Dispatched::Queued);
    }

    #[test]
    fn test_panic_message() {
        let err = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*err), "static");
        let err = catch_unwind(|| panic!("{}", String::from("owned"))).unwrap_err();
        assert_eq!(panic_message(&*err), "owned");
    }
}
