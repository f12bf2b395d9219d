//! # Bus configuration.
//!
//! Provides [`BusConfig`], the settings an [`EventRegistry`](crate::EventRegistry)
//! hands to every channel it creates.
//!
//! Config is used in two ways:
//! 1. **Registry creation**: `EventRegistry::with_config(config)`
//! 2. **Standalone channels**: `EventChannel::with_config(config)`

use std::borrow::Cow;

/// Configuration shared by the channels of one registry.
///
/// ## Field semantics
/// - `prune_collected`: drop collected subscriptions after a publish pass that met any
/// - `background_thread_name`: name of OS threads spawned for background delivery
/// - `prefer_runtime`: use the current tokio runtime's blocking pool when available
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Compact the subscription list when a publish pass finds collected entries.
    ///
    /// When `false`, collected subscriptions stay in place (inert) until
    /// [`EventChannel::prune`](crate::EventChannel::prune) is called.
    pub prune_collected: bool,

    /// Thread name for background delivery outside a tokio runtime.
    pub background_thread_name: Cow<'static, str>,

    /// Offload background delivery to the tokio blocking pool.
    ///
    /// The runtime is the one current on the publisher's thread at publish
    /// time. Without one, a named OS thread is spawned per delivery.
    pub prefer_runtime: bool,
}

impl BusConfig {
    /// Returns the background thread name, falling back to the default if empty.
    #[inline]
    pub fn thread_name(&self) -> &str {
        if self.background_thread_name.is_empty() {
            DEFAULT_THREAD_NAME
        } else {
            &self.background_thread_name
        }
    }
}

const DEFAULT_THREAD_NAME: &str = "commbus-background";

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `prune_collected = true`
    /// - `background_thread_name = "commbus-background"`
    /// - `prefer_runtime = true`
    fn default() -> Self {
        Self {
            prune_collected: true,
            background_thread_name: Cow::Borrowed(DEFAULT_THREAD_NAME),
            prefer_runtime: true,
        }
    }
}
