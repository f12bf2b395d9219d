//! Typed channels and their subscriptions.
//!
//! - [`EventChannel`] subscriber list and publish loop for one payload type
//! - [`EventSubscription`], [`ExecutionStrategy`] one subscriber and its per-publish resolution
//! - [`SubscribeOptions`] thread, lifetime, filter and relationship settings

mod event_channel;
mod options;
mod subscription;

pub use event_channel::EventChannel;
pub use options::SubscribeOptions;
pub use subscription::{EventSubscription, ExecutionStrategy};
