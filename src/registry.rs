//! # Event registry: one channel per payload type.
//!
//! [`EventRegistry`] is the entry point communicators share. Channels are
//! created lazily on first request and live as long as the registry (or any
//! handle to them).
//!
//! ```text
//! registry.channel::<T>()
//!     └─► DashMap<TypeId, Box<dyn Any>>::entry(TypeId::of::<T>())
//!            ├─ vacant   ─► EventChannel::<T>::with_config(config) (+ default context)
//!            └─ occupied ─► existing channel
//!         ─► downcast ─► EventChannel<T> (cheap clone of the same channel)
//! ```
//!
//! ## Rules
//! - At most one channel per type, even under concurrent first access.
//! - Cloning the registry shares the channels.
//! - A default context set on the registry is attached to channels created
//!   after it was set; existing channels keep theirs.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::address::Communicator;
use crate::channel::EventChannel;
use crate::config::BusConfig;
use crate::dispatch::ExecutionContext;

type AnyChannel = Box<dyn Any + Send + Sync>;

/// Shared map from payload type to [`EventChannel`].
#[derive(Clone)]
pub struct EventRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    config: BusConfig,
    channels: DashMap<TypeId, AnyChannel>,
    context: RwLock<Option<Arc<dyn ExecutionContext>>>,
}

impl EventRegistry {
    /// Creates an empty registry with the default [`BusConfig`].
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates an empty registry whose channels use `config`.
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                channels: DashMap::new(),
                context: RwLock::new(None),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Returns the channel for `T`, creating it on first use.
    pub fn channel<T: Send + Sync + 'static>(&self) -> EventChannel<T> {
        let entry = self
            .inner
            .channels
            .entry(TypeId::of::<T>())
            .or_insert_with(|| -> AnyChannel { Box::new(self.create_channel::<T>()) });

        let any: &(dyn Any + Send + Sync) = &**entry;
        match any.downcast_ref::<EventChannel<T>>() {
            Some(channel) => channel.clone(),
            // entries are keyed by the TypeId of their payload
            None => unreachable!("channel registered under a foreign TypeId"),
        }
    }

    fn create_channel<T: Send + Sync + 'static>(&self) -> EventChannel<T> {
        let channel = EventChannel::<T>::with_config(self.inner.config.clone());
        if let Some(context) = self.context() {
            channel.set_context(context);
        }
        tracing::debug!(channel = channel.name(), "channel created");
        channel
    }

    /// True if the channel for `T` has been created.
    pub fn has_channel<T: 'static>(&self) -> bool {
        self.inner.channels.contains_key(&TypeId::of::<T>())
    }

    /// Number of channels created so far.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    /// Sets the context inherited by channels created from now on.
    pub fn set_context(&self, context: Arc<dyn ExecutionContext>) {
        *self.inner.context.write() = Some(context);
    }

    pub fn context(&self) -> Option<Arc<dyn ExecutionContext>> {
        self.inner.context.read().clone()
    }

    /// Hands this registry to `communicator`.
    pub fn attach(&self, communicator: &dyn Communicator) {
        tracing::debug!(communicator = %communicator.communicator_id(), "registry attached");
        communicator.set_event_registry(self.clone());
    }

    /// True if both handles share the same channels.
    pub fn same_registry(&self, other: &EventRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("channels", &self.inner.channels.len())
            .field("config", &self.inner.config)
            .finish()
    }
}
