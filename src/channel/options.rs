//! # Subscription options.
//!
//! [`SubscribeOptions`] bundles everything a subscription can be configured
//! with beyond its action. Defaults match a plain `subscribe`:
//!
//! | option        | default                   |
//! |---------------|---------------------------|
//! | `thread`      | [`ThreadOption::Publisher`] |
//! | `keep_alive`  | `false` (weak action)     |
//! | `filter`      | accept everything         |
//! | `subscriber`  | none                      |
//! | `accept_from` | [`Relationship::ANY`]     |

use std::fmt;
use std::sync::Arc;

use crate::address::{CommunicatorAddress, Relationship};
use crate::delegates::{always_true, DelegateReference, Filter, FilterFn};
use crate::dispatch::ThreadOption;

enum FilterSpec<T> {
    Always,
    Shared(Filter<T>),
    Owned(Filter<T>),
}

/// Builder-style options for [`EventChannel::subscribe_with`](crate::EventChannel::subscribe_with).
pub struct SubscribeOptions<T> {
    pub(crate) thread: ThreadOption,
    pub(crate) keep_alive: bool,
    filter: FilterSpec<T>,
    pub(crate) subscriber: Option<CommunicatorAddress>,
    pub(crate) accept_from: Relationship,
}

impl<T: 'static> SubscribeOptions<T> {
    /// Options with every default.
    pub fn new() -> Self {
        Self {
            thread: ThreadOption::default(),
            keep_alive: false,
            filter: FilterSpec::Always,
            subscriber: None,
            accept_from: Relationship::ANY,
        }
    }

    /// Where the action runs.
    pub fn thread(mut self, thread: ThreadOption) -> Self {
        self.thread = thread;
        self
    }

    /// Holds the action (and a shared filter) strongly until unsubscribed.
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Shared filter; held weakly unless `keep_alive` is set.
    pub fn filter(mut self, filter: &Filter<T>) -> Self {
        self.filter = FilterSpec::Shared(Arc::clone(filter));
        self
    }

    /// Filter closure owned by the subscription (always held strongly).
    pub fn filter_fn<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = FilterSpec::Owned(Arc::new(filter));
        self
    }

    /// Address of the subscribing communicator.
    pub fn subscriber(mut self, address: CommunicatorAddress) -> Self {
        self.subscriber = Some(address);
        self
    }

    /// Only accept payloads from publishers in this relationship to the subscriber.
    ///
    /// Requires [`subscriber`](Self::subscriber) unless the mask is [`Relationship::ANY`].
    pub fn accept_from(mut self, accept_from: Relationship) -> Self {
        self.accept_from = accept_from;
        self
    }

    pub(crate) fn filter_reference(&self) -> DelegateReference<FilterFn<T>> {
        match &self.filter {
            FilterSpec::Always => DelegateReference::strong(always_true()),
            FilterSpec::Shared(filter) => DelegateReference::new(filter, self.keep_alive),
            FilterSpec::Owned(filter) => DelegateReference::strong(Arc::clone(filter)),
        }
    }
}

impl<T: 'static> Default for SubscribeOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SubscribeOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = match self.filter {
            FilterSpec::Always => "always",
            FilterSpec::Shared(_) => "shared",
            FilterSpec::Owned(_) => "owned",
        };
        f.debug_struct("SubscribeOptions")
            .field("thread", &self.thread)
            .field("keep_alive", &self.keep_alive)
            .field("filter", &filter)
            .field("subscriber", &self.subscriber.as_ref().map(CommunicatorAddress::as_str))
            .field("accept_from", &self.accept_from)
            .finish()
    }
}
