//! # Typed event channel.
//!
//! [`EventChannel<T>`] owns the subscriptions for one payload type and fans
//! each published payload out to them.
//!
//! ```text
//! subscribe*(action, options) ──► EventSubscription ──► RwLock<Vec<Arc<_>>>
//!                                                            │
//! publish(payload) ── snapshot (read lock, released) ◄───────┘
//!        │
//!        ├─ for each subscription: execution_strategy()?.invoke(&payload)
//!        │     panics and dispatch failures are collected, the pass continues
//!        ├─ prune inert subscriptions (if configured)
//!        └─ Ok(()) | Err(PublishError::SubscribersFailed)
//! ```
//!
//! ## Rules
//! - Subscriptions run in registration order.
//! - A subscription added while a publish is running is not called by that publish.
//! - Subscribing or unsubscribing from inside an action never deadlocks:
//!   no lock is held while actions run.
//! - Actions held weakly stop running once their owner drops them; the
//!   entry is removed on the next publish or [`EventChannel::prune`].

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::address::{CommunicatorAddress, Relationship};
use crate::channel::options::SubscribeOptions;
use crate::channel::subscription::EventSubscription;
use crate::config::BusConfig;
use crate::delegates::{Action, ActionFn, DelegateReference, SubscriptionToken};
use crate::dispatch::{
    panic_message, Background, ContextDelivery, Delivery, Dispatched, ExecutionContext, Immediate,
    ThreadOption,
};
use crate::error::{EventError, PublishError, SubscriberFailure};

/// Subscriber list and delivery settings for one payload type.
///
/// Cloning is cheap and yields a handle to the same channel.
pub struct EventChannel<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: &'static str,
    config: BusConfig,
    subscriptions: RwLock<Vec<Arc<EventSubscription<T>>>>,
    context: RwLock<Option<Arc<dyn ExecutionContext>>>,
}

impl<T> Inner<T> {
    fn remove_token(&self, token: &SubscriptionToken) -> bool {
        let mut subs = self.subscriptions.write();
        match subs.iter().position(|s| s.token() == token) {
            Some(pos) => {
                subs.remove(pos);
                tracing::debug!(channel = self.name, token = token.id(), "unsubscribed");
                true
            }
            None => false,
        }
    }
}

impl<T: Send + Sync + 'static> EventChannel<T> {
    /// Creates a channel with the default [`BusConfig`].
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: std::any::type_name::<T>(),
                config,
                subscriptions: RwLock::new(Vec::new()),
                context: RwLock::new(None),
            }),
        }
    }

    /// Payload type name; used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Attaches the context used by later [`ThreadOption::Context`] subscriptions.
    ///
    /// Existing subscriptions keep the context they captured.
    pub fn set_context(&self, context: Arc<dyn ExecutionContext>) {
        tracing::debug!(channel = self.inner.name, context = context.name(), "context attached");
        *self.inner.context.write() = Some(context);
    }

    pub fn context(&self) -> Option<Arc<dyn ExecutionContext>> {
        self.inner.context.read().clone()
    }

    /// Subscribes `action` on the publisher thread, held weakly.
    pub fn subscribe(&self, action: &Action<T>) -> Result<SubscriptionToken, EventError> {
        self.subscribe_with(action, SubscribeOptions::new())
    }

    /// Subscribes a closure owned by the channel.
    ///
    /// The closure stays subscribed until its token is unsubscribed. A closure
    /// that captures a handle to this same channel forms a reference cycle and
    /// keeps the channel alive; subscribe a weakly held [`Action`] instead.
    pub fn subscribe_fn<F>(&self, action: F) -> Result<SubscriptionToken, EventError>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_with_fn(action, SubscribeOptions::new())
    }

    /// Subscribes `action` on behalf of the communicator at `subscriber`,
    /// accepting only publishers in `accept_from`.
    pub fn subscribe_as(
        &self,
        action: &Action<T>,
        subscriber: &CommunicatorAddress,
        accept_from: Relationship,
    ) -> Result<SubscriptionToken, EventError> {
        self.subscribe_with(
            action,
            SubscribeOptions::new()
                .subscriber(subscriber.clone())
                .accept_from(accept_from),
        )
    }

    /// Subscribes a shared `action` with explicit options.
    ///
    /// # Errors
    /// - [`EventError::ContextUnavailable`] for [`ThreadOption::Context`]
    ///   without an attached context.
    /// - [`EventError::SubscriberAddressRequired`] for a restricted
    ///   `accept_from` without a subscriber address.
    /// - [`EventError::DeadDelegate`] if a shared filter is already gone.
    pub fn subscribe_with(
        &self,
        action: &Action<T>,
        options: SubscribeOptions<T>,
    ) -> Result<SubscriptionToken, EventError> {
        let reference = DelegateReference::new(action, options.keep_alive);
        self.insert(reference, options)
    }

    /// Subscribes a closure owned by the channel, with explicit options.
    ///
    /// `keep_alive` is implied for the action; the same cycle caveat as
    /// [`subscribe_fn`](Self::subscribe_fn) applies.
    pub fn subscribe_with_fn<F>(
        &self,
        action: F,
        options: SubscribeOptions<T>,
    ) -> Result<SubscriptionToken, EventError>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let action: Action<T> = Arc::new(action);
        self.insert(DelegateReference::strong(action), options)
    }

    fn insert(
        &self,
        action: DelegateReference<ActionFn<T>>,
        options: SubscribeOptions<T>,
    ) -> Result<SubscriptionToken, EventError> {
        let delivery = self.delivery_for(options.thread)?;
        let filter = options.filter_reference();
        let token = self.issue_token();
        let subscription = EventSubscription::new(
            action,
            filter,
            options.subscriber,
            options.accept_from,
            delivery,
            token.clone(),
        )?;

        tracing::debug!(
            channel = self.inner.name,
            token = token.id(),
            thread = options.thread.as_label(),
            keep_alive = subscription.keeps_alive(),
            accept_from = ?subscription.accept_from(),
            "subscribed"
        );
        self.inner.subscriptions.write().push(Arc::new(subscription));
        Ok(token)
    }

    fn delivery_for(&self, thread: ThreadOption) -> Result<Arc<dyn Delivery>, EventError> {
        match thread {
            ThreadOption::Publisher => Ok(Arc::new(Immediate)),
            ThreadOption::Background => Ok(Arc::new(Background::new(&self.inner.config))),
            ThreadOption::Context => match self.context() {
                Some(context) => Ok(Arc::new(ContextDelivery::new(context))),
                None => Err(EventError::ContextUnavailable {
                    channel: self.inner.name,
                }),
            },
        }
    }

    fn issue_token(&self) -> SubscriptionToken {
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        SubscriptionToken::new(move |token| {
            if let Some(inner) = inner.upgrade() {
                inner.remove_token(token);
            }
        })
    }

    /// Removes the subscription identified by `token`. Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        self.inner.remove_token(token);
    }

    /// Removes the first live subscription running `action`. Unknown actions are ignored.
    pub fn unsubscribe_action(&self, action: &Action<T>) {
        let mut subs = self.inner.subscriptions.write();
        if let Some(pos) = subs.iter().position(|s| s.holds_action(action)) {
            let removed = subs.remove(pos);
            tracing::debug!(
                channel = self.inner.name,
                token = removed.token().id(),
                "unsubscribed by action"
            );
        }
    }

    /// True if `token` identifies a subscription of this channel.
    pub fn contains(&self, token: &SubscriptionToken) -> bool {
        self.inner
            .subscriptions
            .read()
            .iter()
            .any(|s| s.token() == token)
    }

    /// True if a live subscription runs `action`.
    pub fn contains_action(&self, action: &Action<T>) -> bool {
        self.inner
            .subscriptions
            .read()
            .iter()
            .any(|s| s.holds_action(action))
    }

    /// Snapshot of the current subscriptions, inert ones included.
    pub fn subscriptions(&self) -> Vec<Arc<EventSubscription<T>>> {
        self.inner.subscriptions.read().clone()
    }

    /// Number of registered subscriptions, inert ones included.
    pub fn len(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.subscriptions.read().is_empty()
    }

    /// Drops subscriptions whose action or filter is gone. Returns how many.
    pub fn prune(&self) -> usize {
        let mut subs = self.inner.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.is_alive());
        let pruned = before - subs.len();
        if pruned > 0 {
            tracing::trace!(channel = self.inner.name, pruned, "pruned inert subscriptions");
        }
        pruned
    }

    /// Publishes `payload` anonymously to every subscription.
    ///
    /// Subscriptions with a restricted `accept_from` never receive anonymous payloads.
    ///
    /// # Errors
    /// [`PublishError::SubscribersFailed`] if any subscriber panicked or could
    /// not be dispatched to. Every other subscriber still ran.
    pub fn publish(&self, payload: T) -> Result<(), PublishError> {
        self.dispatch(None, payload, Relationship::ANY)
    }

    /// Publishes `payload` from `publisher` to subscribers in `publish_to`.
    pub fn publish_from(
        &self,
        publisher: &CommunicatorAddress,
        payload: T,
        publish_to: Relationship,
    ) -> Result<(), PublishError> {
        self.dispatch(Some(publisher), payload, publish_to)
    }

    fn dispatch(
        &self,
        publisher: Option<&CommunicatorAddress>,
        payload: T,
        publish_to: Relationship,
    ) -> Result<(), PublishError> {
        let payload = Arc::new(payload);
        let snapshot = self.subscriptions();

        let mut delivered = 0usize;
        let mut inert = 0usize;
        let mut failures = Vec::new();

        for subscription in &snapshot {
            let Some(strategy) = subscription.execution_strategy(publisher, publish_to) else {
                inert += 1;
                continue;
            };
            let token = subscription.token().id();
            match catch_unwind(AssertUnwindSafe(|| strategy.invoke(&payload))) {
                Ok(Dispatched::Failed(message)) => {
                    tracing::warn!(channel = self.inner.name, token, reason = %message, "dispatch failed");
                    failures.push(SubscriberFailure { token, message });
                }
                Ok(outcome) => {
                    if outcome.is_delivered() {
                        delivered += 1;
                    }
                }
                Err(panic_err) => {
                    let message = panic_message(&*panic_err);
                    tracing::warn!(channel = self.inner.name, token, panic = %message, "subscriber panicked");
                    failures.push(SubscriberFailure { token, message });
                }
            }
        }

        tracing::trace!(
            channel = self.inner.name,
            publisher = publisher.map(CommunicatorAddress::as_str),
            subscriptions = snapshot.len(),
            delivered,
            inert,
            failed = failures.len(),
            "published"
        );

        if inert > 0 && self.inner.config.prune_collected {
            self.prune();
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError::SubscribersFailed {
                channel: self.inner.name,
                failures,
            })
        }
    }

    /// True if both handles point at the same channel.
    pub fn same_channel(&self, other: &EventChannel<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Send + Sync + 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.inner.name)
            .field("subscriptions", &self.inner.subscriptions.read().len())
            .field(
                "context",
                &self.inner.context.read().as_ref().map(|c| c.name().to_string()),
            )
            .finish()
    }
}
