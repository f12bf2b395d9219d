//! # One registered subscriber.
//!
//! An [`EventSubscription`] couples an action and a filter (each held weakly
//! or strongly) with an optional subscriber address, an accept-from mask and
//! a delivery strategy.
//!
//! For each publish the channel asks it for an [`ExecutionStrategy`]:
//!
//! ```text
//! execution_strategy(publisher, publish_to)
//!     ├─ action or filter dropped ─► None (subscription is inert)
//!     └─ Some(strategy)
//!            invoke(payload)
//!              1. filter(payload)            false ─► Skipped
//!              2. accept-from gate           fail  ─► Skipped
//!              3. publish-to gate            fail  ─► Skipped
//!              4. Delivery::deliver(action)        ─► Completed | Queued | Failed
//! ```
//!
//! ## Relationship gate
//! - Accept-from: `ANY` passes. Otherwise the publisher must be known and
//!   the subscriber's view of the publisher must intersect the mask.
//! - Publish-to: `ANY` passes. Otherwise both addresses must be known and the
//!   publisher's view of the subscriber must intersect the mask.

use std::fmt;
use std::sync::Arc;

use crate::address::{CommunicatorAddress, Relationship};
use crate::delegates::{Action, ActionFn, DelegateReference, Filter, FilterFn, SubscriptionToken};
use crate::dispatch::{Delivery, Dispatched, ThreadOption};
use crate::error::EventError;

/// A registered subscriber of an [`EventChannel`](crate::EventChannel).
pub struct EventSubscription<T> {
    action: DelegateReference<ActionFn<T>>,
    filter: DelegateReference<FilterFn<T>>,
    token: SubscriptionToken,
    subscriber: Option<CommunicatorAddress>,
    accept_from: Relationship,
    delivery: Arc<dyn Delivery>,
}

impl<T: Send + Sync + 'static> EventSubscription<T> {
    /// Builds a subscription.
    ///
    /// # Errors
    /// - [`EventError::DeadDelegate`] if the action or filter is already gone.
    /// - [`EventError::SubscriberAddressRequired`] if `accept_from` is
    ///   restricted but no subscriber address is given.
    pub fn new(
        action: DelegateReference<ActionFn<T>>,
        filter: DelegateReference<FilterFn<T>>,
        subscriber: Option<CommunicatorAddress>,
        accept_from: Relationship,
        delivery: Arc<dyn Delivery>,
        token: SubscriptionToken,
    ) -> Result<Self, EventError> {
        if !action.is_alive() {
            return Err(EventError::DeadDelegate { delegate: "action" });
        }
        if !filter.is_alive() {
            return Err(EventError::DeadDelegate { delegate: "filter" });
        }
        if !accept_from.is_any() && subscriber.is_none() {
            return Err(EventError::SubscriberAddressRequired { accept_from });
        }
        Ok(Self {
            action,
            filter,
            token,
            subscriber,
            accept_from,
            delivery,
        })
    }

    /// Resolves the delegates for one publish.
    ///
    /// Returns `None` once either delegate has been dropped.
    pub fn execution_strategy<'a>(
        &'a self,
        publisher: Option<&'a CommunicatorAddress>,
        publish_to: Relationship,
    ) -> Option<ExecutionStrategy<'a, T>> {
        let action = self.action.target()?;
        let filter = self.filter.target()?;
        Some(ExecutionStrategy {
            subscription: self,
            action,
            filter,
            publisher,
            publish_to,
        })
    }

    /// Hands `action(payload)` to the delivery strategy.
    pub fn invoke_action(&self, action: Action<T>, payload: Arc<T>) -> Dispatched {
        self.delivery.deliver(Box::new(move || action(&*payload)))
    }
}

impl<T> EventSubscription<T> {
    /// Live action, if it has not been dropped.
    pub fn action(&self) -> Option<Action<T>> {
        self.action.target()
    }

    /// Live filter, if it has not been dropped.
    pub fn filter(&self) -> Option<Filter<T>> {
        self.filter.target()
    }

    pub fn token(&self) -> &SubscriptionToken {
        &self.token
    }

    pub fn subscriber_address(&self) -> Option<&CommunicatorAddress> {
        self.subscriber.as_ref()
    }

    pub fn accept_from(&self) -> Relationship {
        self.accept_from
    }

    pub fn thread_option(&self) -> ThreadOption {
        self.delivery.thread_option()
    }

    /// True if the action is held strongly.
    pub fn keeps_alive(&self) -> bool {
        self.action.keeps_alive()
    }

    /// True while both the action and the filter resolve.
    pub fn is_alive(&self) -> bool {
        self.action.is_alive() && self.filter.is_alive()
    }

    /// True if this live subscription runs `action`.
    pub(crate) fn holds_action(&self, action: &Action<T>) -> bool {
        self.filter.is_alive() && self.action.points_to(action)
    }

    fn is_allowed(&self, publisher: Option<&CommunicatorAddress>, publish_to: Relationship) -> bool {
        self.accepts_publisher(publisher) && self.is_targeted_by(publisher, publish_to)
    }

    fn accepts_publisher(&self, publisher: Option<&CommunicatorAddress>) -> bool {
        if self.accept_from.is_any() {
            return true;
        }
        match (publisher, &self.subscriber) {
            (Some(publisher), Some(subscriber)) => self
                .accept_from
                .admits(subscriber.recognize_relationship(publisher)),
            _ => false,
        }
    }

    fn is_targeted_by(&self, publisher: Option<&CommunicatorAddress>, publish_to: Relationship) -> bool {
        if publish_to.is_any() {
            return true;
        }
        match (publisher, &self.subscriber) {
            (Some(publisher), Some(subscriber)) => {
                publish_to.admits(publisher.recognize_relationship(subscriber))
            }
            _ => false,
        }
    }
}

impl<T> fmt::Debug for EventSubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("token", &self.token.id())
            .field("action", &self.action)
            .field("filter", &self.filter)
            .field("subscriber", &self.subscriber.as_ref().map(CommunicatorAddress::as_str))
            .field("accept_from", &self.accept_from)
            .field("thread", &self.delivery.thread_option())
            .finish()
    }
}

/// Resolved delegates of one subscription for one publish.
///
/// Holds the action and filter strongly for as long as it lives, so a
/// subscriber dropping its handle mid-publish cannot pull them away.
pub struct ExecutionStrategy<'a, T> {
    subscription: &'a EventSubscription<T>,
    action: Action<T>,
    filter: Filter<T>,
    publisher: Option<&'a CommunicatorAddress>,
    publish_to: Relationship,
}

impl<'a, T: Send + Sync + 'static> ExecutionStrategy<'a, T> {
    /// Filter, then relationship gate, then delivery.
    pub fn invoke(&self, payload: &Arc<T>) -> Dispatched {
        if !(self.filter)(&**payload) {
            return Dispatched::Skipped;
        }
        if !self.subscription.is_allowed(self.publisher, self.publish_to) {
            return Dispatched::Skipped;
        }
        self.subscription
            .invoke_action(Arc::clone(&self.action), Arc::clone(payload))
    }

    /// Invokes with the first argument, or `T::default()` when `args` is empty.
    pub fn invoke_args(&self, args: &[Arc<T>]) -> Dispatched
    where
        T: Default,
    {
        match args.first() {
            Some(payload) => self.invoke(payload),
            None => self.invoke(&Arc::new(T::default())),
        }
    }

    pub fn subscription(&self) -> &EventSubscription<T> {
        self.subscription
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::address::CommunicatorId;
    use crate::delegates::always_true;
    use crate::dispatch::Immediate;

    fn immediate() -> Arc<dyn Delivery> {
        Arc::new(Immediate)
    }

    fn recorder<T: Clone + Send + Sync + 'static>() -> (Action<T>, Arc<Mutex<Vec<T>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let action: Action<T> = Arc::new(move |v: &T| s.lock().push(v.clone()));
        (action, seen)
    }

    fn plain<T: Send + Sync + 'static>(action: &Action<T>) -> EventSubscription<T> {
        EventSubscription::new(
            DelegateReference::weak(action),
            DelegateReference::strong(always_true()),
            None,
            Relationship::ANY,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap()
    }

    #[test]
    fn test_dead_action_is_rejected() {
        let action: Action<u8> = Arc::new(|_n: &u8| {});
        let reference = DelegateReference::weak(&action);
        drop(action);

        let err = EventSubscription::new(
            reference,
            DelegateReference::strong(always_true()),
            None,
            Relationship::ANY,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap_err();
        assert_eq!(err, EventError::DeadDelegate { delegate: "action" });
    }

    #[test]
    fn test_dead_filter_is_rejected() {
        let action: Action<u8> = Arc::new(|_n: &u8| {});
        let filter: Filter<u8> = Arc::new(|_n: &u8| true);
        let reference = DelegateReference::weak(&filter);
        drop(filter);

        let err = EventSubscription::new(
            DelegateReference::weak(&action),
            reference,
            None,
            Relationship::ANY,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap_err();
        assert_eq!(err, EventError::DeadDelegate { delegate: "filter" });
    }

    #[test]
    fn test_accept_from_requires_address() {
        let action: Action<u8> = Arc::new(|_n: &u8| {});
        let err = EventSubscription::new(
            DelegateReference::weak(&action),
            DelegateReference::strong(always_true()),
            None,
            Relationship::PARENT,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap_err();
        assert!(matches!(err, EventError::SubscriberAddressRequired { .. }));
    }

    #[test]
    fn test_strategy_none_after_action_dropped() {
        let (action, _) = recorder::<u8>();
        let sub = plain(&action);
        assert!(sub.execution_strategy(None, Relationship::ANY).is_some());

        drop(action);
        assert!(!sub.is_alive());
        assert!(sub.execution_strategy(None, Relationship::ANY).is_none());
    }

    #[test]
    fn test_strategy_none_after_filter_dropped() {
        let (action, _) = recorder::<u8>();
        let filter: Filter<u8> = Arc::new(|_n: &u8| true);
        let sub = EventSubscription::new(
            DelegateReference::weak(&action),
            DelegateReference::weak(&filter),
            None,
            Relationship::ANY,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap();

        drop(filter);
        assert!(sub.execution_strategy(None, Relationship::ANY).is_none());
    }

    #[test]
    fn test_strategy_passes_payload() {
        let (action, seen) = recorder::<String>();
        let sub = plain(&action);
        let strategy = sub.execution_strategy(None, Relationship::ANY).unwrap();

        let out = strategy.invoke(&Arc::new("payload".to_string()));
        assert_eq!(out, Dispatched::Completed);
        assert_eq!(*seen.lock(), vec!["payload".to_string()]);
    }

    #[test]
    fn test_filter_runs_before_action() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (la, lf) = (Arc::clone(&log), Arc::clone(&log));
        let action: Action<u8> = Arc::new(move |_n: &u8| la.lock().push("action"));
        let filter: Filter<u8> = Arc::new(move |_n: &u8| {
            lf.lock().push("filter");
            true
        });
        let sub = EventSubscription::new(
            DelegateReference::weak(&action),
            DelegateReference::weak(&filter),
            None,
            Relationship::ANY,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap();

        sub.execution_strategy(None, Relationship::ANY)
            .unwrap()
            .invoke(&Arc::new(1));
        assert_eq!(*log.lock(), vec!["filter", "action"]);
    }

    #[test]
    fn test_rejecting_filter_skips_action() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let action: Action<u8> = Arc::new(move |_n: &u8| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let filter: Filter<u8> = Arc::new(|_n: &u8| false);
        let sub = EventSubscription::new(
            DelegateReference::weak(&action),
            DelegateReference::weak(&filter),
            None,
            Relationship::ANY,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap();

        let out = sub
            .execution_strategy(None, Relationship::ANY)
            .unwrap()
            .invoke(&Arc::new(1));
        assert_eq!(out, Dispatched::Skipped);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invoke_args_defaults_when_empty() {
        let (action, seen) = recorder::<i32>();
        let sub = plain(&action);
        let strategy = sub.execution_strategy(None, Relationship::ANY).unwrap();

        strategy.invoke_args(&[]);
        strategy.invoke_args(&[Arc::new(5), Arc::new(9)]);
        assert_eq!(*seen.lock(), vec![0, 5]);
    }

    #[test]
    fn test_gate_accept_from_parent() {
        let root = CommunicatorId::new();
        let child = CommunicatorId::new();
        let parent_addr = CommunicatorAddress::from_ids(&[root]).unwrap();
        let child_addr = CommunicatorAddress::from_ids(&[root, child]).unwrap();

        let (action, seen) = recorder::<u8>();
        let sub = EventSubscription::new(
            DelegateReference::weak(&action),
            DelegateReference::strong(always_true()),
            Some(child_addr.clone()),
            Relationship::CLOSEST_PARENT,
            immediate(),
            SubscriptionToken::detached(),
        )
        .unwrap();

        // anonymous publisher fails a restricted accept-from
        let anon = sub.execution_strategy(None, Relationship::ANY).unwrap();
        assert_eq!(anon.invoke(&Arc::new(1)), Dispatched::Skipped);

        let from_self = sub
            .execution_strategy(Some(&child_addr), Relationship::ANY)
            .unwrap();
        assert_eq!(from_self.invoke(&Arc::new(2)), Dispatched::Skipped);

        let from_parent = sub
            .execution_strategy(Some(&parent_addr), Relationship::ANY)
            .unwrap();
        assert_eq!(from_parent.invoke(&Arc::new(3)), Dispatched::Completed);
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn test_gate_publish_to_needs_subscriber_address() {
        let root = CommunicatorId::new();
        let publisher = CommunicatorAddress::from_ids(&[root]).unwrap();
        let (action, _) = recorder::<u8>();
        let sub = plain(&action);

        let targeted = sub
            .execution_strategy(Some(&publisher), Relationship::CHILD)
            .unwrap();
        assert_eq!(targeted.invoke(&Arc::new(1)), Dispatched::Skipped);

        let broadcast = sub
            .execution_strategy(Some(&publisher), Relationship::ANY)
            .unwrap();
        assert_eq!(broadcast.invoke(&Arc::new(1)), Dispatched::Completed);
    }

    #[test]
    fn test_strategy_holds_delegates_strongly() {
        let (action, seen) = recorder::<u8>();
        let sub = plain(&action);
        let strategy = sub.execution_strategy(None, Relationship::ANY).unwrap();
        drop(action);

        assert_eq!(strategy.invoke(&Arc::new(4)), Dispatched::Completed);
        assert_eq!(*seen.lock(), vec![4]);
    }

    fn summary<T>(sub: &EventSubscription<T>) -> (u64, bool, bool, ThreadOption) {
        (
            sub.token().id(),
            sub.is_alive(),
            sub.accept_from().is_any(),
            sub.thread_option(),
        )
    }

    #[test]
    fn test_accessors_need_no_payload_bounds() {
        let (action, _seen) = recorder::<u8>();
        let sub = plain(&action);
        let id = sub.token().id();

        assert_eq!(summary(&sub), (id, true, true, ThreadOption::Publisher));
        drop(action);
        assert!(!summary(&sub).1);
    }
}
