//! # Weak or strong handle to a callable.
//!
//! [`DelegateReference`] is how a channel holds subscriber callbacks.
//!
//! - **Weak** (default): the channel holds a [`Weak`]; once the subscriber
//!   drops its last `Arc`, the callback is gone and the subscription turns
//!   inert without an explicit unsubscribe.
//! - **Strong** (keep-alive): the channel holds an `Arc` and keeps the
//!   callback alive until it is unsubscribed.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use commbus::{Action, DelegateReference};
//!
//! let action: Action<u32> = Arc::new(|_n: &u32| {});
//! let weak = DelegateReference::new(&action, false);
//! assert!(weak.is_alive());
//!
//! drop(action);
//! assert!(!weak.is_alive());
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

/// Subscriber callback: receives the published payload.
pub type ActionFn<T> = dyn Fn(&T) + Send + Sync;

/// Subscriber filter: `true` lets the payload through to the action.
pub type FilterFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// Shared handle to an action.
pub type Action<T> = Arc<ActionFn<T>>;

/// Shared handle to a filter.
pub type Filter<T> = Arc<FilterFn<T>>;

/// Filter that accepts every payload.
pub fn always_true<T: 'static>() -> Filter<T> {
    Arc::new(|_: &T| true)
}

enum Held<F: ?Sized> {
    Strong(Arc<F>),
    Weak(Weak<F>),
}

/// Reference to a callable that may or may not keep it alive.
pub struct DelegateReference<F: ?Sized> {
    held: Held<F>,
}

impl<F: ?Sized> DelegateReference<F> {
    /// Wraps `target`, strongly if `keep_alive`, weakly otherwise.
    pub fn new(target: &Arc<F>, keep_alive: bool) -> Self {
        if keep_alive {
            Self::strong(Arc::clone(target))
        } else {
            Self::weak(target)
        }
    }

    /// Keeps `target` alive for as long as the reference exists.
    pub fn strong(target: Arc<F>) -> Self {
        Self {
            held: Held::Strong(target),
        }
    }

    /// Observes `target` without keeping it alive.
    pub fn weak(target: &Arc<F>) -> Self {
        Self {
            held: Held::Weak(Arc::downgrade(target)),
        }
    }

    /// The live callable, or `None` once it has been dropped.
    pub fn target(&self) -> Option<Arc<F>> {
        match &self.held {
            Held::Strong(target) => Some(Arc::clone(target)),
            Held::Weak(target) => target.upgrade(),
        }
    }

    /// True while the callable can still be resolved.
    pub fn is_alive(&self) -> bool {
        match &self.held {
            Held::Strong(_) => true,
            Held::Weak(target) => target.strong_count() > 0,
        }
    }

    /// True if this reference keeps its target alive.
    pub fn keeps_alive(&self) -> bool {
        matches!(self.held, Held::Strong(_))
    }

    /// True if the live target is the same allocation as `other`.
    ///
    /// A dropped target never matches.
    pub fn points_to(&self, other: &Arc<F>) -> bool {
        self.target()
            .is_some_and(|target| same_target(&target, other))
    }
}

/// Compares two callables by allocation, ignoring vtable metadata.
pub(crate) fn same_target<F: ?Sized>(a: &Arc<F>, b: &Arc<F>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl<F: ?Sized> fmt::Debug for DelegateReference<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateReference")
            .field("keep_alive", &self.keeps_alive())
            .field("alive", &self.is_alive())
            .finish()
    }
}
