//! # Subscription tokens.
//!
//! Every subscription is identified by a [`SubscriptionToken`]. Tokens
//! compare by id only; the id comes from a process-wide sequence, so two
//! tokens never collide even across channels.
//!
//! A token may carry one unsubscribe callback, installed by whoever issued it.
//! Channels install a callback that removes the subscription, so
//! `token.unsubscribe()` works without a handle to the channel.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Global sequence for token ids.
static TOKEN_SEQ: AtomicU64 = AtomicU64::new(1);

type UnsubscribeFn = dyn Fn(&SubscriptionToken) + Send + Sync;

/// Opaque identity of one subscription.
#[derive(Clone)]
pub struct SubscriptionToken {
    id: u64,
    unsubscribe: Option<Arc<UnsubscribeFn>>,
}

impl SubscriptionToken {
    /// Issues a token with an unsubscribe callback.
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: Fn(&SubscriptionToken) + Send + Sync + 'static,
    {
        Self {
            id: next_id(),
            unsubscribe: Some(Arc::new(unsubscribe)),
        }
    }

    /// Issues a token without a callback; `unsubscribe` is a no-op.
    pub fn detached() -> Self {
        Self {
            id: next_id(),
            unsubscribe: None,
        }
    }

    /// Unique id of this token.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the unsubscribe callback, if any.
    ///
    /// Safe to call repeatedly; removing an absent subscription is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(callback) = &self.unsubscribe {
            callback(self);
        }
    }
}

fn next_id() -> u64 {
    TOKEN_SEQ.fetch_add(1, AtomicOrdering::Relaxed)
}

impl PartialEq for SubscriptionToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriptionToken {}

impl Hash for SubscriptionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &self.id)
            .field("unsubscribe", &self.unsubscribe.is_some())
            .finish()
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.id)
    }
}
