//! Callable handles and subscription identity.
//!
//! - [`DelegateReference`] weak-or-strong holder for actions and filters
//! - [`SubscriptionToken`] per-subscription identity with an unsubscribe hook

mod reference;
mod token;

pub use reference::{always_true, Action, ActionFn, DelegateReference, Filter, FilterFn};
pub use token::SubscriptionToken;
