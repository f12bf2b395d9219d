//! Thread-affinity dispatch.
//!
//! ## Contents
//! - [`ThreadOption`] where a subscriber wants its action to run
//! - [`Delivery`] strategy trait with [`Immediate`], [`Background`], [`ContextDelivery`]
//! - [`ExecutionContext`] host contract, [`context_loop`] queue-backed implementation

mod context;
mod delivery;
mod thread;

pub use context::{context_loop, ContextHandle, ContextLoop, ExecutionContext};
pub(crate) use delivery::panic_message;
pub use delivery::{Background, ContextDelivery, Delivery, Dispatched, Immediate, Job};
pub use thread::ThreadOption;
