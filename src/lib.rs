//! # commbus
//!
//! **commbus** is an in-process, type-keyed publish/subscribe event bus for
//! trees of communicating components.
//!
//! Subscribers register callbacks on a typed [`EventChannel`]; publishers
//! hand it a payload. Callbacks are held weakly by default, so a subscriber
//! that goes away stops receiving events without unsubscribing. Every
//! participant may carry a hierarchical [`CommunicatorAddress`], which lets
//! a subscription accept events only from certain relatives and lets a
//! publisher target only certain relatives.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Communicator │   │ Communicator │   │ Communicator │
//!     │    (root)    │◄──│    (view)    │◄──│   (button)   │   parent chain
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!     CommunicatorAddress (root@view@button, built once per participant)
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventRegistry (DashMap<TypeId, EventChannel<_>>)                 │
//! │  - one channel per payload type, created lazily                   │
//! │  - BusConfig + default ExecutionContext handed to new channels    │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   EventChannel<A>    EventChannel<B>    EventChannel<C>
//!        │
//!        ├─ subscribe*(action, SubscribeOptions) ─► EventSubscription
//!        │     DelegateReference (weak | strong) for action and filter
//!        │     accept_from mask + subscriber address
//!        │     Delivery (Immediate | Background | ContextDelivery)
//!        │
//!        └─ publish / publish_from(address, payload, publish_to)
//!              snapshot ─► per subscription:
//!                execution_strategy()  (None if collected)
//!                  ├─ filter(payload)
//!                  ├─ relationship gate (accept_from, publish_to)
//!                  └─ Delivery::deliver(action(payload))
//! ```
//!
//! ### Relationships
//! ```text
//! root ─┬─ a ─┬─ a1          seen from `a`:
//!       │     └─ a2            a      SAME
//!       └─ b ─── b1            root   CLOSEST_PARENT | PARENT
//!                              a1     CLOSEST_CHILD  | CHILD
//!                              b      SIBLING
//!                              b1     SIBLING_CHILD
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                               |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------------|
//! | **Channels**      | Typed subscriber lists with weak/strong callback holding.    | [`EventChannel`], [`SubscribeOptions`]           |
//! | **Registry**      | One channel per payload type, shared by a component tree.   | [`EventRegistry`]                                |
//! | **Addressing**    | Hierarchical addresses and relationship recognition.        | [`Communicator`], [`CommunicatorAddress`], [`Relationship`] |
//! | **Delivery**      | Publisher thread, background worker or execution context.   | [`ThreadOption`], [`Delivery`], [`ExecutionContext`] |
//! | **Errors**        | Typed errors for construction and publish failures.         | [`EventError`], [`PublishError`]                 |
//! | **Configuration** | Pruning and background delivery settings.                   | [`BusConfig`]                                    |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use commbus::{Action, EventRegistry};
//!
//! #[derive(Debug)]
//! struct Saved(u32);
//!
//! let registry = EventRegistry::new();
//! let channel = registry.channel::<Saved>();
//!
//! // Held weakly: dropping `on_saved` ends the subscription.
//! let on_saved: Action<Saved> = Arc::new(|s: &Saved| println!("saved #{}", s.0));
//! channel.subscribe(&on_saved)?;
//!
//! registry.channel::<Saved>().publish(Saved(1))?;
//! drop(on_saved);
//! registry.channel::<Saved>().publish(Saved(2))?; // nobody listens
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod address;
mod channel;
mod config;
mod delegates;
mod dispatch;
mod error;
mod registry;

// ---- Public re-exports ----

pub use address::{
    Communicator, CommunicatorAddress, CommunicatorId, Relationship, RelationshipFacts,
    SEGMENT_SEPARATOR,
};
pub use channel::{EventChannel, EventSubscription, ExecutionStrategy, SubscribeOptions};
pub use config::BusConfig;
pub use delegates::{always_true, Action, ActionFn, DelegateReference, Filter, FilterFn, SubscriptionToken};
pub use dispatch::{
    context_loop, Background, ContextDelivery, ContextHandle, ContextLoop, Delivery, Dispatched,
    ExecutionContext, Immediate, Job, ThreadOption,
};
pub use error::{EventError, PublishError, SubscriberFailure};
pub use registry::EventRegistry;
