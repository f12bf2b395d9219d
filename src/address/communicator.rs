//! # Addressable participants.
//!
//! A [`Communicator`] is anything that publishes or subscribes on behalf of a
//! node in a parent/child tree (a view and its sub-views, a service and its
//! workers, ...). The bus never stores communicators; it only walks the
//! parent chain once to build a [`CommunicatorAddress`](crate::CommunicatorAddress).
//!
//! ## Contract
//! - `communicator_id` is unique and never nil.
//! - `parent_communicator` forms a tree (no cycles).
//! - `set_event_registry` receives the registry the participant should use.

use std::fmt;

use uuid::Uuid;

use crate::registry::EventRegistry;

/// Unique identifier of a communicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommunicatorId(Uuid);

impl CommunicatorId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil id. Addresses refuse it.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the wrapped UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// True for the nil id.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Address segment form: 32 lowercase hex digits, no hyphens.
    pub fn segment(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for CommunicatorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommunicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A participant that has a place in a communicator tree.
pub trait Communicator {
    /// Unique, non-nil identifier.
    fn communicator_id(&self) -> CommunicatorId;

    /// Parent in the tree, `None` for a root.
    fn parent_communicator(&self) -> Option<&dyn Communicator>;

    /// Hands the participant the registry it should obtain channels from.
    fn set_event_registry(&self, registry: EventRegistry);
}
