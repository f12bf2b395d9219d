//! Hierarchical addressing of communicators.
//!
//! ## Contents
//! - [`Communicator`], [`CommunicatorId`] the host-side participant contract
//! - [`CommunicatorAddress`] root-to-leaf path with relationship recognition
//! - [`Relationship`], [`RelationshipFacts`] the recognized structural category

mod communicator;
mod path;
mod relationship;

pub use communicator::{Communicator, CommunicatorId};
pub use path::{CommunicatorAddress, SEGMENT_SEPARATOR};
pub use relationship::{Relationship, RelationshipFacts};
