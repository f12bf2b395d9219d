//! Error types used by the event bus.
//!
//! This module defines two main error enums:
//!
//! - [`EventError`]: synchronous failures raised while building addresses
//!   or subscriptions. Nothing is registered when one is returned.
//! - [`PublishError`]: failures collected while a channel delivered a payload.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

use crate::address::Relationship;

/// # Errors produced while constructing addresses and subscriptions.
///
/// Variants fall into two families:
/// - **address errors**: invalid communicator identity or path manipulation;
/// - **construction errors**: a subscription that can never be delivered.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// A communicator in the parent chain has the nil identifier.
    #[error("communicator id is not set")]
    EmptyCommunicatorId,

    /// The parent chain loops back onto itself.
    #[error("communicator parent chain contains a cycle at segment {segment}")]
    AddressCycle {
        /// The segment seen twice.
        segment: String,
    },

    /// Attempted to remove the only segment of an address.
    #[error("can't remove last segment of {address}: there is only one segment")]
    SoleSegment {
        /// Rendered address the removal was attempted on.
        address: String,
    },

    /// A delegate reference had no live target when the subscription was built.
    #[error("{delegate} target is not alive")]
    DeadDelegate {
        /// Which delegate was dead (`"action"` or `"filter"`).
        delegate: &'static str,
    },

    /// A relationship filter was requested without a subscriber address.
    #[error("subscriber address is required to accept events from {accept_from:?}")]
    SubscriberAddressRequired {
        /// The requested accept-from mask.
        accept_from: Relationship,
    },

    /// Context delivery was requested but the channel has no execution context.
    #[error("channel `{channel}` has no execution context attached")]
    ContextUnavailable {
        /// Payload type name of the channel.
        channel: &'static str,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use commbus::EventError;
    ///
    /// let err = EventError::DeadDelegate { delegate: "action" };
    /// assert_eq!(err.as_label(), "subscription_dead_delegate");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::EmptyCommunicatorId => "address_empty_id",
            EventError::AddressCycle { .. } => "address_cycle",
            EventError::SoleSegment { .. } => "address_sole_segment",
            EventError::DeadDelegate { .. } => "subscription_dead_delegate",
            EventError::SubscriberAddressRequired { .. } => "subscription_address_required",
            EventError::ContextUnavailable { .. } => "subscription_context_unavailable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EventError::EmptyCommunicatorId => "communicator id is nil".to_string(),
            EventError::AddressCycle { segment } => format!("parent cycle at {segment}"),
            EventError::SoleSegment { address } => format!("sole segment: {address}"),
            EventError::DeadDelegate { delegate } => format!("dead {delegate}"),
            EventError::SubscriberAddressRequired { accept_from } => {
                format!("no subscriber address for accept_from={accept_from:?}")
            }
            EventError::ContextUnavailable { channel } => format!("no context on {channel}"),
        }
    }

    /// True for failures building or editing a [`CommunicatorAddress`](crate::CommunicatorAddress).
    pub fn is_address_error(&self) -> bool {
        matches!(
            self,
            EventError::EmptyCommunicatorId
                | EventError::AddressCycle { .. }
                | EventError::SoleSegment { .. }
        )
    }

    /// True for failures building a subscription.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            EventError::DeadDelegate { .. }
                | EventError::SubscriberAddressRequired { .. }
                | EventError::ContextUnavailable { .. }
        )
    }
}

/// One subscriber that failed during a publish pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    /// Id of the failed subscription's token.
    pub token: u64,
    /// Panic message or dispatch failure reason.
    pub message: String,
}

/// # Errors produced by publishing.
///
/// A publish pass never stops at the first failing subscriber: every
/// subscription gets its turn and the failures are reported together.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// One or more subscribers panicked or could not be dispatched to.
    #[error("{} subscriber(s) of `{channel}` failed", failures.len())]
    SubscribersFailed {
        /// Payload type name of the channel.
        channel: &'static str,
        /// Failures in dispatch order.
        failures: Vec<SubscriberFailure>,
    },
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::SubscribersFailed { .. } => "publish_subscribers_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PublishError::SubscribersFailed { channel, failures } => {
                let tokens: Vec<u64> = failures.iter().map(|f| f.token).collect();
                format!("subscribers failed on {channel}; tokens={tokens:?}")
            }
        }
    }

    /// Failures in dispatch order.
    pub fn failures(&self) -> &[SubscriberFailure] {
        match self {
            PublishError::SubscribersFailed { failures, .. } => failures,
        }
    }
}
