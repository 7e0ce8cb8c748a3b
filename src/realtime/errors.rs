//! # Real-Time Errors
//!
//! Error types for the real-time module.

use thiserror::Error;

use crate::request::RequestError;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, Error)]
pub enum RealtimeError {
    // ==================
    // Subscription Lifecycle
    // ==================
    /// A subscribe call is already waiting for its acknowledgement
    #[error("Subscription request already in flight")]
    InFlight,

    /// The subscription is already bound to a room
    #[error("Subscription already active on room {0}")]
    AlreadyActive(String),

    /// Unsubscribed or torn down while the subscribe call was in flight
    #[error("Subscription terminated before the server acknowledged it")]
    TerminatedDuringSubscribe,

    /// The subscription has no room yet
    #[error("Subscription is not active")]
    NotActive,

    /// The acknowledgement did not carry a room id and channel
    #[error("Malformed subscription acknowledgement: {0}")]
    MalformedAck(String),

    // ==================
    // Registry
    // ==================
    /// No subscription registered for this room
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    // ==================
    // Propagated
    // ==================
    /// The underlying request failed
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RealtimeError::InFlight => "AERO_SDK_SUBSCRIBE_IN_FLIGHT",
            RealtimeError::AlreadyActive(_) => "AERO_SDK_SUBSCRIPTION_ACTIVE",
            RealtimeError::TerminatedDuringSubscribe => "AERO_SDK_SUBSCRIPTION_TERMINATED",
            RealtimeError::NotActive => "AERO_SDK_SUBSCRIPTION_NOT_ACTIVE",
            RealtimeError::MalformedAck(_) => "AERO_SDK_MALFORMED_ACK",
            RealtimeError::RoomNotFound(_) => "AERO_SDK_ROOM_NOT_FOUND",
            RealtimeError::Request(inner) => inner.code(),
            RealtimeError::Internal(_) => "AERO_SDK_INTERNAL",
        }
    }
}
