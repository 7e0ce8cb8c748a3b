//! # Request Errors
//!
//! Failures of a single request between dispatch and settlement.

use thiserror::Error;

use crate::protocol::ServerError;

/// Result type for request operations
pub type RequestResult<T> = Result<T, RequestError>;

/// Request lifecycle errors
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// No settlement before the deadline
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    Timeout { request_id: String, timeout_ms: u64 },

    /// A terminal operation ran twice
    #[error("Request {request_id} was already settled")]
    AlreadySettled { request_id: String },

    /// The pending operation was dropped without being settled
    #[error("Request {request_id} was abandoned before settlement")]
    Abandoned { request_id: String },

    /// Error reported by the server, passed through unchanged
    #[error("{0}")]
    Server(ServerError),

    /// The transport could not send or abort the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection closed while the request was in flight
    #[error("Connection closed")]
    ConnectionClosed,

    /// The request cannot be sent as built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An interceptor around the request failed or timed out
    #[error("Intercepted [{code}]: {message}")]
    Intercepted { code: &'static str, message: String },

    /// A response could not be read
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RequestError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Timeout { .. } => "AERO_SDK_REQUEST_TIMEOUT",
            RequestError::AlreadySettled { .. } => "AERO_SDK_ALREADY_SETTLED",
            RequestError::Abandoned { .. } => "AERO_SDK_REQUEST_ABANDONED",
            RequestError::Server(_) => "AERO_SDK_SERVER_ERROR",
            RequestError::Transport(_) => "AERO_SDK_TRANSPORT_ERROR",
            RequestError::ConnectionClosed => "AERO_SDK_CONNECTION_CLOSED",
            RequestError::InvalidRequest(_) => "AERO_SDK_INVALID_REQUEST",
            RequestError::Intercepted { code, .. } => *code,
            RequestError::MalformedResponse(_) => "AERO_SDK_MALFORMED_RESPONSE",
            RequestError::Internal(_) => "AERO_SDK_INTERNAL",
        }
    }

    /// Whether the error is a programming error inside an adapter
    pub fn is_fatal(&self) -> bool {
        matches!(self, RequestError::AlreadySettled { .. })
    }

    /// Server status, if the server reported the error
    pub fn server_status(&self) -> Option<u16> {
        match self {
            RequestError::Server(error) => Some(error.status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(e: serde_json::Error) -> Self {
        RequestError::MalformedResponse(e.to_string())
    }
}
