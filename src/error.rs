//! # SDK Errors
//!
//! Umbrella error returned by the client facade.

use thiserror::Error;

use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use crate::realtime::RealtimeError;
use crate::request::RequestError;
use crate::search::SearchError;

/// Result type for client operations
pub type SdkResult<T> = Result<T, SdkError>;

/// Any error the SDK can return
#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SdkError {
    /// Stable error code of the underlying error
    pub fn code(&self) -> &'static str {
        match self {
            SdkError::Request(e) => e.code(),
            SdkError::Pipeline(e) => e.code(),
            SdkError::Realtime(e) => e.code(),
            SdkError::Search(e) => e.code(),
            SdkError::Config(e) => e.code(),
        }
    }

    /// Collapse into a request error, for the dispatcher seam
    pub fn into_request_error(self) -> RequestError {
        match self {
            SdkError::Request(e) => e,
            SdkError::Pipeline(e) => e.into(),
            SdkError::Realtime(RealtimeError::Request(e)) => e,
            SdkError::Search(SearchError::Request(e)) => e,
            other => RequestError::Internal(other.to_string()),
        }
    }
}
