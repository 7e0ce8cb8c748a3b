//! # Pipeline Errors

use thiserror::Error;

use super::interceptor::{InterceptorError, Phase};
use crate::request::RequestError;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Interceptor pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Stage is not in the configured allow-list
    #[error("Unknown stage '{stage}' (allowed: {allowed})")]
    UnknownStage { stage: String, allowed: String },

    /// Phase name is neither "before" nor "after"
    #[error("Invalid phase '{0}' (expected 'before' or 'after')")]
    InvalidPhase(String),

    /// An interceptor did not complete within the pipe timeout
    #[error("Interceptor '{interceptor}' on {stage}:{phase} timed out after {timeout_ms}ms")]
    PipeTimeout {
        interceptor: String,
        stage: String,
        phase: Phase,
        timeout_ms: u64,
    },

    /// An interceptor returned an error
    #[error("Interceptor '{interceptor}' on {stage}:{phase} failed: {source}")]
    Rejected {
        interceptor: String,
        stage: String,
        phase: Phase,
        #[source]
        source: InterceptorError,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnknownStage { .. } => "AERO_SDK_UNKNOWN_STAGE",
            PipelineError::InvalidPhase(_) => "AERO_SDK_INVALID_PHASE",
            PipelineError::PipeTimeout { .. } => "AERO_SDK_PIPE_TIMEOUT",
            PipelineError::Rejected { .. } => "AERO_SDK_PIPE_REJECTED",
            PipelineError::Internal(_) => "AERO_SDK_INTERNAL",
        }
    }

    /// Whether the error is caller misuse detected at registration time
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownStage { .. } | PipelineError::InvalidPhase(_)
        )
    }
}

impl From<PipelineError> for RequestError {
    fn from(e: PipelineError) -> Self {
        RequestError::Intercepted {
            code: e.code(),
            message: e.to_string(),
        }
    }
}
