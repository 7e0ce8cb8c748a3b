//! # Search Errors
//!
//! Error types for paginated search results.

use thiserror::Error;

use crate::request::RequestError;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Search and pagination errors
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The original request gives no way to fetch the next page
    #[error("Cannot fetch next page of {action}: {reason}")]
    MissingPaginationContext { action: String, reason: String },

    /// The sort specification cannot be turned into a field list
    #[error("Ambiguous sort specification: {reason}")]
    AmbiguousSort { reason: String },

    /// Keyset pagination needs a last hit to continue from
    #[error("Cannot build search_after for {action}: current page has no hits")]
    EmptyPage { action: String },

    /// The response result is not a search page
    #[error("Malformed search page: {0}")]
    MalformedPage(String),

    /// The underlying request failed
    #[error(transparent)]
    Request(#[from] RequestError),
}

impl SearchError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::MissingPaginationContext { .. } => "AERO_SDK_MISSING_PAGINATION_CONTEXT",
            SearchError::AmbiguousSort { .. } => "AERO_SDK_AMBIGUOUS_SORT",
            SearchError::EmptyPage { .. } => "AERO_SDK_EMPTY_PAGE",
            SearchError::MalformedPage(_) => "AERO_SDK_MALFORMED_PAGE",
            SearchError::Request(inner) => inner.code(),
        }
    }

    pub(crate) fn missing_context(action: impl Into<String>, reason: impl Into<String>) -> Self {
        SearchError::MissingPaginationContext {
            action: action.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn ambiguous_sort(reason: impl Into<String>) -> Self {
        SearchError::AmbiguousSort {
            reason: reason.into(),
        }
    }
}
