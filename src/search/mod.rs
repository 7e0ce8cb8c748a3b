//! # Search
//!
//! Paginated results over search-like actions, continued by scroll cursor,
//! keyset (`search_after`) or offset.

pub mod actions;
pub mod errors;
pub mod result;
pub mod sort;

pub use actions::SearchActions;
pub use errors::{SearchError, SearchResult};
pub use result::{PaginatedResult, Strategy, SEARCH_AFTER_KEY};
pub use sort::{sort_fields, ID_FIELD};
