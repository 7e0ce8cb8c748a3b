//! # Protocol
//!
//! Transport-independent request/response shapes and the dispatcher seam.

pub mod dispatcher;
pub mod document;
pub mod request;
pub mod response;

pub use dispatcher::{DispatchFuture, QueryDispatcher};
pub use document::{resolve_path, FieldLookup};
pub use request::{QueryOptions, RequestDescriptor};
pub use response::{Hit, ResponseDescriptor, SearchPage, ServerError, SubscriptionAck};
