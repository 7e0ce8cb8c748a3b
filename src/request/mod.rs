//! # Request Lifecycle
//!
//! Tracks outgoing requests from dispatch to settlement.
//!
//! - [`PendingOperation`]: one request, one settlement, optional deadline
//! - [`PendingRequests`]: request-id keyed table used by transport adapters

pub mod errors;
pub mod pending;
pub mod table;

pub use errors::{RequestError, RequestResult};
pub use pending::{Aborter, NoAbort, PendingOperation, PendingResponse};
pub use table::PendingRequests;
