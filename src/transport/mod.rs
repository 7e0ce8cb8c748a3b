//! # Transport
//!
//! The seam between the client and a concrete wire adapter. An adapter
//! sends request frames, matches inbound responses to the calls waiting on
//! them and emits room notifications on its channel bus.

pub mod queue;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::events::EventBus;
use crate::protocol::{RequestDescriptor, ResponseDescriptor};
use crate::request::RequestResult;

pub use queue::QueueTransport;

/// Future returned by [`Transport::send`]
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = RequestResult<ResponseDescriptor>> + Send + 'a>>;

/// A wire adapter
pub trait Transport: Send + Sync {
    /// Send `request` and wait for the matching response
    ///
    /// `timeout` of `None` or zero waits forever.
    fn send(&self, request: RequestDescriptor, timeout: Option<Duration>) -> TransportFuture<'_>;

    /// Identity of the connection as seen by the server
    fn connection_id(&self) -> Option<String>;

    /// Bus on which room notifications are emitted, keyed by room id
    fn channels(&self) -> Arc<EventBus<Value>>;

    /// Whether the adapter currently holds a connection
    fn is_connected(&self) -> bool;
}
