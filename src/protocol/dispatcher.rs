//! Query dispatcher seam
//!
//! Everything above the transport (subscriptions, paginated results) talks
//! to the backend through this trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use super::request::{QueryOptions, RequestDescriptor};
use super::response::ResponseDescriptor;
use crate::events::EventBus;
use crate::request::RequestResult;

/// Future returned by [`QueryDispatcher::dispatch`]
pub type DispatchFuture<'a> =
    Pin<Box<dyn Future<Output = RequestResult<ResponseDescriptor>> + Send + 'a>>;

/// Sends requests and exposes the connection context realtime code needs
pub trait QueryDispatcher: Send + Sync {
    /// Send `request` and wait for its response
    fn dispatch(&self, request: RequestDescriptor, options: QueryOptions) -> DispatchFuture<'_>;

    /// Identity of the local connection, used to recognise self-originated
    /// notifications
    fn connection_id(&self) -> Option<String>;

    /// Bus on which channel messages are emitted, keyed by channel id
    fn channels(&self) -> Arc<EventBus<Value>>;

    /// Called when a channel reports that the auth token expired
    fn token_expired(&self);
}
