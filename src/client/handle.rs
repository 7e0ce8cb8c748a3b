//! Weak dispatcher handle
//!
//! Subscriptions live in the client's registry, so they hold the client
//! weakly. Dispatching through a dropped client fails with
//! `ConnectionClosed`.

use std::sync::{Arc, Weak};

use serde_json::Value;

use super::facade::Client;
use crate::events::EventBus;
use crate::protocol::{DispatchFuture, QueryDispatcher, QueryOptions, RequestDescriptor};
use crate::request::RequestError;

pub(crate) struct ClientHandle {
    client: Weak<Client>,
}

impl ClientHandle {
    pub(crate) fn new(client: &Arc<Client>) -> Self {
        Self {
            client: Arc::downgrade(client),
        }
    }
}

impl QueryDispatcher for ClientHandle {
    fn dispatch(&self, request: RequestDescriptor, options: QueryOptions) -> DispatchFuture<'_> {
        Box::pin(async move {
            match self.client.upgrade() {
                Some(client) => client.dispatch(request, options).await,
                None => Err(RequestError::ConnectionClosed),
            }
        })
    }

    fn connection_id(&self) -> Option<String> {
        self.client.upgrade().and_then(|c| c.connection_id())
    }

    fn channels(&self) -> Arc<EventBus<Value>> {
        match self.client.upgrade() {
            Some(client) => client.channels(),
            None => Arc::new(EventBus::new()),
        }
    }

    fn token_expired(&self) {
        if let Some(client) = self.client.upgrade() {
            client.token_expired();
        }
    }
}
