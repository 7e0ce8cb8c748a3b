//! In-process transport
//!
//! Outgoing frames are pushed onto an unbounded `mpsc` queue; whoever holds
//! the receiving end plays the server and feeds frames back through
//! [`QueueTransport::deliver`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::{Transport, TransportFuture};
use crate::events::EventBus;
use crate::observability::{log_event_with_fields, trace_event, Event};
use crate::protocol::{RequestDescriptor, ResponseDescriptor, ServerError};
use crate::request::{Aborter, PendingRequests, RequestError, RequestResult};

/// Abort frames are pushed onto the same queue as requests
struct QueueAborter {
    outgoing: mpsc::UnboundedSender<Value>,
}

impl Aborter for QueueAborter {
    fn abort(&self, request_id: &str) -> RequestResult<()> {
        self.outgoing
            .send(json!({ "abort": request_id }))
            .map_err(|_| RequestError::Transport("outgoing queue closed".into()))
    }
}

/// Transport backed by an in-process frame queue
pub struct QueueTransport {
    outgoing: mpsc::UnboundedSender<Value>,
    pending: PendingRequests<ResponseDescriptor>,
    channels: Arc<EventBus<Value>>,
    connection_id: RwLock<Option<String>>,
    connected: AtomicBool,
}

impl QueueTransport {
    /// Create a connected transport and the receiver of its outgoing frames
    pub fn new(connection_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (outgoing, incoming) = mpsc::unbounded_channel();
        let transport = Self {
            outgoing,
            pending: PendingRequests::new(),
            channels: Arc::new(EventBus::new()),
            connection_id: RwLock::new(Some(connection_id.into())),
            connected: AtomicBool::new(true),
        };
        (transport, incoming)
    }

    /// Feed one inbound frame
    ///
    /// Notifications (frames carrying a `room` and a `type`) always go to the
    /// channel bus, even when their `requestId` names an in-flight request.
    /// Other frames answering an in-flight request settle it; status 400 and
    /// above fails it with the server error. Remaining frames carrying a
    /// `room` are emitted on the channel bus.
    pub fn deliver(&self, frame: Value) -> RequestResult<()> {
        let room = frame.get("room").and_then(Value::as_str).map(str::to_string);
        let pending_id = frame
            .get("requestId")
            .and_then(Value::as_str)
            .filter(|id| self.pending.contains(id))
            .map(str::to_string);
        let is_notification = frame.get("type").is_some();

        if let Some(room) = room.filter(|_| is_notification || pending_id.is_none()) {
            if !self.channels.emit(&room, &frame) {
                trace_event(
                    Event::NotificationDropped,
                    &[("reason", "no listener"), ("room", room.as_str())],
                );
            }
            return Ok(());
        }

        if let Some(request_id) = pending_id {
            return self.settle(&request_id, frame);
        }

        let request_id = frame.get("requestId").and_then(Value::as_str).unwrap_or("");
        log_event_with_fields(Event::ResponseUnmatched, &[("request_id", request_id)]);
        Ok(())
    }

    fn settle(&self, request_id: &str, frame: Value) -> RequestResult<()> {
        let response: ResponseDescriptor = serde_json::from_value(frame)
            .map_err(|e| RequestError::MalformedResponse(e.to_string()))?;

        if response.status >= 400 || response.error.is_some() {
            let error = response
                .error
                .unwrap_or_else(|| ServerError::new(response.status, "request failed"));
            self.pending.reject(request_id, RequestError::Server(error));
        } else {
            self.pending.resolve(request_id, response);
        }
        Ok(())
    }

    /// Drop the connection, failing every in-flight request
    pub fn disconnect(&self) -> usize {
        self.connected.store(false, Ordering::SeqCst);
        self.pending.reject_all(RequestError::ConnectionClosed)
    }

    /// Mark the connection as re-established under `connection_id`
    pub fn reconnect(&self, connection_id: impl Into<String>) {
        if let Ok(mut id) = self.connection_id.write() {
            *id = Some(connection_id.into());
        }
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Number of requests waiting for a response
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

impl Transport for QueueTransport {
    fn send(&self, request: RequestDescriptor, timeout: Option<Duration>) -> TransportFuture<'_> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(RequestError::ConnectionClosed);
            }

            let request_id = request.request_id_str().to_string();
            let frame = serde_json::to_value(&request)?;
            let aborter = Arc::new(QueueAborter {
                outgoing: self.outgoing.clone(),
            });
            let response = self.pending.register(request, timeout, aborter)?;

            if self.outgoing.send(frame).is_err() {
                let error = RequestError::Transport("outgoing queue closed".into());
                self.pending.reject(&request_id, error.clone());
                return Err(error);
            }

            response.await
        })
    }

    fn connection_id(&self) -> Option<String> {
        self.connection_id.read().ok().and_then(|id| id.clone())
    }

    fn channels(&self) -> Arc<EventBus<Value>> {
        Arc::clone(&self.channels)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
