//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use aerodb_sdk::events::EventBus;
use aerodb_sdk::observability::{Logger, Severity};
use aerodb_sdk::protocol::{
    DispatchFuture, QueryDispatcher, QueryOptions, RequestDescriptor, ResponseDescriptor,
};
use aerodb_sdk::request::{RequestError, RequestResult};

/// Dispatcher answering from a queue of canned results
pub struct ScriptedDispatcher {
    script: Mutex<VecDeque<RequestResult<ResponseDescriptor>>>,
    sent: Mutex<Vec<RequestDescriptor>>,
    bus: Arc<EventBus<Value>>,
    connection_id: Option<String>,
    expired: AtomicUsize,
}

impl ScriptedDispatcher {
    pub fn new(connection_id: &str) -> Arc<Self> {
        Logger::set_min_severity(Severity::Error);
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            bus: Arc::new(EventBus::new()),
            connection_id: Some(connection_id.to_string()),
            expired: AtomicUsize::new(0),
        })
    }

    /// Queue a successful response carrying `result`
    pub fn respond(&self, result: Value) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(ResponseDescriptor::ok(result)));
        self
    }

    /// Queue a failure
    pub fn fail(&self, error: RequestError) -> &Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Requests dispatched so far
    pub fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().unwrap().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn expired_count(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }

    /// Emit a channel message the way a transport would
    pub fn push(&self, channel: &str, message: Value) -> bool {
        self.bus.emit(channel, &message)
    }

    pub fn bus(&self) -> &EventBus<Value> {
        &self.bus
    }
}

impl QueryDispatcher for ScriptedDispatcher {
    fn dispatch(&self, request: RequestDescriptor, _options: QueryOptions) -> DispatchFuture<'_> {
        self.sent.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| Err(RequestError::Internal("script exhausted".into())))
        })
    }

    fn connection_id(&self) -> Option<String> {
        self.connection_id.clone()
    }

    fn channels(&self) -> Arc<EventBus<Value>> {
        Arc::clone(&self.bus)
    }

    fn token_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hits with ids `prefix-start` .. `prefix-end` and a numeric `rank` field
pub fn hits(prefix: &str, range: std::ops::Range<u64>) -> Value {
    Value::Array(
        range
            .map(|i| json!({"_id": format!("{}-{}", prefix, i), "_source": {"rank": i}}))
            .collect(),
    )
}

/// A search page result
pub fn page(hits: Value, total: u64) -> Value {
    json!({"hits": hits, "total": total})
}

/// A scroll page result
pub fn scroll_page(hits: Value, total: u64, scroll_id: &str) -> Value {
    json!({"hits": hits, "total": total, "scrollId": scroll_id})
}

/// A document notification published by `origin`
pub fn document_notification(room: &str, origin: &str, id: &str) -> Value {
    json!({
        "status": 200,
        "type": "document",
        "controller": "document",
        "action": "create",
        "index": "shop",
        "collection": "orders",
        "scope": "in",
        "state": "done",
        "room": room,
        "volatile": {"sdkInstanceId": origin},
        "result": {"_id": id, "_source": {}}
    })
}
