//! # Pending Request Table
//!
//! Request-id keyed registry used by transport adapters to match inbound
//! responses to the calls waiting on them. Entries leave the table as soon
//! as they settle, including by timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::errors::{RequestError, RequestResult};
use super::pending::{Aborter, PendingOperation, PendingResponse};
use crate::observability::{log_event_with_fields, trace_event, Event};
use crate::protocol::RequestDescriptor;

type Entries<T> = Mutex<HashMap<String, PendingOperation<T>>>;

/// Table of in-flight requests
pub struct PendingRequests<T> {
    entries: Arc<Entries<T>>,
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Removes a timed out entry, then forwards the abort to the adapter
struct EvictingAborter<T> {
    entries: Weak<Entries<T>>,
    inner: Arc<dyn Aborter>,
}

impl<T: Send> Aborter for EvictingAborter<T> {
    fn abort(&self, request_id: &str) -> RequestResult<()> {
        if let Some(entries) = self.entries.upgrade() {
            let evicted = entries.lock().ok().and_then(|mut map| map.remove(request_id));
            drop(evicted);
        }
        self.inner.abort(request_id)
    }
}

impl<T: Send + 'static> PendingRequests<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `request` until it is resolved, rejected or times out
    ///
    /// A zero or absent `timeout` disables the deadline.
    pub fn register(
        &self,
        request: RequestDescriptor,
        timeout: Option<Duration>,
        aborter: Arc<dyn Aborter>,
    ) -> RequestResult<PendingResponse<T>> {
        let request_id = match request.request_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(RequestError::InvalidRequest(
                    "request id is required to track a response".into(),
                ))
            }
        };

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RequestError::Internal("Lock poisoned".into()))?;

        if entries.contains_key(&request_id) {
            return Err(RequestError::InvalidRequest(format!(
                "request id {} is already in flight",
                request_id
            )));
        }

        let (operation, response) = match timeout {
            Some(timeout) if !timeout.is_zero() => {
                let evicting: Arc<dyn Aborter> = Arc::new(EvictingAborter {
                    entries: Arc::downgrade(&self.entries),
                    inner: aborter,
                });
                PendingOperation::with_timeout(request, timeout, evicting)
            }
            _ => PendingOperation::new(request),
        };

        entries.insert(request_id, operation);
        Ok(response)
    }

    fn take(&self, request_id: &str) -> Option<PendingOperation<T>> {
        self.entries.lock().ok().and_then(|mut map| map.remove(request_id))
    }

    /// Settle the request `request_id` with `value`
    ///
    /// Returns false when no such request is in flight (e.g. it already
    /// timed out).
    pub fn resolve(&self, request_id: &str, value: T) -> bool {
        match self.take(request_id) {
            Some(operation) => {
                let settled = operation.settle(value).is_ok();
                if settled {
                    trace_event(Event::RequestSettled, &[("request_id", request_id)]);
                }
                settled
            }
            None => {
                log_event_with_fields(Event::ResponseUnmatched, &[("request_id", request_id)]);
                false
            }
        }
    }

    /// Fail the request `request_id` with `error`
    pub fn reject(&self, request_id: &str, error: RequestError) -> bool {
        match self.take(request_id) {
            Some(operation) => operation.fail(error).is_ok(),
            None => {
                log_event_with_fields(Event::ResponseUnmatched, &[("request_id", request_id)]);
                false
            }
        }
    }

    /// Fail every in-flight request with `error`
    ///
    /// Returns how many requests were rejected.
    pub fn reject_all(&self, error: RequestError) -> usize {
        let drained: Vec<PendingOperation<T>> = match self.entries.lock() {
            Ok(mut map) => map.drain().map(|(_, op)| op).collect(),
            Err(_) => return 0,
        };

        let rejected = drained
            .iter()
            .filter(|op| op.fail(error.clone()).is_ok())
            .count();

        if rejected > 0 {
            let count = rejected.to_string();
            let reason = error.to_string();
            log_event_with_fields(
                Event::PendingRejected,
                &[("count", &count), ("reason", &reason)],
            );
        }
        rejected
    }

    /// Whether `request_id` is in flight
    pub fn contains(&self, request_id: &str) -> bool {
        self.entries
            .lock()
            .map(|map| map.contains_key(request_id))
            .unwrap_or(false)
    }

    /// Number of in-flight requests
    pub fn len(&self) -> usize {
        self.entries.lock().map(|map| map.len()).unwrap_or(0)
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::NoAbort;

    fn request(id: &str) -> RequestDescriptor {
        let mut request = RequestDescriptor::new("document", "get");
        request.request_id = Some(id.to_string());
        request
    }

    #[tokio::test]
    async fn test_resolve_matches_by_id() {
        let table = PendingRequests::<&'static str>::new();
        let first = table.register(request("a"), None, Arc::new(NoAbort)).unwrap();
        let second = table.register(request("b"), None, Arc::new(NoAbort)).unwrap();

        assert!(table.resolve("b", "second"));
        assert!(table.resolve("a", "first"));

        assert_eq!(first.await.unwrap(), "first");
        assert_eq!(second.await.unwrap(), "second");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_matched() {
        let table = PendingRequests::<u8>::new();
        assert!(!table.resolve("ghost", 1));
        assert!(!table.reject("ghost", RequestError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_register_requires_unique_id() {
        let table = PendingRequests::<u8>::new();
        let mut anonymous = request("x");
        anonymous.request_id = None;

        assert!(matches!(
            table.register(anonymous, None, Arc::new(NoAbort)),
            Err(RequestError::InvalidRequest(_))
        ));

        let _pending = table.register(request("x"), None, Arc::new(NoAbort)).unwrap();
        assert!(table.register(request("x"), None, Arc::new(NoAbort)).is_err());
    }

    #[tokio::test]
    async fn test_timeout_evicts_entry() {
        let table = PendingRequests::<u8>::new();
        let response = table
            .register(request("slow"), Some(Duration::from_millis(10)), Arc::new(NoAbort))
            .unwrap();

        assert!(matches!(response.await, Err(RequestError::Timeout { .. })));
        assert!(!table.contains("slow"));
        assert!(!table.resolve("slow", 1));
    }

    #[tokio::test]
    async fn test_reject_all() {
        let table = PendingRequests::<u8>::new();
        let a = table.register(request("a"), None, Arc::new(NoAbort)).unwrap();
        let b = table.register(request("b"), None, Arc::new(NoAbort)).unwrap();

        assert_eq!(table.reject_all(RequestError::ConnectionClosed), 2);
        assert!(matches!(a.await, Err(RequestError::ConnectionClosed)));
        assert!(matches!(b.await, Err(RequestError::ConnectionClosed)));
        assert!(table.is_empty());
    }
}
