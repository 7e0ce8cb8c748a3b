//! # Pending Operations
//!
//! Pairs one outgoing request with exactly one settlement.
//!
//! ## Invariants
//!
//! - Exactly one of `settle` / `fail` succeeds; any later call returns
//!   `AlreadySettled`.
//! - Settlement cancels the timeout timer, so a timer never fires after
//!   settlement.
//! - A timeout fails the operation with `Timeout` and then asks the adapter
//!   to abort the underlying I/O. Abort failures are logged and swallowed.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::errors::{RequestError, RequestResult};
use crate::observability::{log_event_with_fields, Event};
use crate::protocol::RequestDescriptor;

/// Aborts the I/O behind a timed out request
pub trait Aborter: Send + Sync {
    /// Best-effort abort of `request_id`
    fn abort(&self, request_id: &str) -> RequestResult<()>;
}

impl<F> Aborter for F
where
    F: Fn(&str) -> RequestResult<()> + Send + Sync,
{
    fn abort(&self, request_id: &str) -> RequestResult<()> {
        self(request_id)
    }
}

/// Aborter for adapters with nothing to cancel
pub struct NoAbort;

impl Aborter for NoAbort {
    fn abort(&self, _request_id: &str) -> RequestResult<()> {
        Ok(())
    }
}

enum PendingState<T> {
    Waiting {
        sender: oneshot::Sender<RequestResult<T>>,
        timer: Option<JoinHandle<()>>,
    },
    Settled,
}

struct PendingInner<T> {
    request: RequestDescriptor,
    state: Mutex<PendingState<T>>,
}

impl<T> PendingInner<T> {
    fn request_id(&self) -> String {
        self.request.request_id_str().to_string()
    }

    fn finish(&self, outcome: RequestResult<T>, cancel_timer: bool) -> RequestResult<()> {
        let previous = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| RequestError::Internal("Lock poisoned".into()))?;
            std::mem::replace(&mut *state, PendingState::Settled)
        };

        match previous {
            PendingState::Settled => Err(RequestError::AlreadySettled {
                request_id: self.request_id(),
            }),
            PendingState::Waiting { sender, timer } => {
                if cancel_timer {
                    if let Some(timer) = timer {
                        timer.abort();
                    }
                }
                // The caller may have stopped waiting; settlement still counts
                let _ = sender.send(outcome);
                Ok(())
            }
        }
    }
}

impl<T> Drop for PendingInner<T> {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if let PendingState::Waiting {
                timer: Some(timer), ..
            } = state
            {
                timer.abort();
            }
        }
    }
}

/// The adapter-side half of an in-flight request
pub struct PendingOperation<T> {
    inner: Arc<PendingInner<T>>,
}

impl<T: Send + 'static> PendingOperation<T> {
    /// Create an operation without a deadline
    pub fn new(request: RequestDescriptor) -> (Self, PendingResponse<T>) {
        let (sender, receiver) = oneshot::channel();
        let request_id = request.request_id_str().to_string();

        let inner = Arc::new(PendingInner {
            request,
            state: Mutex::new(PendingState::Waiting {
                sender,
                timer: None,
            }),
        });

        (
            Self { inner },
            PendingResponse {
                request_id,
                receiver,
            },
        )
    }

    /// Create an operation that fails with `Timeout` after `timeout`
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(
        request: RequestDescriptor,
        timeout: Duration,
        aborter: Arc<dyn Aborter>,
    ) -> (Self, PendingResponse<T>) {
        let (operation, response) = Self::new(request);

        let weak = Arc::downgrade(&operation.inner);
        let timeout_ms = timeout.as_millis() as u64;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let request_id = inner.request_id();
            let expired = RequestError::Timeout {
                request_id: request_id.clone(),
                timeout_ms,
            };

            if inner.finish(Err(expired), false).is_ok() {
                let timeout_str = timeout_ms.to_string();
                log_event_with_fields(
                    Event::RequestTimeout,
                    &[("request_id", &request_id), ("timeout_ms", &timeout_str)],
                );

                if let Err(e) = aborter.abort(&request_id) {
                    let reason = e.to_string();
                    log_event_with_fields(
                        Event::RequestAbortFailed,
                        &[("request_id", &request_id), ("reason", &reason)],
                    );
                }
            }
        });

        operation.attach_timer(timer);
        (operation, response)
    }

    fn attach_timer(&self, timer: JoinHandle<()>) {
        if let Ok(mut state) = self.inner.state.lock() {
            if let PendingState::Waiting { timer: slot, .. } = &mut *state {
                *slot = Some(timer);
                return;
            }
        }
        timer.abort();
    }

    /// Complete the operation with a value
    pub fn settle(&self, value: T) -> RequestResult<()> {
        self.inner.finish(Ok(value), true)
    }

    /// Complete the operation with an error
    pub fn fail(&self, error: RequestError) -> RequestResult<()> {
        self.inner.finish(Err(error), true)
    }

    /// Whether a terminal operation already ran
    pub fn is_settled(&self) -> bool {
        self.inner
            .state
            .lock()
            .map(|state| matches!(*state, PendingState::Settled))
            .unwrap_or(true)
    }

    /// The request this operation tracks
    pub fn request(&self) -> &RequestDescriptor {
        &self.inner.request
    }

    /// Correlation id of the tracked request
    pub fn request_id(&self) -> &str {
        self.inner.request.request_id_str()
    }
}

/// The caller-side half: resolves once the operation settles
#[derive(Debug)]
pub struct PendingResponse<T> {
    request_id: String,
    receiver: oneshot::Receiver<RequestResult<T>>,
}

impl<T> PendingResponse<T> {
    /// Correlation id of the awaited request
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl<T> Future for PendingResponse<T> {
    type Output = RequestResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(RequestError::Abandoned {
                request_id: self.request_id.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
