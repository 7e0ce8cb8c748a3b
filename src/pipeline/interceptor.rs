//! Interceptors and phases

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use super::errors::PipelineError;

/// Error type interceptors may return
pub type InterceptorError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by an interceptor
pub type InterceptorFuture<P> = Pin<Box<dyn Future<Output = Result<P, InterceptorError>> + Send>>;

type InterceptorFn<P> = dyn Fn(P) -> InterceptorFuture<P> + Send + Sync;

/// When an interceptor runs relative to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the request is sent
    Before,
    /// After the response is received
    After,
}

impl Phase {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Phase::Before),
            "after" => Ok(Phase::After),
            other => Err(PipelineError::InvalidPhase(other.to_string())),
        }
    }
}

/// A payload transformer
///
/// Receives the payload by value and hands back the (possibly modified)
/// payload for the next interceptor.
pub struct Interceptor<P> {
    run: Arc<InterceptorFn<P>>,
}

impl<P> Clone for Interceptor<P> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<P: Send + 'static> Interceptor<P> {
    /// Interceptor from a synchronous function
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(P) -> Result<P, InterceptorError> + Send + Sync + 'static,
    {
        Self {
            run: Arc::new(move |payload: P| -> InterceptorFuture<P> {
                let outcome = f(payload);
                Box::pin(async move { outcome })
            }),
        }
    }

    /// Interceptor from a function returning a future
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P, InterceptorError>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |payload: P| -> InterceptorFuture<P> { Box::pin(f(payload)) }),
        }
    }

    pub(crate) fn call(&self, payload: P) -> InterceptorFuture<P> {
        (self.run)(payload)
    }
}

impl<P> fmt::Debug for Interceptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interceptor")
    }
}
