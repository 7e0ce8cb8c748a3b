//! # Interceptor Pipeline
//!
//! Before/after interceptors run around every request.
//!
//! ## Design Principles
//!
//! - Stages come from a fixed allow-list; unknown stages fail at registration
//! - Interceptors run sequentially, never concurrently
//! - Each interceptor call is bounded by the pipe timeout

pub mod errors;
pub mod interceptor;
#[allow(clippy::module_inception)]
pub mod pipeline;

pub use errors::{PipelineError, PipelineResult};
pub use interceptor::{Interceptor, InterceptorError, InterceptorFuture, Phase};
pub use pipeline::{InterceptorPipeline, PipelineBuilder, PipelineConfig, DEFAULT_PIPE_TIMEOUT};
