//! Interceptor Pipeline
//!
//! Ordered interceptors keyed by `(stage, phase)`, run as a sequential
//! waterfall: each interceptor receives the payload returned by the
//! previous one. Every call is bounded by the pipe timeout.
//!
//! A failing or timed out interceptor stops the waterfall. Changes already
//! made by earlier interceptors are not rolled back.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use super::errors::{PipelineError, PipelineResult};
use super::interceptor::{Interceptor, Phase};
use crate::observability::{log_event_with_fields, trace_event, Event};

/// Default per-interceptor timeout
pub const DEFAULT_PIPE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Stages interceptors may be registered on
    pub stages: Vec<String>,
    /// Per-interceptor timeout
    pub pipe_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            pipe_timeout: DEFAULT_PIPE_TIMEOUT,
        }
    }
}

struct Registration<P> {
    description: String,
    interceptor: Interceptor<P>,
}

impl<P> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            interceptor: self.interceptor.clone(),
        }
    }
}

/// The interceptor pipeline
pub struct InterceptorPipeline<P> {
    config: PipelineConfig,
    chains: RwLock<HashMap<(String, Phase), Vec<Registration<P>>>>,
}

impl<P: Send + 'static> InterceptorPipeline<P> {
    /// Create a pipeline from its configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// The configured per-interceptor timeout
    pub fn pipe_timeout(&self) -> Duration {
        self.config.pipe_timeout
    }

    /// Stages accepted by this pipeline
    pub fn stages(&self) -> &[String] {
        &self.config.stages
    }

    fn check_stage(&self, stage: &str) -> PipelineResult<()> {
        if self.config.stages.iter().any(|s| s == stage) {
            Ok(())
        } else {
            Err(PipelineError::UnknownStage {
                stage: stage.to_string(),
                allowed: self.config.stages.join(", "),
            })
        }
    }

    /// Append `interceptor` to the `(stage, phase)` chain
    ///
    /// Fails with `UnknownStage` when `stage` is not in the allow-list.
    pub fn register(
        &self,
        stage: &str,
        phase: Phase,
        description: &str,
        interceptor: Interceptor<P>,
    ) -> PipelineResult<()> {
        self.check_stage(stage)?;

        let mut chains = self
            .chains
            .write()
            .map_err(|_| PipelineError::Internal("Lock poisoned".into()))?;

        chains
            .entry((stage.to_string(), phase))
            .or_default()
            .push(Registration {
                description: description.to_string(),
                interceptor,
            });

        trace_event(
            Event::InterceptorRegistered,
            &[("stage", stage), ("phase", phase.as_str()), ("interceptor", description)],
        );
        Ok(())
    }

    /// [`InterceptorPipeline::register`] with the phase given by name
    pub fn register_named(
        &self,
        stage: &str,
        phase: &str,
        description: &str,
        interceptor: Interceptor<P>,
    ) -> PipelineResult<()> {
        let phase: Phase = phase.parse()?;
        self.register(stage, phase, description, interceptor)
    }

    /// Number of interceptors on the `(stage, phase)` chain
    pub fn interceptor_count(&self, stage: &str, phase: Phase) -> usize {
        self.chains
            .read()
            .map(|chains| {
                chains
                    .get(&(stage.to_string(), phase))
                    .map(Vec::len)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Run the `(stage, phase)` chain over `payload`
    pub async fn execute(&self, stage: &str, phase: Phase, payload: P) -> PipelineResult<P> {
        self.check_stage(stage)?;

        let chain: Vec<Registration<P>> = {
            let chains = self
                .chains
                .read()
                .map_err(|_| PipelineError::Internal("Lock poisoned".into()))?;
            match chains.get(&(stage.to_string(), phase)) {
                Some(chain) => chain.clone(),
                None => return Ok(payload),
            }
        };

        let timeout = self.config.pipe_timeout;
        let mut payload = payload;

        for registration in chain {
            let call = registration.interceptor.call(payload);
            payload = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(next)) => next,
                Ok(Err(source)) => {
                    let reason = source.to_string();
                    log_event_with_fields(
                        Event::PipeRejected,
                        &[
                            ("interceptor", &registration.description),
                            ("phase", phase.as_str()),
                            ("reason", &reason),
                            ("stage", stage),
                        ],
                    );
                    return Err(PipelineError::Rejected {
                        interceptor: registration.description,
                        stage: stage.to_string(),
                        phase,
                        source,
                    });
                }
                Err(_elapsed) => {
                    let timeout_ms = timeout.as_millis() as u64;
                    let timeout_str = timeout_ms.to_string();
                    log_event_with_fields(
                        Event::PipeTimeout,
                        &[
                            ("interceptor", &registration.description),
                            ("phase", phase.as_str()),
                            ("stage", stage),
                            ("timeout_ms", &timeout_str),
                        ],
                    );
                    return Err(PipelineError::PipeTimeout {
                        interceptor: registration.description,
                        stage: stage.to_string(),
                        phase,
                        timeout_ms,
                    });
                }
            };
        }

        Ok(payload)
    }
}

/// Builder for pipeline construction
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Allow interceptors on `stage`
    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.config.stages.push(stage.into());
        self
    }

    /// Allow interceptors on every stage in `stages`
    pub fn stages<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.stages.extend(stages.into_iter().map(Into::into));
        self
    }

    /// Set the per-interceptor timeout
    pub fn pipe_timeout(mut self, timeout: Duration) -> Self {
        self.config.pipe_timeout = timeout;
        self
    }

    /// Build the pipeline
    pub fn build<P: Send + 'static>(self) -> InterceptorPipeline<P> {
        InterceptorPipeline::new(self.config)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
