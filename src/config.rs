//! SDK Configuration
//!
//! Timeouts, interceptor stages and realtime defaults. Every field has a
//! default, so an empty JSON object is a valid configuration.

use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};
use crate::pipeline::PipelineConfig;
use crate::realtime::SubscribeOptions;

/// Pattern every pipeline stage name must match
pub const STAGE_NAME_PATTERN: &str = "^[a-z][a-z0-9_:-]*$";

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON for this shape
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range or malformed
    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "AERO_SDK_CONFIG_IO",
            ConfigError::Parse(_) => "AERO_SDK_CONFIG_PARSE",
            ConfigError::Invalid { .. } => "AERO_SDK_CONFIG_INVALID",
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// SDK configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Request deadline in milliseconds (default: 10000, 0 disables it)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Per-interceptor deadline in milliseconds (default: 5000)
    #[serde(default = "default_pipe_timeout_ms")]
    pub pipe_timeout_ms: u64,

    /// Stages interceptors may be registered on
    #[serde(default = "default_pipeline_stages")]
    pub pipeline_stages: Vec<String>,

    /// Name sent in the volatile metadata of every request
    #[serde(default = "default_sdk_name")]
    pub sdk_name: String,

    /// Default for new subscriptions (default: true)
    #[serde(default = "default_true")]
    pub auto_resubscribe: bool,

    /// Default for new subscriptions (default: true)
    #[serde(default = "default_true")]
    pub subscribe_to_self: bool,

    /// Minimum log severity: trace, info, warn or error (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_pipe_timeout_ms() -> u64 {
    5_000
}

fn default_pipeline_stages() -> Vec<String> {
    vec![
        "request".to_string(),
        "subscribe".to_string(),
        "search".to_string(),
    ]
}

fn default_sdk_name() -> String {
    format!("aerodb-sdk@{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            pipe_timeout_ms: default_pipe_timeout_ms(),
            pipeline_stages: default_pipeline_stages(),
            sdk_name: default_sdk_name(),
            auto_resubscribe: true,
            subscribe_to_self: true,
            log_level: default_log_level(),
        }
    }
}

impl SdkConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SdkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn read_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let config = Self::from_json(&content)?;
        let path = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);
        Ok(config)
    }

    /// Check every field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pipe_timeout_ms == 0 {
            return Err(ConfigError::invalid("pipe_timeout_ms", "must be greater than 0"));
        }

        if self.pipeline_stages.is_empty() {
            return Err(ConfigError::invalid("pipeline_stages", "at least one stage is required"));
        }

        let pattern = Regex::new(STAGE_NAME_PATTERN)
            .map_err(|e| ConfigError::invalid("pipeline_stages", e.to_string()))?;
        for (i, stage) in self.pipeline_stages.iter().enumerate() {
            if !pattern.is_match(stage) {
                return Err(ConfigError::invalid(
                    "pipeline_stages",
                    format!("'{}' does not match {}", stage, STAGE_NAME_PATTERN),
                ));
            }
            if self.pipeline_stages[..i].contains(stage) {
                return Err(ConfigError::invalid(
                    "pipeline_stages",
                    format!("'{}' is listed twice", stage),
                ));
            }
        }

        if self.sdk_name.trim().is_empty() {
            return Err(ConfigError::invalid("sdk_name", "must not be empty"));
        }

        self.severity()?;
        Ok(())
    }

    /// Request deadline, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Per-interceptor deadline
    pub fn pipe_timeout(&self) -> Duration {
        Duration::from_millis(self.pipe_timeout_ms)
    }

    /// Parsed log level
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse()
            .map_err(|reason: String| ConfigError::invalid("log_level", reason))
    }

    /// Interceptor pipeline configuration
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            stages: self.pipeline_stages.clone(),
            pipe_timeout: self.pipe_timeout(),
        }
    }

    /// Subscription options seeded with the configured defaults
    pub fn subscribe_options(&self) -> SubscribeOptions {
        SubscribeOptions::default()
            .subscribe_to_self(self.subscribe_to_self)
            .auto_resubscribe(self.auto_resubscribe)
    }
}
