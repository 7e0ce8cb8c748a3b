//! Request descriptors
//!
//! The generic shape every outgoing call takes before it reaches a
//! transport: a `controller:action` pair, optional index/collection, a body,
//! the search continuation fields and free-form extra arguments.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One logical request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    /// Correlation id, assigned by the client before sending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Controller name (e.g. "document")
    pub controller: String,

    /// Action name (e.g. "search")
    pub action: String,

    /// Target index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Target collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Request body
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,

    /// Offset of the first hit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,

    /// Page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Scroll cursor time-to-live (e.g. "30s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<String>,

    /// Scroll cursor id, set on scroll continuations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,

    /// Caller metadata echoed back in notifications
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub volatile: Map<String, Value>,

    /// Action-specific arguments
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

impl RequestDescriptor {
    /// Create a request for `controller:action`
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    /// Set the index
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set the collection
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Set the offset
    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the page size
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the scroll time-to-live
    pub fn with_scroll(mut self, scroll: impl Into<String>) -> Self {
        self.scroll = Some(scroll.into());
        self
    }

    /// Add a volatile metadata entry
    pub fn with_volatile(mut self, key: impl Into<String>, value: Value) -> Self {
        self.volatile.insert(key.into(), value);
        self
    }

    /// Add an action-specific argument
    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    /// `controller:action`, for logging
    pub fn action_name(&self) -> String {
        format!("{}:{}", self.controller, self.action)
    }

    /// Request id or an empty string when not yet assigned
    pub fn request_id_str(&self) -> &str {
        self.request_id.as_deref().unwrap_or("")
    }

    /// Sort specification carried in the body, if any
    pub fn sort(&self) -> Option<&Value> {
        self.body.get("sort").filter(|sort| !sort.is_null())
    }
}

/// Per-call dispatch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Overrides the configured request timeout; `Some(Duration::ZERO)` disables it
    pub timeout: Option<Duration>,

    /// Whether the transport may queue the request while offline
    pub queuable: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            queuable: true,
        }
    }
}

impl QueryOptions {
    /// Options with an explicit timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }
}
