//! Response descriptors
//!
//! What the server sends back for a request, plus the typed views the core
//! reads out of it: search pages and subscription acknowledgements.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error reported by the server
///
/// Passed through to the caller untouched, including the per-item failures
/// of a partial (206) success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    /// HTTP-like status code
    #[serde(default = "default_error_status")]
    pub status: u16,

    /// Human readable message
    #[serde(default)]
    pub message: String,

    /// Stable error identifier (e.g. "security.token.expired")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Server-side stack, when the server runs in development mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Failed sub-operations of a partial success
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
}

fn default_error_status() -> u16 {
    500
}

impl ServerError {
    /// Build an error with a status and message
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            id: None,
            stack: None,
            errors: Vec::new(),
        }
    }

    /// Whether this is a partial success carrying per-item failures
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server error {}: {}", self.status, self.message)?;
        if let Some(ref id) = self.id {
            write!(f, " ({})", id)?;
        }
        Ok(())
    }
}

/// A response frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    /// Correlation id of the originating request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// HTTP-like status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Controller of the originating request
    #[serde(default)]
    pub controller: String,

    /// Action of the originating request
    #[serde(default)]
    pub action: String,

    /// Index, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Collection, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Result payload
    #[serde(default)]
    pub result: Value,

    /// Server error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServerError>,

    /// Delivery channel of the frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// Volatile metadata echoed back by the server
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub volatile: Value,
}

fn default_status() -> u16 {
    200
}

impl ResponseDescriptor {
    /// A successful response carrying `result`
    pub fn ok(result: Value) -> Self {
        Self {
            request_id: None,
            status: 200,
            controller: String::new(),
            action: String::new(),
            index: None,
            collection: None,
            result,
            error: None,
            room: None,
            volatile: Value::Null,
        }
    }

    /// Attach the correlation id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Read the result as a search page
    pub fn search_page(&self) -> Result<SearchPage, serde_json::Error> {
        SearchPage::deserialize(&self.result)
    }

    /// Read the result as a subscription acknowledgement
    pub fn subscription_ack(&self) -> Result<SubscriptionAck, serde_json::Error> {
        SubscriptionAck::deserialize(&self.result)
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Document identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Document body
    #[serde(rename = "_source", default)]
    pub source: Value,

    /// Relevance score
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Highlighted fragments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
}

impl Hit {
    /// Build a hit from an id and document body
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
            score: None,
            highlight: None,
        }
    }
}

/// Result of a search-like action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Hits of this page, in server order
    #[serde(default)]
    pub hits: Vec<Hit>,

    /// Total number of matching hits
    #[serde(default)]
    pub total: u64,

    /// Aggregation results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,

    /// Scroll cursor to pass to the next scroll call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
}

/// Server acknowledgement of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionAck {
    /// Server-side room identifier
    pub room_id: String,

    /// Transport-level delivery channel
    pub channel: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_page_from_result() {
        let response = ResponseDescriptor::ok(json!({
            "hits": [{"_id": "a", "_source": {"n": 1}, "_score": 1.5}],
            "total": 7,
            "scrollId": "cursor-1",
            "aggregations": {"avg": {"value": 2}}
        }));

        let page = response.search_page().unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.hits[0].id, "a");
        assert_eq!(page.hits[0].score, Some(1.5));
        assert_eq!(page.scroll_id.as_deref(), Some("cursor-1"));
        assert!(page.aggregations.is_some());
    }

    #[test]
    fn test_subscription_ack() {
        let response = ResponseDescriptor::ok(json!({"roomId": "room-1", "channel": "room-1-in"}));
        let ack = response.subscription_ack().unwrap();
        assert_eq!(ack.room_id, "room-1");
        assert_eq!(ack.channel, "room-1-in");
    }

    #[test]
    fn test_response_defaults() {
        let response: ResponseDescriptor =
            serde_json::from_value(json!({"requestId": "r1", "result": true})).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_with_request_id_serializes_camel_case() {
        let response = ResponseDescriptor::ok(json!(1)).with_request_id("r9");
        let frame = serde_json::to_value(&response).unwrap();
        assert_eq!(frame["requestId"], json!("r9"));
    }

    #[test]
    fn test_partial_error_keeps_failures() {
        let error: ServerError = serde_json::from_value(json!({
            "status": 206,
            "message": "some actions failed",
            "errors": [{"_id": "x", "reason": "conflict"}]
        }))
        .unwrap();

        assert!(error.is_partial());
        assert_eq!(error.errors.len(), 1);
        assert!(error.to_string().contains("206"));
    }
}
