//! # Notifications
//!
//! Push messages delivered on a subscribed channel, and the options that
//! shape which ones the server sends.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Volatile key carrying the identity of the connection that caused a change
pub const ORIGIN_KEY: &str = "sdkInstanceId";

/// Whether a document entered or left the subscription scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    In,
    Out,
}

/// Whether the change is pending or committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationState {
    Pending,
    Done,
}

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    /// A document matching the filters changed
    #[serde(rename = "document")]
    Document,
    /// A user joined or left the room
    #[serde(rename = "user")]
    User,
    /// The authentication token expired
    TokenExpired,
    /// Anything this SDK version does not know
    #[serde(other)]
    Unknown,
}

/// A realtime notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// HTTP-like status
    #[serde(default = "default_status")]
    pub status: u16,

    /// Id of the request that caused the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Volatile metadata of the originating request
    #[serde(default)]
    pub volatile: Value,

    /// Index of the changed document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Collection of the changed document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Controller of the originating request
    #[serde(default)]
    pub controller: String,

    /// Action of the originating request
    #[serde(default)]
    pub action: String,

    /// Entering or leaving the scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,

    /// Pending or done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NotificationState>,

    /// Server payload
    #[serde(default)]
    pub result: Value,

    /// Notification kind
    #[serde(rename = "type")]
    pub kind: NotificationType,

    /// Room the notification was published to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl Notification {
    /// Connection identity declared by the originating request
    pub fn origin_id(&self) -> Option<&str> {
        self.volatile.get(ORIGIN_KEY).and_then(Value::as_str)
    }

    /// Whether this is the token expiry signal
    pub fn is_token_expired(&self) -> bool {
        self.kind == NotificationType::TokenExpired
    }

    /// Timestamp as a UTC date
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// Which scope transitions to be notified about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeFilter {
    All,
    In,
    Out,
    None,
}

/// Which document states to be notified about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    All,
    Pending,
    Done,
}

/// Options of one subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeOptions {
    /// Document scope transitions
    pub scope: ScopeFilter,
    /// Document states
    pub state: StateFilter,
    /// User join/leave notifications
    pub users: ScopeFilter,
    /// Metadata attached to the subscription
    pub volatile: Map<String, Value>,
    /// Deliver notifications caused by this connection
    pub subscribe_to_self: bool,
    /// Re-subscribe automatically after a reconnect
    pub auto_resubscribe: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            scope: ScopeFilter::All,
            state: StateFilter::Done,
            users: ScopeFilter::None,
            volatile: Map::new(),
            subscribe_to_self: true,
            auto_resubscribe: true,
        }
    }
}

impl SubscribeOptions {
    /// Set the scope filter
    pub fn with_scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Set the state filter
    pub fn with_state(mut self, state: StateFilter) -> Self {
        self.state = state;
        self
    }

    /// Set the user notification filter
    pub fn with_users(mut self, users: ScopeFilter) -> Self {
        self.users = users;
        self
    }

    /// Add subscription metadata
    pub fn with_volatile(mut self, key: impl Into<String>, value: Value) -> Self {
        self.volatile.insert(key.into(), value);
        self
    }

    /// Set whether self-originated notifications are delivered
    pub fn subscribe_to_self(mut self, enabled: bool) -> Self {
        self.subscribe_to_self = enabled;
        self
    }

    /// Set whether to re-subscribe after reconnects
    pub fn auto_resubscribe(mut self, enabled: bool) -> Self {
        self.auto_resubscribe = enabled;
        self
    }
}
