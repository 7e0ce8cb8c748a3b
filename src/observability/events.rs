//! Observable SDK events
//!
//! Every log line the SDK writes names one of these events.

use std::fmt;

/// Observable events in the SDK core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded and validated
    ConfigLoaded,

    // Request lifecycle
    /// Request handed to the transport
    RequestSent,
    /// Response matched to a pending request
    RequestSettled,
    /// Pending request exceeded its deadline
    RequestTimeout,
    /// Transport refused to abort a timed out request
    RequestAbortFailed,
    /// Response arrived for an unknown request id
    ResponseUnmatched,
    /// Pending requests rejected because the connection went away
    PendingRejected,

    // Interceptor pipeline
    /// Interceptor registered
    InterceptorRegistered,
    /// Interceptor exceeded the pipe timeout
    PipeTimeout,
    /// Interceptor returned an error
    PipeRejected,

    // Connection
    /// Transport lost its connection
    ConnectionLost,
    /// Transport re-established its connection
    ConnectionRestored,
    /// Every subscription terminated locally
    SubscriptionsTornDown,

    // Realtime
    /// Server acknowledged a subscription
    SubscribeAck,
    /// Subscription terminated by the caller
    Unsubscribed,
    /// Server did not confirm leaving a room
    UnsubscribeFailed,
    /// Channel message dropped before reaching the user callback
    NotificationDropped,
    /// Server signalled that the auth token expired
    TokenExpired,
    /// Subscription re-issued after reconnect
    Resubscribed,
    /// Subscription could not be re-issued after reconnect
    ResubscribeFailed,

    // Pagination
    /// Next page fetched
    PageFetched,
    /// Result chain exhausted
    PagesExhausted,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::RequestSent => "REQUEST_SENT",
            Event::RequestSettled => "REQUEST_SETTLED",
            Event::RequestTimeout => "REQUEST_TIMEOUT",
            Event::RequestAbortFailed => "REQUEST_ABORT_FAILED",
            Event::ResponseUnmatched => "RESPONSE_UNMATCHED",
            Event::PendingRejected => "PENDING_REJECTED",

            Event::InterceptorRegistered => "INTERCEPTOR_REGISTERED",
            Event::PipeTimeout => "PIPE_TIMEOUT",
            Event::PipeRejected => "PIPE_REJECTED",

            Event::ConnectionLost => "CONNECTION_LOST",
            Event::ConnectionRestored => "CONNECTION_RESTORED",
            Event::SubscriptionsTornDown => "SUBSCRIPTIONS_TORN_DOWN",

            Event::SubscribeAck => "SUBSCRIBE_ACK",
            Event::Unsubscribed => "UNSUBSCRIBED",
            Event::UnsubscribeFailed => "UNSUBSCRIBE_FAILED",
            Event::NotificationDropped => "NOTIFICATION_DROPPED",
            Event::TokenExpired => "TOKEN_EXPIRED",
            Event::Resubscribed => "RESUBSCRIBED",
            Event::ResubscribeFailed => "RESUBSCRIBE_FAILED",

            Event::PageFetched => "PAGE_FETCHED",
            Event::PagesExhausted => "PAGES_EXHAUSTED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::RequestTimeout
                | Event::RequestAbortFailed
                | Event::PipeTimeout
                | Event::PipeRejected
                | Event::ResubscribeFailed
                | Event::UnsubscribeFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
