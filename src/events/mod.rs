//! # Events
//!
//! Typed publish/subscribe used throughout the SDK. The transport emits
//! channel messages on an [`EventBus`] keyed by channel id, and the client
//! publishes connection-level [`SdkEvent`]s on another.

mod bus;
mod listener;

pub use bus::EventBus;
pub use listener::{Listener, ListenerFn};

/// Connection-level events published by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    /// The server reported that the authentication token expired
    TokenExpired,
    /// The transport re-established its connection
    Reconnected,
    /// The transport lost its connection
    Disconnected,
}

impl SdkEvent {
    /// Event name used on the client event bus
    pub fn name(&self) -> &'static str {
        match self {
            SdkEvent::TokenExpired => "tokenExpired",
            SdkEvent::Reconnected => "reconnected",
            SdkEvent::Disconnected => "disconnected",
        }
    }
}
