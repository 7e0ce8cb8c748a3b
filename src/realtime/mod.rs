//! # Real-Time Module
//!
//! Realtime room subscriptions over the dispatcher's channel bus.
//!
//! ## Architecture
//!
//! - **Subscription**: one room, from subscribe request to teardown
//! - **Notification**: typed channel message and subscription options
//! - **Registry**: the rooms of one connection, resubscribed on reconnect

pub mod errors;
pub mod notification;
pub mod registry;
pub mod subscription;

pub use errors::{RealtimeError, RealtimeResult};
pub use notification::{
    Notification, NotificationState, NotificationType, Scope, ScopeFilter, StateFilter,
    SubscribeOptions, ORIGIN_KEY,
};
pub use registry::{ReconnectReport, SubscriptionRegistry};
pub use subscription::{NotificationCallback, Subscription, SubscriptionState};
