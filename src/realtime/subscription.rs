//! # Subscription
//!
//! One realtime room. Issues the subscribe call through the dispatcher,
//! then turns channel messages into filtered [`Notification`]s.
//!
//! ## Invariants
//!
//! - State moves `Created -> Requested -> Active -> Terminated`
//! - No callback fires before the channel id is assigned
//! - Token expiry messages never reach the callback
//! - Messages arriving after termination are dropped silently

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::{RealtimeError, RealtimeResult};
use super::notification::{Notification, SubscribeOptions};
use crate::events::{EventBus, Listener};
use crate::observability::{log_event_with_fields, trace_event, Event};
use crate::protocol::{QueryDispatcher, QueryOptions, RequestDescriptor, SubscriptionAck};

/// Callback receiving delivered notifications
pub type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Built, subscribe not called yet
    Created,
    /// Waiting for the server acknowledgement
    Requested,
    /// Bound to a room and listening on its channel
    Active,
    /// Unsubscribed or torn down
    Terminated,
}

impl SubscriptionState {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::Created => "created",
            SubscriptionState::Requested => "requested",
            SubscriptionState::Active => "active",
            SubscriptionState::Terminated => "terminated",
        }
    }
}

/// Room binding, only populated while active
struct Binding {
    room_id: String,
    channel: String,
    listener: Listener<Value>,
    bus: Arc<EventBus<Value>>,
}

struct RoomState {
    state: SubscriptionState,
    binding: Option<Binding>,
}

struct SubscriptionInner {
    dispatcher: Arc<dyn QueryDispatcher>,
    index: String,
    collection: String,
    filters: Value,
    options: SubscribeOptions,
    callback: NotificationCallback,
    room: RwLock<RoomState>,
}

/// A realtime subscription
///
/// Cloning yields another handle to the same subscription.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Build a subscription; nothing is sent until [`Subscription::subscribe`]
    pub fn new<F>(
        dispatcher: Arc<dyn QueryDispatcher>,
        index: impl Into<String>,
        collection: impl Into<String>,
        filters: Value,
        callback: F,
        options: SubscribeOptions,
    ) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SubscriptionInner {
                dispatcher,
                index: index.into(),
                collection: collection.into(),
                filters,
                options,
                callback: Arc::new(callback),
                room: RwLock::new(RoomState {
                    state: SubscriptionState::Created,
                    binding: None,
                }),
            }),
        }
    }

    /// The `realtime:subscribe` request this subscription sends
    pub fn request(&self) -> RequestDescriptor {
        let options = &self.inner.options;
        let mut request = RequestDescriptor::new("realtime", "subscribe")
            .with_index(self.inner.index.clone())
            .with_collection(self.inner.collection.clone())
            .with_body(self.inner.filters.clone())
            .with_arg("scope", json!(options.scope))
            .with_arg("state", json!(options.state))
            .with_arg("users", json!(options.users));
        request.volatile = options.volatile.clone();
        request
    }

    /// Send the subscribe request and bind to the acknowledged channel
    pub async fn subscribe(&self) -> RealtimeResult<SubscriptionAck> {
        {
            let mut room = self.inner.lock_room()?;
            match room.state {
                SubscriptionState::Requested => return Err(RealtimeError::InFlight),
                SubscriptionState::Active => {
                    let room_id = room
                        .binding
                        .as_ref()
                        .map(|b| b.room_id.clone())
                        .unwrap_or_default();
                    return Err(RealtimeError::AlreadyActive(room_id));
                }
                SubscriptionState::Created | SubscriptionState::Terminated => {
                    room.state = SubscriptionState::Requested;
                }
            }
        }

        let outcome = self
            .inner
            .dispatcher
            .dispatch(self.request(), QueryOptions::default())
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.inner.rollback_request();
                return Err(RealtimeError::Request(e));
            }
        };

        let ack = match SubscriptionAck::deserialize(&response.result) {
            Ok(ack) => ack,
            Err(e) => {
                self.inner.rollback_request();
                return Err(RealtimeError::MalformedAck(e.to_string()));
            }
        };

        let bus = self.inner.dispatcher.channels();
        let listener = channel_listener(Arc::downgrade(&self.inner));
        let bound = {
            let mut room = self.inner.lock_room()?;
            if room.state == SubscriptionState::Requested {
                room.binding = Some(Binding {
                    room_id: ack.room_id.clone(),
                    channel: ack.channel.clone(),
                    listener: listener.clone(),
                    bus: Arc::clone(&bus),
                });
                room.state = SubscriptionState::Active;
                true
            } else {
                false
            }
        };
        if !bound {
            self.release_room(&ack.room_id).await;
            return Err(RealtimeError::TerminatedDuringSubscribe);
        }
        bus.on(&ack.channel, &listener);

        log_event_with_fields(
            Event::SubscribeAck,
            &[
                ("channel", ack.channel.as_str()),
                ("collection", self.inner.collection.as_str()),
                ("index", self.inner.index.as_str()),
                ("room_id", ack.room_id.as_str()),
            ],
        );

        Ok(ack)
    }

    /// Leave the room
    ///
    /// Detaches the channel listener first, then tells the server. Calling
    /// this on a subscription that never became active only terminates it.
    pub async fn unsubscribe(&self) -> RealtimeResult<()> {
        let room_id = match self.inner.detach() {
            Some(room_id) => room_id,
            None => return Ok(()),
        };

        self.inner
            .dispatcher
            .dispatch(unsubscribe_request(&room_id), QueryOptions::default())
            .await?;

        log_event_with_fields(Event::Unsubscribed, &[("room_id", room_id.as_str())]);
        Ok(())
    }

    /// Leave a room acknowledged after the subscription was terminated
    async fn release_room(&self, room_id: &str) {
        let outcome = self
            .inner
            .dispatcher
            .dispatch(unsubscribe_request(room_id), QueryOptions::default())
            .await;

        match outcome {
            Ok(_) => log_event_with_fields(
                Event::Unsubscribed,
                &[("reason", "terminated during subscribe"), ("room_id", room_id)],
            ),
            Err(e) => {
                let reason = e.to_string();
                log_event_with_fields(
                    Event::UnsubscribeFailed,
                    &[
                        ("code", e.code()),
                        ("reason", reason.as_str()),
                        ("room_id", room_id),
                    ],
                );
            }
        }
    }

    /// Terminate locally without contacting the server
    ///
    /// Used when the owning connection is torn down.
    pub fn terminate(&self) {
        self.inner.detach();
    }

    /// Re-issue the subscribe call after the connection was re-established
    ///
    /// The previous room binding is dropped without an unsubscribe call,
    /// since the old connection no longer holds it.
    pub async fn resubscribe(&self) -> RealtimeResult<SubscriptionAck> {
        self.inner.detach();
        self.subscribe().await
    }

    /// Current lifecycle state
    pub fn state(&self) -> SubscriptionState {
        self.inner
            .room
            .read()
            .map(|room| room.state)
            .unwrap_or(SubscriptionState::Terminated)
    }

    /// Whether notifications are currently delivered
    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    /// Server room id, once acknowledged
    pub fn room_id(&self) -> Option<String> {
        self.inner.binding_field(|b| b.room_id.clone())
    }

    /// Delivery channel, once acknowledged
    pub fn channel(&self) -> Option<String> {
        self.inner.binding_field(|b| b.channel.clone())
    }

    /// Target index
    pub fn index(&self) -> &str {
        &self.inner.index
    }

    /// Target collection
    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    /// Filter body sent with the subscribe request
    pub fn filters(&self) -> &Value {
        &self.inner.filters
    }

    /// Subscription options
    pub fn options(&self) -> &SubscribeOptions {
        &self.inner.options
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("index", &self.inner.index)
            .field("collection", &self.inner.collection)
            .field("state", &self.state())
            .field("room_id", &self.room_id())
            .finish()
    }
}

impl SubscriptionInner {
    fn lock_room(&self) -> RealtimeResult<std::sync::RwLockWriteGuard<'_, RoomState>> {
        self.room
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))
    }

    fn rollback_request(&self) {
        if let Ok(mut room) = self.room.write() {
            if room.state == SubscriptionState::Requested {
                room.state = SubscriptionState::Created;
            }
        }
    }

    fn binding_field<R>(&self, read: impl Fn(&Binding) -> R) -> Option<R> {
        self.room
            .read()
            .ok()
            .and_then(|room| room.binding.as_ref().map(read))
    }

    fn is_active(&self) -> bool {
        self.room
            .read()
            .map(|room| room.state == SubscriptionState::Active)
            .unwrap_or(false)
    }

    /// Move to `Terminated` and remove the channel listener
    ///
    /// Returns the room id when the subscription was bound to one.
    fn detach(&self) -> Option<String> {
        let binding = match self.room.write() {
            Ok(mut room) => {
                room.state = SubscriptionState::Terminated;
                room.binding.take()
            }
            Err(_) => None,
        };

        binding.map(|b| {
            b.bus.remove_listener(&b.channel, &b.listener);
            b.room_id
        })
    }

    fn on_channel_message(&self, message: &Value) {
        if !self.is_active() {
            trace_event(Event::NotificationDropped, &[("reason", "terminated")]);
            return;
        }

        let notification = match Notification::deserialize(message) {
            Ok(notification) => notification,
            Err(e) => {
                let reason = e.to_string();
                log_event_with_fields(
                    Event::NotificationDropped,
                    &[("reason", "malformed"), ("error", reason.as_str())],
                );
                return;
            }
        };

        if notification.is_token_expired() {
            log_event_with_fields(Event::TokenExpired, &[("index", self.index.as_str())]);
            self.dispatcher.token_expired();
            return;
        }

        if !self.options.subscribe_to_self && self.is_from_self(&notification) {
            trace_event(Event::NotificationDropped, &[("reason", "self")]);
            return;
        }

        (self.callback)(&notification);
    }

    fn is_from_self(&self, notification: &Notification) -> bool {
        match (notification.origin_id(), self.dispatcher.connection_id()) {
            (Some(origin), Some(local)) => origin == local,
            _ => false,
        }
    }
}

fn unsubscribe_request(room_id: &str) -> RequestDescriptor {
    RequestDescriptor::new("realtime", "unsubscribe").with_body(json!({ "roomId": room_id }))
}

fn channel_listener(subscription: Weak<SubscriptionInner>) -> Listener<Value> {
    Listener::new(move |message: &Value| {
        if let Some(inner) = subscription.upgrade() {
            inner.on_channel_message(message);
        }
    })
}
