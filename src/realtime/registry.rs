//! # Subscription Registry
//!
//! Active subscriptions of one connection, keyed by room id. Enacts the
//! `auto_resubscribe` policy after a reconnect and tears everything down
//! when the connection goes away.

use std::collections::HashMap;
use std::sync::RwLock;

use futures_util::future::join_all;

use super::errors::{RealtimeError, RealtimeResult};
use super::subscription::Subscription;
use crate::observability::{log_event_with_fields, Event};

/// Outcome of [`SubscriptionRegistry::on_reconnect`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectReport {
    /// Subscriptions bound to a fresh room
    pub resubscribed: usize,
    /// Subscriptions terminated because they opted out of resubscribing
    pub dropped: usize,
    /// Subscriptions whose resubscribe call failed
    pub failed: usize,
}

/// Registry of active subscriptions
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_room: RwLock<HashMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an active subscription under its room id
    pub fn add(&self, subscription: Subscription) -> RealtimeResult<String> {
        let room_id = subscription.room_id().ok_or(RealtimeError::NotActive)?;

        let mut by_room = self
            .by_room
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;
        by_room.insert(room_id.clone(), subscription);

        Ok(room_id)
    }

    /// Look up a subscription by room id
    pub fn get(&self, room_id: &str) -> Option<Subscription> {
        self.by_room
            .read()
            .ok()
            .and_then(|by_room| by_room.get(room_id).cloned())
    }

    /// Stop tracking a room
    pub fn remove(&self, room_id: &str) -> RealtimeResult<Subscription> {
        let mut by_room = self
            .by_room
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;
        by_room
            .remove(room_id)
            .ok_or_else(|| RealtimeError::RoomNotFound(room_id.to_string()))
    }

    /// Room ids currently tracked, sorted
    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .by_room
            .read()
            .map(|by_room| by_room.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Number of tracked subscriptions
    pub fn len(&self) -> usize {
        self.by_room.read().map(|by_room| by_room.len()).unwrap_or(0)
    }

    /// Whether no subscription is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain(&self) -> Vec<Subscription> {
        match self.by_room.write() {
            Ok(mut by_room) => by_room.drain().map(|(_, sub)| sub).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Re-issue every subscription that asked for it
    ///
    /// Subscriptions with `auto_resubscribe` off are terminated. The rest
    /// are re-issued concurrently; failures are logged, counted and
    /// terminated.
    pub async fn on_reconnect(&self) -> ReconnectReport {
        let mut report = ReconnectReport::default();

        let (keep, opted_out): (Vec<Subscription>, Vec<Subscription>) = self
            .drain()
            .into_iter()
            .partition(|subscription| subscription.options().auto_resubscribe);

        for subscription in opted_out {
            subscription.terminate();
            report.dropped += 1;
        }

        let outcomes = join_all(keep.into_iter().map(|subscription| async move {
            let previous = subscription.room_id().unwrap_or_default();
            let outcome = subscription.resubscribe().await;
            (subscription, previous, outcome)
        }))
        .await;

        for (subscription, previous, outcome) in outcomes {
            match outcome {
                Ok(ack) => {
                    log_event_with_fields(
                        Event::Resubscribed,
                        &[
                            ("previous_room_id", previous.as_str()),
                            ("room_id", ack.room_id.as_str()),
                        ],
                    );
                    if let Ok(mut by_room) = self.by_room.write() {
                        by_room.insert(ack.room_id, subscription);
                    }
                    report.resubscribed += 1;
                }
                Err(e) => {
                    let reason = e.to_string();
                    log_event_with_fields(
                        Event::ResubscribeFailed,
                        &[
                            ("code", e.code()),
                            ("reason", reason.as_str()),
                            ("room_id", previous.as_str()),
                        ],
                    );
                    subscription.terminate();
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Terminate and forget every subscription
    pub fn teardown(&self) -> usize {
        let subscriptions = self.drain();
        for subscription in &subscriptions {
            subscription.terminate();
        }
        subscriptions.len()
    }
}
