//! Subscriber Registry
//!
//! The set of currently connected downstream channels. Each subscriber is a
//! bounded mpsc sender; broadcast walks a stable snapshot of the membership
//! and never blocks on a slow channel. A channel whose send fails (closed or
//! full) is removed as a side effect of the broadcast, without disturbing
//! delivery to the others.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::application::relay::messages::ServerMessage;
use crate::domain::subscription::SubscriberId;

/// Outcome of a broadcast pass.
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    /// Subscribers the message was queued for.
    pub delivered: usize,
    /// Subscribers removed because their channel was closed or full.
    pub dropped: Vec<SubscriberId>,
}

/// Registry of connected downstream subscriber channels.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    channels: RwLock<HashMap<SubscriberId, mpsc::Sender<ServerMessage>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscriber channel.
    pub fn add(&self, subscriber: SubscriberId, sender: mpsc::Sender<ServerMessage>) {
        self.channels.write().insert(subscriber, sender);
    }

    /// Remove a subscriber channel. Returns `true` if it was registered.
    pub fn remove(&self, subscriber: SubscriberId) -> bool {
        self.channels.write().remove(&subscriber).is_some()
    }

    /// Queue a message for every registered subscriber.
    ///
    /// Sends are non-blocking: a subscriber that cannot accept the message
    /// (disconnected, or its queue is full) is dropped from the registry and
    /// reported in the outcome. Failures never affect delivery to the
    /// remaining subscribers.
    pub fn broadcast(&self, message: &ServerMessage) -> BroadcastOutcome {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<ServerMessage>)> = self
            .channels
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut outcome = BroadcastOutcome::default();

        for (subscriber, sender) in snapshot {
            match sender.try_send(message.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
                    outcome.dropped.push(subscriber);
                }
            }
        }

        if !outcome.dropped.is_empty() {
            let mut channels = self.channels.write();
            for subscriber in &outcome.dropped {
                channels.remove(subscriber);
            }
        }

        outcome
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
