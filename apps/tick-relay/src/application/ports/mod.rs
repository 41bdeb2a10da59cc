//! Feed Connector Ports
//!
//! The channel contract between the relay and the upstream feed connector,
//! and the shared view of the connector's state.
//!
//! The connector consumes [`FeedCommand`]s (subscription changes the relay
//! wants applied upstream) and emits [`FeedEvent`]s (decoded ticks and
//! lifecycle transitions) in wire order. Both directions are bounded mpsc
//! channels; the relay never touches the connection itself.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::pricing::Tick;
use crate::domain::subscription::Symbol;

// =============================================================================
// Channel Messages
// =============================================================================

/// Subscription change the connector must apply upstream.
///
/// Issued by the relay broker only on refcount transitions, so each command
/// maps to exactly one upstream control frame (once connected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    /// Start the upstream subscription for a symbol.
    Subscribe(Symbol),
    /// Stop the upstream subscription for a symbol.
    Unsubscribe(Symbol),
}

/// Event emitted by the feed connector.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Upstream connection established; subscriptions have been replayed.
    Connected,
    /// Upstream connection lost.
    Disconnected,
    /// Retry scheduled after a connection loss.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// A decoded price tick, in wire order.
    Tick(Tick),
}

// =============================================================================
// Connection State
// =============================================================================

/// Upstream connection lifecycle.
///
/// `Disconnected → Connecting → Connected → Disconnected → …`; there is no
/// terminal state, the connector runs until process shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection; initial state.
    #[default]
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Connected and relaying.
    Connected,
}

impl ConnectionState {
    /// Name used in health output and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

// =============================================================================
// Feed State
// =============================================================================

/// Shared view of the upstream feed connection, fed by the event loop and
/// read by the health surface.
#[derive(Debug, Default)]
pub struct FeedState {
    state: RwLock<ConnectionState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    reconnect_attempts: AtomicU32,
    ticks_received: AtomicU64,
}

impl FeedState {
    /// Create state for a not-yet-connected feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a state transition.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Connected {
            *self.last_connected_at.write() = Some(Utc::now());
            self.reconnect_attempts.store(0, Ordering::Relaxed);
        }
    }

    /// Record a scheduled reconnection attempt.
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a received tick.
    pub fn increment_ticks(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the feed is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Time of the most recent successful connect.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Reconnection attempts since the last successful connect.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Ticks received since process start.
    #[must_use]
    pub fn ticks_received(&self) -> u64 {
        self.ticks_received.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_disconnected() {
        let state = FeedState::new();
        assert_eq!(state.state(), ConnectionState::Disconnected);
        assert!(!state.is_connected());
        assert!(state.last_connected_at().is_none());
    }

    #[test]
    fn connect_stamps_time_and_resets_attempts() {
        let state = FeedState::new();

        state.increment_reconnect_attempts();
        state.increment_reconnect_attempts();
        assert_eq!(state.reconnect_attempts(), 2);

        state.set_state(ConnectionState::Connected);

        assert!(state.is_connected());
        assert!(state.last_connected_at().is_some());
        assert_eq!(state.reconnect_attempts(), 0);
    }

    #[test]
    fn tick_counter_accumulates() {
        let state = FeedState::new();

        state.increment_ticks();
        state.increment_ticks();

        assert_eq!(state.ticks_received(), 2);
    }

    #[test]
    fn state_names() {
        assert_eq!(ConnectionState::Disconnected.as_str(), "disconnected");
        assert_eq!(ConnectionState::Connecting.as_str(), "connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
    }
}
