//! Connection Heartbeat
//!
//! Tracks upstream connection liveness through periodic pings. Any inbound
//! frame counts as activity; a connection that stays silent past the ping
//! interval plus the pong timeout is considered dead, which the connector
//! treats like any other transport-level disconnect.

use std::time::{Duration, Instant};

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between ping frames.
    pub ping_interval: Duration,
    /// Grace period after the ping interval before the connection is
    /// considered dead.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(20),
        }
    }
}

impl HeartbeatConfig {
    /// Create a configuration with custom intervals.
    #[must_use]
    pub const fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
        }
    }
}

/// Liveness tracker for one connection.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    last_activity: Instant,
}

impl Heartbeat {
    /// Create a tracker for a freshly opened connection.
    #[must_use]
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_activity: Instant::now(),
        }
    }

    /// Record an inbound frame (data, ping, or pong).
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether the connection has been silent longer than the allowed window.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.last_activity.elapsed() > self.config.ping_interval + self.config.pong_timeout
    }

    /// The configured ping interval.
    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        self.config.ping_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intervals() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(20));
        assert_eq!(config.pong_timeout, Duration::from_secs(20));
    }

    #[test]
    fn fresh_connection_is_alive() {
        let heartbeat = Heartbeat::new(HeartbeatConfig::default());
        assert!(!heartbeat.is_timed_out());
    }

    #[test]
    fn silence_past_the_window_times_out() {
        let heartbeat = Heartbeat::new(HeartbeatConfig::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
        ));

        std::thread::sleep(Duration::from_millis(10));

        assert!(heartbeat.is_timed_out());
    }

    #[test]
    fn activity_resets_the_window() {
        let mut heartbeat = Heartbeat::new(HeartbeatConfig::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
        ));

        std::thread::sleep(Duration::from_millis(10));
        heartbeat.record_activity();

        assert!(!heartbeat.is_timed_out());
    }
}
