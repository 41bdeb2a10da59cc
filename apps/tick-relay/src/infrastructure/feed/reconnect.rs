//! Reconnection Policy
//!
//! Fixed-delay retry for the upstream feed connection. The feed contract
//! calls for a flat delay with unlimited attempts: the connector retries
//! forever until process shutdown.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Fixed delay between reconnection attempts.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectConfig {
    /// Create a configuration with a custom delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

/// Fixed-delay reconnection policy.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tick_relay::infrastructure::feed::reconnect::{ReconnectConfig, ReconnectPolicy};
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// assert_eq!(policy.next_delay(), Duration::from_secs(5));
/// assert_eq!(policy.attempt_count(), 1);
///
/// // After a successful connection.
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Delay before the next attempt. Always the configured flat delay;
    /// attempts are never exhausted.
    pub const fn next_delay(&mut self) -> Duration {
        self.attempt_count += 1;
        self.config.delay
    }

    /// Reset the attempt count after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Attempts since the last successful connection.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delay_is_five_seconds() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(5));
    }

    #[test]
    fn delay_stays_flat() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::new(Duration::from_millis(100)));

        assert_eq!(policy.next_delay(), Duration::from_millis(100));
        assert_eq!(policy.next_delay(), Duration::from_millis(100));
        assert_eq!(policy.next_delay(), Duration::from_millis(100));
        assert_eq!(policy.attempt_count(), 3);
    }

    #[test]
    fn reset_clears_attempt_count() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());

        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.attempt_count(), 2);

        policy.reset();
        assert_eq!(policy.attempt_count(), 0);
    }

    #[test]
    fn attempts_are_never_exhausted() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::new(Duration::from_millis(1)));

        for _ in 0..10_000 {
            assert_eq!(policy.next_delay(), Duration::from_millis(1));
        }
    }
}
