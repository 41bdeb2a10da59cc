//! Relay Configuration Settings
//!
//! Configuration types for the relay service, loaded from environment
//! variables.

use std::time::Duration;

/// Upstream feed settings.
#[derive(Clone)]
pub struct FeedSettings {
    /// WebSocket URL of the upstream feed.
    pub url: String,
    /// Optional auth token, appended as a query parameter.
    pub token: Option<String>,
}

impl FeedSettings {
    /// The connection URL with the token applied, if configured.
    #[must_use]
    pub fn connect_url(&self) -> String {
        self.token.as_ref().map_or_else(
            || self.url.clone(),
            |token| format!("{}?token={token}", self.url),
        )
    }
}

impl std::fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSettings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// WebSocket connection settings for the upstream feed.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Heartbeat timeout before the connection is considered dead.
    pub heartbeat_timeout: Duration,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(20),
            heartbeat_timeout: Duration::from_secs(20),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Relay channel and ledger settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Bound of each subscriber's outbound queue.
    pub subscriber_queue_capacity: usize,
    /// Bound of the feed event channel.
    pub feed_event_capacity: usize,
    /// Ledger size below which the default instrument set is seeded.
    pub min_tracked_holdings: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 256,
            feed_event_capacity: 1024,
            min_tracked_holdings: 5,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP/WebSocket server port.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upstream feed settings.
    pub feed: FeedSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Upstream WebSocket settings.
    pub websocket: WebSocketSettings,
    /// Relay channel and ledger settings.
    pub relay: RelaySettings,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FEED_URL` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("FEED_URL")
            .map_err(|_| ConfigError::MissingEnvVar("FEED_URL".to_string()))?;

        if url.is_empty() {
            return Err(ConfigError::EmptyValue("FEED_URL".to_string()));
        }

        let token = std::env::var("FEED_TOKEN").ok().filter(|t| !t.is_empty());

        let server = ServerSettings {
            http_port: parse_env_u16("RELAY_HTTP_PORT", ServerSettings::default().http_port),
        };

        let websocket = WebSocketSettings {
            heartbeat_interval: parse_env_duration_secs(
                "RELAY_HEARTBEAT_INTERVAL_SECS",
                WebSocketSettings::default().heartbeat_interval,
            ),
            heartbeat_timeout: parse_env_duration_secs(
                "RELAY_HEARTBEAT_TIMEOUT_SECS",
                WebSocketSettings::default().heartbeat_timeout,
            ),
            reconnect_delay: parse_env_duration_secs(
                "RELAY_RECONNECT_DELAY_SECS",
                WebSocketSettings::default().reconnect_delay,
            ),
        };

        let relay = RelaySettings {
            subscriber_queue_capacity: parse_env_usize(
                "RELAY_SUBSCRIBER_QUEUE_CAPACITY",
                RelaySettings::default().subscriber_queue_capacity,
            ),
            feed_event_capacity: parse_env_usize(
                "RELAY_FEED_EVENT_CAPACITY",
                RelaySettings::default().feed_event_capacity,
            ),
            min_tracked_holdings: parse_env_usize(
                "RELAY_MIN_TRACKED_HOLDINGS",
                RelaySettings::default().min_tracked_holdings,
            ),
        };

        Ok(Self {
            feed: FeedSettings { url, token },
            server,
            websocket,
            relay,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_url_without_token() {
        let settings = FeedSettings {
            url: "wss://feed.example.com/ws".to_string(),
            token: None,
        };
        assert_eq!(settings.connect_url(), "wss://feed.example.com/ws");
    }

    #[test]
    fn connect_url_appends_token() {
        let settings = FeedSettings {
            url: "wss://feed.example.com/ws".to_string(),
            token: Some("secret123".to_string()),
        };
        assert_eq!(
            settings.connect_url(),
            "wss://feed.example.com/ws?token=secret123"
        );
    }

    #[test]
    fn token_redacted_in_debug() {
        let settings = FeedSettings {
            url: "wss://feed.example.com/ws".to_string(),
            token: Some("secret123".to_string()),
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("secret123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn websocket_settings_defaults() {
        let settings = WebSocketSettings::default();
        assert_eq!(settings.heartbeat_interval, Duration::from_secs(20));
        assert_eq!(settings.heartbeat_timeout, Duration::from_secs(20));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn relay_settings_defaults() {
        let settings = RelaySettings::default();
        assert_eq!(settings.subscriber_queue_capacity, 256);
        assert_eq!(settings.feed_event_capacity, 1024);
        assert_eq!(settings.min_tracked_holdings, 5);
    }

    #[test]
    fn server_settings_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.http_port, 8080);
    }
}
