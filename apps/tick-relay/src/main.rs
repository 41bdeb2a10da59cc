//! Tick Relay Binary
//!
//! Starts the live price relay.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tick-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FEED_URL`: Upstream feed WebSocket URL
//!
//! ## Optional
//! - `FEED_TOKEN`: Upstream auth token (appended as a query parameter)
//! - `RELAY_HTTP_PORT`: HTTP/WebSocket server port (default: 8080)
//! - `RELAY_RECONNECT_DELAY_SECS`: Fixed reconnect delay (default: 5)
//! - `RELAY_HEARTBEAT_INTERVAL_SECS`: Ping interval (default: 20)
//! - `RELAY_HEARTBEAT_TIMEOUT_SECS`: Pong grace period (default: 20)
//! - `RELAY_SUBSCRIBER_QUEUE_CAPACITY`: Per-subscriber queue bound (default: 256)
//! - `RELAY_FEED_EVENT_CAPACITY`: Feed event channel bound (default: 1024)
//! - `RELAY_MIN_TRACKED_HOLDINGS`: Lazy-seed threshold (default: 5)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: tick-relay)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use tick_relay::application::ports::{ConnectionState, FeedCommand, FeedEvent, FeedState};
use tick_relay::application::relay::RelayBroker;
use tick_relay::domain::ledger::HoldingRepository;
use tick_relay::infrastructure::feed::{
    FeedClient, FeedClientConfig, HeartbeatConfig, ReconnectConfig, WsTransport,
};
use tick_relay::infrastructure::metrics;
use tick_relay::infrastructure::persistence::InMemoryHoldingRepository;
use tick_relay::infrastructure::server::{AppState, RelayServer};
use tick_relay::infrastructure::telemetry;
use tick_relay::{RelayConfig, init_metrics};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting tick relay");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = RelayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Ledger store
    let ledger: Arc<dyn HoldingRepository> = Arc::new(InMemoryHoldingRepository::new());

    // Channels between the relay and the feed connector
    let (feed_command_tx, feed_command_rx) = mpsc::channel::<FeedCommand>(256);
    let (feed_event_tx, feed_event_rx) =
        mpsc::channel::<FeedEvent>(config.relay.feed_event_capacity);

    // Relay broker and feed state
    let broker = Arc::new(RelayBroker::new(feed_command_tx, Arc::clone(&ledger)));
    let feed_state = Arc::new(FeedState::new());

    // Upstream feed client
    let feed_client_config = FeedClientConfig {
        reconnect: ReconnectConfig::new(config.websocket.reconnect_delay),
        heartbeat: HeartbeatConfig::new(
            config.websocket.heartbeat_interval,
            config.websocket.heartbeat_timeout,
        ),
    };
    let transport = WsTransport::new(config.feed.connect_url());
    let feed_client = FeedClient::new(
        transport,
        feed_client_config,
        feed_event_tx,
        feed_command_rx,
        shutdown_token.clone(),
    );

    // Spawn feed event handler
    let event_broker = Arc::clone(&broker);
    let event_feed_state = Arc::clone(&feed_state);
    tokio::spawn(async move {
        handle_feed_events(feed_event_rx, event_broker, event_feed_state).await;
    });

    // Spawn feed client
    tokio::spawn(async move {
        if let Err(e) = feed_client.run().await {
            tracing::error!(error = %e, "feed client error");
        }
    });

    // Spawn HTTP/WebSocket server
    let app_state = AppState::new(
        Arc::clone(&broker),
        Arc::clone(&ledger),
        Arc::clone(&feed_state),
        config.relay.clone(),
    );
    let server = RelayServer::new(
        config.server.http_port,
        app_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "relay server error");
        }
    });

    tracing::info!("Tick relay ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Tick relay stopped");
    Ok(())
}

/// Handle events from the feed client.
///
/// This is the single consumer of the ordered event channel, so ticks for a
/// symbol are applied to the cache in arrival order.
async fn handle_feed_events(
    mut rx: mpsc::Receiver<FeedEvent>,
    broker: Arc<RelayBroker>,
    feed_state: Arc<FeedState>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            FeedEvent::Connected => {
                feed_state.set_state(ConnectionState::Connected);
                metrics::set_feed_connected(true);
                tracing::info!("feed connected");
            }
            FeedEvent::Disconnected => {
                feed_state.set_state(ConnectionState::Disconnected);
                metrics::set_feed_connected(false);
                tracing::warn!("feed disconnected");
            }
            FeedEvent::Reconnecting { attempt } => {
                feed_state.set_state(ConnectionState::Connecting);
                feed_state.increment_reconnect_attempts();
                metrics::record_reconnect();
                tracing::info!(attempt, "feed reconnecting");
            }
            FeedEvent::Tick(tick) => {
                feed_state.increment_ticks();
                metrics::record_tick_received();

                let outcome = broker.handle_tick(tick).await;
                metrics::record_broadcast(outcome.delivered as u64);
                if !outcome.dropped.is_empty() {
                    metrics::record_subscribers_dropped(outcome.dropped.len() as u64);
                }
            }
        }
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        reconnect_delay_secs = config.websocket.reconnect_delay.as_secs(),
        min_tracked_holdings = config.relay.min_tracked_holdings,
        "Configuration loaded"
    );
    tracing::debug!(feed_url = %config.feed.url, "Upstream feed endpoint");
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
