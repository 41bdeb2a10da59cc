//! HTTP + WebSocket Server
//!
//! A single axum router serves the three downstream surfaces:
//!
//! - `GET /ws` - the streaming subscriber protocol (initial snapshot on
//!   connect, updates per tick, subscribe/unsubscribe actions inbound)
//! - `/api/holdings` - the REST ledger surface (list with lazy seeding, buy,
//!   sell)
//! - `/health`, `/healthz`, `/readyz`, `/metrics` - operational endpoints

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::ports::FeedState;
use crate::application::relay::RelayBroker;
use crate::domain::ledger::HoldingRepository;
use crate::infrastructure::config::RelaySettings;

pub mod api;
pub mod error;
pub mod health;
pub mod ws;

pub use error::ApiError;
pub use health::{FeedInfo, HealthResponse, HealthStatus};

// =============================================================================
// Application State
// =============================================================================

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The relay broker.
    pub broker: Arc<RelayBroker>,
    /// The holdings ledger.
    pub ledger: Arc<dyn HoldingRepository>,
    /// Upstream feed connection state.
    pub feed_state: Arc<FeedState>,
    /// Relay channel and ledger settings.
    pub settings: RelaySettings,
    /// Service version.
    pub version: String,
    /// Process start time, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Create server state.
    #[must_use]
    pub fn new(
        broker: Arc<RelayBroker>,
        ledger: Arc<dyn HoldingRepository>,
        feed_state: Arc<FeedState>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            broker,
            ledger,
            feed_state,
            settings,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Create the HTTP router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/holdings", get(api::list_holdings))
        .route("/api/holdings/{symbol}/buy", post(api::buy))
        .route("/api/holdings/{symbol}/sell", post(api::sell))
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::liveness_handler))
        .route("/readyz", get(health::readiness_handler))
        .route("/metrics", get(health::metrics_handler))
        .with_state(state)
}

// =============================================================================
// Server
// =============================================================================

/// The downstream HTTP/WebSocket server.
pub struct RelayServer {
    port: u16,
    state: AppState,
    cancel: CancellationToken,
}

impl RelayServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: AppState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server encounters a
    /// fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "relay server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("relay server stopped");
        Ok(())
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
