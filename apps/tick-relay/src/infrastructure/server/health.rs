//! Health and Metrics Endpoints
//!
//! Operational endpoints for orchestrators and monitoring:
//!
//! - `GET /health` - JSON health status
//! - `GET /healthz` - liveness probe (simple OK)
//! - `GET /readyz` - readiness probe (ready when the feed is connected)
//! - `GET /metrics` - Prometheus metrics in text format

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::server::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream feed status.
    pub feed: FeedInfo,
    /// Connected downstream subscribers.
    pub subscribers: usize,
    /// Symbols with at least one interested subscriber.
    pub upstream_symbols: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The upstream feed is connected.
    Healthy,
    /// The upstream feed is down (reconnecting).
    Unhealthy,
}

/// Upstream feed status.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// Connection state name.
    pub state: String,
    /// Whether the feed is connected.
    pub connected: bool,
    /// Ticks received since start.
    pub ticks_received: u64,
    /// Reconnect attempts since the last successful connect.
    pub reconnect_attempts: u32,
    /// Time of the most recent successful connect.
    pub last_connected_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

/// `GET /healthz`
pub async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `GET /readyz`
pub async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.feed_state.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let feed_state = &state.feed_state;
    let connected = feed_state.is_connected();
    let book_stats = state.broker.book().stats();

    HealthResponse {
        status: if connected {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed: FeedInfo {
            state: feed_state.state().as_str().to_string(),
            connected,
            ticks_received: feed_state.ticks_received(),
            reconnect_attempts: feed_state.reconnect_attempts(),
            last_connected_at: feed_state.last_connected_at(),
        },
        subscribers: state.broker.registry().len(),
        upstream_symbols: book_stats.symbol_count,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }
}
