//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations behind the application
//! layer's channel contracts and ports.

/// Configuration loading.
pub mod config;

/// Upstream feed WebSocket adapter.
pub mod feed;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Ledger store adapters.
pub mod persistence;

/// Downstream HTTP + WebSocket server.
pub mod server;

/// OpenTelemetry tracing integration.
pub mod telemetry;
