#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Tick Relay - Live Price Fan-Out
//!
//! Relays live price ticks from a single upstream streaming feed to many
//! downstream WebSocket subscribers, with per-symbol subscription
//! multiplexing and a small tracked-instrument ledger behind a REST surface.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core relay state with no I/O
//!   - `pricing`: ticks and the last-write-wins price cache
//!   - `subscription`: per-symbol subscriber reference counting
//!   - `ledger`: tracked holdings and the repository port
//!
//! - **Application**: Coordination and channel contracts
//!   - `relay`: the relay broker and subscriber registry
//!   - `ports`: the feed command/event channel contract
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: WebSocket connector for the upstream feed
//!   - `server`: axum HTTP + WebSocket server for downstream clients
//!   - `persistence`: ledger store adapters
//!   - `config`, `metrics`, `telemetry`: ambient concerns
//!
//! # Data Flow
//!
//! ```text
//!                     ┌─────────────┐     ┌──────────────┐──► Client 1
//! Upstream feed WS ──►│ Feed Client │────►│ Relay Broker │──► Client 2
//!                     └─────────────┘     └──────────────┘──► Client N
//!                            ▲                   │  ▲
//!                            └── subscribe/──────┘  │
//!                                unsubscribe     REST + ledger
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core relay state with no I/O dependencies.
pub mod domain;

/// Application layer - Relay coordination and channel contracts.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::ledger::{Holding, HoldingRepository, LedgerError};
pub use domain::pricing::{PriceCache, Tick};
pub use domain::subscription::{BookStats, SubscriberId, SubscriptionBook, Symbol};

// Application types
pub use application::ports::{ConnectionState, FeedCommand, FeedEvent, FeedState};
pub use application::relay::{
    ClientRequest, HoldingSnapshot, LEDGER_SUBSCRIBER_ID, PriceUpdate, RelayBroker, ServerMessage,
    SubscriberRegistry,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, FeedSettings, RelayConfig, RelaySettings, ServerSettings, WebSocketSettings,
};

// Feed client (for integration tests)
pub use infrastructure::feed::{
    ControlFrame, FeedClient, FeedClientConfig, FeedClientError, FeedConnection, FeedFrame,
    FeedTransport, HeartbeatConfig, ReconnectConfig, TransportError, WireFrame,
};

// Server (for integration tests)
pub use infrastructure::server::{AppState, RelayServer, ServerError, router};

// Persistence
pub use infrastructure::persistence::InMemoryHoldingRepository;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
