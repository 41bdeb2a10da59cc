//! Upstream Feed Adapter
//!
//! The WebSocket connector for the upstream price feed:
//!
//! - **messages**: wire frame types (trade data, subscribe/unsubscribe
//!   control)
//! - **codec**: JSON encode/decode with malformed-frame tolerance
//! - **transport**: the injectable connection seam and its WebSocket
//!   implementation
//! - **client**: the supervised connect/reconnect loop
//! - **reconnect**: fixed-delay retry policy
//! - **heartbeat**: ping/pong liveness tracking

pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;
pub mod transport;

pub use client::{FeedClient, FeedClientConfig, FeedClientError};
pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use messages::{ControlFrame, FeedFrame, TradeData};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use transport::{FeedConnection, FeedTransport, TransportError, WireFrame, WsTransport};
