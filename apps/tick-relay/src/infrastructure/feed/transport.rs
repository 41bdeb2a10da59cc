//! Feed Transport
//!
//! The seam between the connector's state machine and the network. The
//! connector only ever talks to a [`FeedTransport`], so its connect /
//! resubscribe / reconnect behavior is testable against an in-process fake;
//! production wires in the WebSocket transport below.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

// =============================================================================
// Error Type
// =============================================================================

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Establishing the connection failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// WebSocket error on an established connection.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

// =============================================================================
// Frames
// =============================================================================

/// A transport frame, codec-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// A text payload.
    Text(String),
    /// A ping with payload.
    Ping(Vec<u8>),
    /// A pong with payload.
    Pong(Vec<u8>),
    /// Close handshake.
    Close,
}

// =============================================================================
// Ports
// =============================================================================

/// An established feed connection.
#[async_trait]
pub trait FeedConnection: Send {
    /// Send a frame.
    async fn send(&mut self, frame: WireFrame) -> Result<(), TransportError>;

    /// Receive the next frame. `None` means the stream ended.
    async fn recv(&mut self) -> Option<Result<WireFrame, TransportError>>;
}

/// Connection factory for the upstream feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// The connection type this transport produces.
    type Conn: FeedConnection;

    /// Establish a new connection.
    async fn connect(&self) -> Result<Self::Conn, TransportError>;
}

// =============================================================================
// WebSocket Transport
// =============================================================================

/// Production transport: a WebSocket client connection.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Create a transport connecting to `url`.
    #[must_use]
    pub const fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl FeedTransport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&self) -> Result<Self::Conn, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(&self.url).await?;
        Ok(WsConnection { inner: stream })
    }
}

/// An established WebSocket connection.
pub struct WsConnection {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn send(&mut self, frame: WireFrame) -> Result<(), TransportError> {
        let message = match frame {
            WireFrame::Text(text) => Message::Text(text.into()),
            WireFrame::Ping(payload) => Message::Ping(payload.into()),
            WireFrame::Pong(payload) => Message::Pong(payload.into()),
            WireFrame::Close => Message::Close(None),
        };
        Ok(self.inner.send(message).await?)
    }

    async fn recv(&mut self) -> Option<Result<WireFrame, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(WireFrame::Text(text.to_string()))),
                Ok(Message::Ping(payload)) => return Some(Ok(WireFrame::Ping(payload.to_vec()))),
                Ok(Message::Pong(payload)) => return Some(Ok(WireFrame::Pong(payload.to_vec()))),
                Ok(Message::Close(_)) => return Some(Ok(WireFrame::Close)),
                // Binary and raw frames are not part of the feed protocol.
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
