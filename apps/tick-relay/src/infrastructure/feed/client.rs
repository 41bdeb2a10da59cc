//! Feed Client
//!
//! Owns the single upstream connection and its lifecycle:
//!
//! - `Disconnected → Connecting → Connected → Disconnected → …`, retrying
//!   forever on a fixed delay; there is no terminal state short of process
//!   shutdown.
//! - On every successful connect, replays a subscribe frame for each symbol
//!   in the subscribed-symbol set (resubscription after reconnect).
//! - Applies [`FeedCommand`]s from the relay, sending a control frame only
//!   when the set actually changes.
//! - Decodes inbound frames and emits [`FeedEvent::Tick`]s in wire order;
//!   malformed frames are logged and skipped without disturbing the stream.
//! - Monitors liveness with ping/pong; heartbeat timeout counts as a
//!   disconnect.
//!
//! The loop owns the subscribed-symbol set and the connection exclusively,
//! so a retry can never race an established connection into a double
//! connect.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ConnectionState, FeedCommand, FeedEvent};
use crate::domain::subscription::Symbol;
use crate::infrastructure::feed::codec::JsonCodec;
use crate::infrastructure::feed::heartbeat::{Heartbeat, HeartbeatConfig};
use crate::infrastructure::feed::messages::{ControlFrame, FeedFrame};
use crate::infrastructure::feed::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::infrastructure::feed::transport::{
    FeedConnection, FeedTransport, TransportError, WireFrame,
};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Codec failure while encoding a control frame.
    #[error("codec error: {0}")]
    Codec(#[from] crate::infrastructure::feed::codec::CodecError),

    /// The upstream closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// No frame arrived within the heartbeat window.
    #[error("heartbeat timeout")]
    HeartbeatTimeout,

    /// The relay side dropped the event channel.
    #[error("event channel closed")]
    EventChannelClosed,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the feed client.
#[derive(Debug, Clone, Default)]
pub struct FeedClientConfig {
    /// Reconnection policy configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
}

// =============================================================================
// Feed Client
// =============================================================================

/// Upstream feed connector over an injectable transport.
pub struct FeedClient<T: FeedTransport> {
    transport: T,
    config: FeedClientConfig,
    codec: JsonCodec,
    event_tx: mpsc::Sender<FeedEvent>,
    command_rx: mpsc::Receiver<FeedCommand>,
    cancel: CancellationToken,
    subscriptions: HashSet<Symbol>,
    state: ConnectionState,
}

impl<T: FeedTransport> FeedClient<T> {
    /// Create a new feed client.
    #[must_use]
    pub fn new(
        transport: T,
        config: FeedClientConfig,
        event_tx: mpsc::Sender<FeedEvent>,
        command_rx: mpsc::Receiver<FeedCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            config,
            codec: JsonCodec::new(),
            event_tx,
            command_rx,
            cancel,
            subscriptions: HashSet::new(),
            state: ConnectionState::Disconnected,
        }
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run the connection loop until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error only if the relay side disappears
    /// (`EventChannelClosed`); connection failures are retried forever.
    pub async fn run(mut self) -> Result<(), FeedClientError> {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("feed client cancelled");
                return Ok(());
            }

            self.state = ConnectionState::Connecting;

            match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    tracing::info!("feed client stopped");
                    return Ok(());
                }
                Err(e @ FeedClientError::EventChannelClosed) => {
                    return Err(e);
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    tracing::warn!(error = %e, "feed connection lost");

                    let _ = self.event_tx.send(FeedEvent::Disconnected).await;

                    let delay = policy.next_delay();
                    let attempt = policy.attempt_count();
                    tracing::info!(attempt, delay_ms = delay.as_millis(), "reconnecting to feed");

                    let _ = self.event_tx.send(FeedEvent::Reconnecting { attempt }).await;

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("feed client cancelled during reconnect delay");
                            return Ok(());
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Connect and process frames until an error or cancellation.
    async fn connect_and_run(
        &mut self,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), FeedClientError> {
        tracing::info!("connecting to feed");

        let mut conn = self.transport.connect().await?;

        self.state = ConnectionState::Connected;
        policy.reset();
        tracing::info!(subscriptions = self.subscriptions.len(), "feed connected");

        let _ = self.event_tx.send(FeedEvent::Connected).await;

        // Replay the subscribed-symbol set. Resubscription is idempotent
        // upstream, so no dedup against whatever the feed still holds.
        for symbol in self.subscriptions.clone() {
            self.send_control(&mut conn, &ControlFrame::subscribe(symbol))
                .await?;
        }
        metrics::set_upstream_subscriptions(self.subscriptions.len());

        let mut heartbeat = Heartbeat::new(self.config.heartbeat.clone());
        let interval = heartbeat.ping_interval();
        let mut ping_timer =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = conn.send(WireFrame::Close).await;
                    return Ok(());
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.apply_command(&mut conn, command).await?,
                        // The relay is gone; nothing left to feed.
                        None => return Ok(()),
                    }
                }
                _ = ping_timer.tick() => {
                    if heartbeat.is_timed_out() {
                        return Err(FeedClientError::HeartbeatTimeout);
                    }
                    conn.send(WireFrame::Ping(Vec::new())).await?;
                }
                frame = conn.recv() => {
                    match frame {
                        Some(Ok(WireFrame::Text(text))) => {
                            heartbeat.record_activity();
                            self.handle_text(&text).await?;
                        }
                        Some(Ok(WireFrame::Ping(payload))) => {
                            heartbeat.record_activity();
                            conn.send(WireFrame::Pong(payload)).await?;
                        }
                        Some(Ok(WireFrame::Pong(_))) => {
                            heartbeat.record_activity();
                        }
                        Some(Ok(WireFrame::Close)) | None => {
                            return Err(FeedClientError::ConnectionClosed);
                        }
                        Some(Err(e)) => return Err(e.into()),
                    }
                }
            }
        }
    }

    /// Apply a subscription command, touching the wire only when the
    /// subscribed-symbol set actually changes.
    async fn apply_command(
        &mut self,
        conn: &mut T::Conn,
        command: FeedCommand,
    ) -> Result<(), FeedClientError> {
        match command {
            FeedCommand::Subscribe(symbol) => {
                if self.subscriptions.insert(symbol.clone()) {
                    self.send_control(conn, &ControlFrame::subscribe(symbol))
                        .await?;
                }
            }
            FeedCommand::Unsubscribe(symbol) => {
                if self.subscriptions.remove(&symbol) {
                    self.send_control(conn, &ControlFrame::unsubscribe(symbol))
                        .await?;
                }
            }
        }
        metrics::set_upstream_subscriptions(self.subscriptions.len());
        Ok(())
    }

    /// Decode a text frame and emit its ticks.
    async fn handle_text(&self, text: &str) -> Result<(), FeedClientError> {
        match self.codec.decode(text) {
            Ok(FeedFrame::Trade { data }) => {
                for trade in data {
                    if self
                        .event_tx
                        .send(FeedEvent::Tick(trade.into()))
                        .await
                        .is_err()
                    {
                        return Err(FeedClientError::EventChannelClosed);
                    }
                }
            }
            Ok(FeedFrame::Other) => {
                tracing::trace!("ignoring non-trade frame");
            }
            Err(e) => {
                metrics::record_decode_error();
                tracing::warn!(error = %e, "malformed feed frame");
            }
        }
        Ok(())
    }

    /// Serialize and send a control frame.
    async fn send_control(
        &self,
        conn: &mut T::Conn,
        frame: &ControlFrame,
    ) -> Result<(), FeedClientError> {
        let text = self.codec.encode(frame)?;
        tracing::debug!(frame = %text, "sending control frame");
        conn.send(WireFrame::Text(text)).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
