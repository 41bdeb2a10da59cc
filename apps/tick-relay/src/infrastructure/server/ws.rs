//! Downstream WebSocket Handler
//!
//! One socket per subscriber. On upgrade the client receives the initial
//! snapshot, then relayed updates through its bounded outbound queue; inbound
//! text frames carry subscribe/unsubscribe actions. Malformed client messages
//! are logged and ignored. Disconnect (or a failed send) releases all of the
//! subscriber's upstream interest.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::application::relay::{ClientRequest, ServerMessage};
use crate::domain::subscription::SubscriberId;
use crate::infrastructure::metrics;
use crate::infrastructure::server::AppState;

/// `GET /ws` - upgrade to the streaming subscriber protocol.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let subscriber: SubscriberId = uuid::Uuid::new_v4().as_u64_pair().0;
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Snapshot before registration: a client can never observe an update
    // ahead of its initial state.
    let snapshot = match state.broker.snapshot().await {
        Ok(data) => ServerMessage::initial(data),
        Err(e) => {
            tracing::error!(subscriber, error = %e, "snapshot failed, refusing subscriber");
            return;
        }
    };
    if send_message(&mut ws_tx, &snapshot).await.is_err() {
        return;
    }

    let (out_tx, mut out_rx) = mpsc::channel(state.settings.subscriber_queue_capacity);
    state.broker.register_subscriber(subscriber, out_tx);
    metrics::set_subscribers(state.broker.registry().len());
    tracing::info!(subscriber, "subscriber connected");

    let send_task = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if send_message(&mut ws_tx, &message).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => handle_client_text(&state, subscriber, &text).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.broker.handle_subscriber_disconnect(subscriber).await;
    metrics::set_subscribers(state.broker.registry().len());
    send_task.abort();
    tracing::info!(subscriber, "subscriber disconnected");
}

async fn handle_client_text(state: &AppState, subscriber: SubscriberId, text: &str) {
    match serde_json::from_str::<ClientRequest>(text) {
        Ok(ClientRequest::Subscribe { symbol }) => {
            tracing::debug!(subscriber, symbol = %symbol, "subscribe intent");
            state
                .broker
                .handle_subscribe_intent(subscriber, &symbol)
                .await;
        }
        Ok(ClientRequest::Unsubscribe { symbol }) => {
            tracing::debug!(subscriber, symbol = %symbol, "unsubscribe intent");
            state
                .broker
                .handle_unsubscribe_intent(subscriber, &symbol)
                .await;
        }
        Err(e) => {
            tracing::debug!(subscriber, error = %e, "ignoring malformed client message");
        }
    }
}

async fn send_message<S>(ws_tx: &mut S, message: &ServerMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let Ok(text) = serde_json::to_string(message) else {
        return Err(());
    };
    ws_tx.send(Message::Text(text.into())).await.map_err(|_| ())
}
