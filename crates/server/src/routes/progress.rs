// crates/server/src/routes/progress.rs
//! Progress WebSocket.
//!
//! `GET /ws/progress` upgrades to a WebSocket that receives every progress
//! event as a `{"progress": n}` text frame. Client messages are ignored
//! apart from Ping and Close.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};

use crate::hub::ProgressHub;
use crate::state::AppState;

/// Interval of protocol-level Ping frames sent to every subscriber.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/progress", get(ws_progress_handler))
}

/// Registration happens inside the upgrade callback, so a client that drops
/// during the handshake never occupies a slot.
async fn ws_progress_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_progress_ws(socket, hub))
}

async fn handle_progress_ws(mut socket: WebSocket, hub: Arc<ProgressHub>) {
    // Dropping the handle (on any return path) unregisters it from the hub.
    let mut subscriber = match hub.connect() {
        Ok(subscriber) => subscriber,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting progress WebSocket");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::AGAIN,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };
    let subscriber_id = subscriber.id();
    tracing::info!(subscriber_id, "Progress WebSocket connected");

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // Skip the first immediate tick
    heartbeat.tick().await;

    loop {
        tokio::select! {
            event = subscriber.recv() => {
                let Some(event) = event else {
                    break;
                };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(subscriber_id, error = %e, "Failed to encode progress event");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    tracing::debug!(subscriber_id, "Client disconnected during progress send");
                    break;
                }
            }

            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = socket.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(subscriber_id, "Progress WebSocket disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(subscriber_id, error = %e, "WebSocket receive error");
                        break;
                    }
                    _ => {}
                }
            }

            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    tracing::debug!(subscriber_id, "Client disconnected during heartbeat ping");
                    break;
                }
            }
        }
    }
}
