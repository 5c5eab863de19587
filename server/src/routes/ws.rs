//! WebSocket handler: lobby and game event relay.
//!
//! DESIGN
//! ======
//! On upgrade, registers a connection and enters a `select!` loop:
//! - Incoming client frames → decode → `services::lobby::dispatch`
//! - Pushes addressed to this connection → encode → socket
//!
//! The lobby service returns pushes and never sends. This layer decodes,
//! applies, and delivers the resulting pushes to each recipient's channel
//! while still holding the registry lock, so every connection observes
//! pushes in the order they were produced.
//!
//! WIRE
//! ====
//! Binary messages carry protobuf frames, text messages carry JSON frames.
//! Each connection is answered in the format it last spoke.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → connection registered (anonymous)
//! 2. Client sends frames → dispatch → pushes delivered
//! 3. Close → implicit leave of an open lobby → remaining members notified
//!    (a seat in a started lobby is kept for `rejoin_game`) → cleanup

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientEvent, CodecError, Frame, ServerEvent};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::{self, ErrorCode, Push};
use crate::state::{AppState, Registry};

/// Per-connection outbound buffer.
const CLIENT_CHANNEL: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wire {
    Binary,
    Text,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(CLIENT_CHANNEL);
    services::lobby::connect(&mut *state.registry.write().await, client_id, client_tx);

    let mut wire = Wire::Binary;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let inbound = match msg {
                    Message::Binary(bytes) => {
                        wire = Wire::Binary;
                        frames::decode_frame(&bytes)
                    }
                    Message::Text(text) => {
                        wire = Wire::Text;
                        frames::decode_json(text.as_str())
                    }
                    Message::Close(_) => break,
                    _ => continue,
                };
                let mut registry = state.registry.write().await;
                let pushes = process_inbound(&mut registry, client_id, inbound);
                deliver(&registry, pushes);
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame, wire).await.is_err() {
                    break;
                }
            }
        }
    }

    let mut registry = state.registry.write().await;
    let pushes = services::lobby::disconnect(&mut registry, client_id);
    deliver(&registry, pushes);
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode and apply one inbound frame, returning every push it produced.
/// Failures become a single `error` push to the sender.
fn process_inbound(registry: &mut Registry, client_id: Uuid, inbound: Result<Frame, CodecError>) -> Vec<Push> {
    let frame = match inbound {
        Ok(frame) => frame,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return vec![Push::new(client_id, ServerEvent::error(format!("invalid frame: {e}")))];
        }
    };

    info!(%client_id, event = %frame.event, "ws: recv frame");

    let event = match ClientEvent::from_frame(&frame) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, event = %frame.event, error = %e, "ws: rejected frame");
            return vec![Push::new(client_id, ServerEvent::error(e.to_string()))];
        }
    };

    match services::lobby::dispatch(registry, client_id, event) {
        Ok(pushes) => pushes,
        Err(e) => {
            warn!(
                %client_id,
                event = %frame.event,
                code = e.error_code(),
                retryable = e.retryable(),
                error = %e,
                "ws: request failed"
            );
            vec![Push::new(client_id, ServerEvent::error(e.to_string()))]
        }
    }
}

/// Queue each push on its recipient's channel. Best-effort: a recipient that
/// is gone or whose channel is full misses the push.
fn deliver(registry: &Registry, pushes: Vec<Push>) {
    for push in pushes {
        let Some(client) = registry.clients.get(&push.to) else {
            continue;
        };
        if client.tx.try_send(push.event.to_frame()).is_err() {
            warn!(client_id = %push.to, event = push.event.name(), "ws: push dropped");
        }
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame, wire: Wire) -> Result<(), axum::Error> {
    if frame.event == "error" {
        let message = frame
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(event = %frame.event, message, "ws: send frame status=Error");
    } else {
        info!(event = %frame.event, ?wire, "ws: send frame");
    }

    let msg = match wire {
        Wire::Binary => Message::Binary(frames::encode_frame(frame).into()),
        Wire::Text => Message::Text(frames::encode_json(frame).into()),
    };
    socket.send(msg).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
