//! WebSocket handler: realtime event relay.
//!
//! DESIGN
//! ======
//! On upgrade, the connection gets a fresh connection id and enters a
//! `select!` loop:
//! - Incoming client frames → decode into [`ClientEvent`] → dispatch
//! - Events from room peers → forward to the client
//!
//! Inbound frames are decoded against the closed event set; unknown events
//! and malformed payloads are answered with an `error` frame instead of
//! being ignored. Replies meant only for the sender (presence snapshot,
//! errors) are returned by [`process_inbound_text`]; room fan-out is done by
//! the services.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade with `?token=` → resolve actor
//! 2. `join-project` / `leave-project` / `cursor-move` / `send_message`
//! 3. Close → leave every room this connection joined

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::{Actor, ClientEvent, ServerEvent};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::routes::auth;
use crate::services::{chat, cursor, session};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return (StatusCode::UNAUTHORIZED, "token required").into_response();
    };
    let actor = match auth::resolve_token(&state, &token).await {
        Ok(actor) => actor,
        Err(status) => return (status, "invalid token").into_response(),
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, actor))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, actor: Actor) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for events fanned out by room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.config.client_channel_capacity);

    info!(%connection_id, actor_id = %actor.id, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    WsMessage::Text(text) => {
                        let replies = process_inbound_text(&state, &actor, connection_id, &client_tx, text.as_str()).await;
                        for reply in replies {
                            if send_event(&mut socket, &reply).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    let left = session::disconnect(&state, actor.id, connection_id).await;
    info!(%connection_id, rooms_left = left.len(), "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Decode and handle one inbound text frame. Returns events for the sender.
///
/// Kept free of socket I/O so tests can drive the protocol directly.
async fn process_inbound_text(
    state: &AppState,
    actor: &Actor,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event = match frames::decode_client_event(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: rejected inbound frame");
            return vec![ServerEvent::error_from(&e)];
        }
    };

    if !matches!(event, ClientEvent::CursorMove { .. }) {
        info!(%connection_id, event = event.name(), room_id = %event.room_id(), "ws: recv event");
    }

    match event {
        ClientEvent::JoinProject { room_id } => {
            match session::join(state, room_id, actor, connection_id, client_tx.clone()).await {
                Ok(outcome) => vec![ServerEvent::PresenceSnapshot { room_id, members: outcome.others }],
                Err(e) => {
                    warn!(%connection_id, %room_id, error = %e, "ws: join rejected");
                    vec![ServerEvent::error_in_room(room_id, &e)]
                }
            }
        }
        ClientEvent::LeaveProject { room_id } => {
            session::leave(state, room_id, actor.id, connection_id).await;
            Vec::new()
        }
        ClientEvent::CursorMove { room_id, position, element_id } => {
            cursor::broadcast_cursor(state, room_id, actor.id, position, element_id).await;
            Vec::new()
        }
        ClientEvent::SendMessage { room_id, text, sender_id, client_ref } => {
            if sender_id.is_some_and(|claimed| claimed != actor.id) {
                warn!(%connection_id, actor_id = %actor.id, "ws: send_message senderId mismatch; using authenticated actor");
            }
            match chat::send_message(state, room_id, actor, &text, client_ref).await {
                Ok(_) => Vec::new(),
                Err(e) => vec![ServerEvent::error_in_room(room_id, &e)],
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let text = match frames::encode_event(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, event = event.name(), "ws: failed to encode event");
            return Ok(());
        }
    };
    socket.send(WsMessage::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
