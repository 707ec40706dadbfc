//! Cursor service: ephemeral pointer broadcast.
//!
//! DESIGN
//! ======
//! Cursor samples are fire-and-forget: relayed to room peers and immediately
//! forgotten. No persistence, no ordering, no acknowledgement. Samples from
//! actors not present in the room are dropped silently, and nothing is
//! logged per sample since the stream runs at pointer rate.

use frames::{Position, ServerEvent};
use uuid::Uuid;

use crate::services::session;
use crate::state::AppState;

/// Relay a cursor sample to every room member except the sender.
/// Returns `false` when the sender is not in the room and nothing was sent.
pub async fn broadcast_cursor(
    state: &AppState,
    room_id: Uuid,
    actor_id: Uuid,
    position: Position,
    element_id: Option<String>,
) -> bool {
    if !session::is_member(state, room_id, actor_id).await {
        return false;
    }
    let event = ServerEvent::RemoteCursorMove { room_id, actor_id, position, element_id };
    session::broadcast(state, room_id, &event, Some(actor_id)).await;
    true
}
