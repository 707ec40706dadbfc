//! Session registry: which actors are present in which project rooms.
//!
//! DESIGN
//! ======
//! A room is keyed by project id and holds at most one entry per actor. A
//! repeated join by the same actor replaces the entry instead of appending,
//! and only the first join is announced. Each entry remembers the connection
//! that registered it, so a stale connection closing cannot evict the actor's
//! newer session.
//!
//! Fan-out uses `try_send` on bounded per-connection channels: a slow client
//! misses events rather than stalling the room. Presence colors are a pure
//! function of the actor id.

use frames::{Actor, PresenceMember, ServerEvent};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{AppState, RoomMember, RoomState};
use crate::store::StorageError;

const PALETTE: &[&str] = &[
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#469990", "#9a6324", "#800000",
    "#808000", "#000075",
];

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("not allowed to join project {0}")]
    Forbidden(Uuid),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl frames::ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Storage(e) => frames::ErrorCode::error_code(e),
        }
    }
}

/// Result of a join.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Everyone else present in the room.
    pub others: Vec<PresenceMember>,
    /// `false` when the actor was already present and the entry was replaced.
    pub newly_joined: bool,
}

/// Presence color for an actor. Same id, same color, on every server.
#[must_use]
pub fn actor_color(actor_id: Uuid) -> String {
    let digest = Sha256::digest(actor_id.as_bytes());
    PALETTE[usize::from(digest[0]) % PALETTE.len()].to_owned()
}

fn presence_of(actor_id: Uuid, member: &RoomMember) -> PresenceMember {
    PresenceMember { actor_id, display_name: member.display_name.clone(), color: member.color.clone() }
}

/// Deliver an event to every member of a room except `exclude`.
fn fan_out(room_id: Uuid, room: &RoomState, event: &ServerEvent, exclude: Option<Uuid>) {
    for (actor_id, member) in &room.members {
        if exclude == Some(*actor_id) {
            continue;
        }
        match member.tx.try_send(event.clone()) {
            Ok(()) => {}
            // Cursor samples are lossy by contract.
            Err(TrySendError::Full(_)) if event.is_cursor() => {}
            Err(TrySendError::Full(_)) => {
                warn!(%room_id, %actor_id, event = event.name(), "client channel full; event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%room_id, %actor_id, "client channel closed");
            }
        }
    }
}

/// Broadcast an event to a room, optionally excluding one actor.
pub async fn broadcast(state: &AppState, room_id: Uuid, event: &ServerEvent, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    if let Some(room) = rooms.get(&room_id) {
        fan_out(room_id, room, event, exclude);
    }
}

/// Register an actor's connection in a room and announce it to the others.
///
/// # Errors
///
/// Returns [`RoomError::Forbidden`] if the membership authority denies the
/// actor access to the project.
pub async fn join(
    state: &AppState,
    room_id: Uuid,
    actor: &Actor,
    connection_id: Uuid,
    tx: mpsc::Sender<ServerEvent>,
) -> Result<JoinOutcome, RoomError> {
    if !state.storage.can_access(room_id, actor.id).await? {
        return Err(RoomError::Forbidden(room_id));
    }

    let color = actor_color(actor.id);
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(room_id).or_default();
    let previous = room.members.insert(
        actor.id,
        RoomMember { connection_id, display_name: actor.display_name.clone(), color: color.clone(), tx },
    );
    let newly_joined = previous.is_none();

    if newly_joined {
        let event = ServerEvent::UserJoined {
            room_id,
            actor_id: actor.id,
            display_name: actor.display_name.clone(),
            color,
        };
        fan_out(room_id, room, &event, Some(actor.id));
    }

    let others = room
        .members
        .iter()
        .filter(|(id, _)| **id != actor.id)
        .map(|(id, m)| presence_of(*id, m))
        .collect();

    info!(%room_id, actor_id = %actor.id, %connection_id, newly_joined, members = room.members.len(), "actor joined room");
    Ok(JoinOutcome { others, newly_joined })
}

fn remove_member(rooms: &mut std::collections::HashMap<Uuid, RoomState>, room_id: Uuid, actor_id: Uuid) {
    let Some(room) = rooms.get_mut(&room_id) else {
        return;
    };
    room.members.remove(&actor_id);
    fan_out(room_id, room, &ServerEvent::UserLeft { room_id, actor_id }, None);
    if room.members.is_empty() {
        rooms.remove(&room_id);
    }
}

/// Remove an actor from a room if `connection_id` still owns the entry.
/// Returns whether anything was removed.
pub async fn leave(state: &AppState, room_id: Uuid, actor_id: Uuid, connection_id: Uuid) -> bool {
    let mut rooms = state.rooms.write().await;
    let owned = rooms
        .get(&room_id)
        .and_then(|room| room.members.get(&actor_id))
        .is_some_and(|m| m.connection_id == connection_id);
    if owned {
        remove_member(&mut rooms, room_id, actor_id);
        info!(%room_id, %actor_id, %connection_id, "actor left room");
    }
    owned
}

/// Transport closed: leave every room this connection registered.
/// Returns the rooms left.
pub async fn disconnect(state: &AppState, actor_id: Uuid, connection_id: Uuid) -> Vec<Uuid> {
    let mut rooms = state.rooms.write().await;
    let owned: Vec<Uuid> = rooms
        .iter()
        .filter(|(_, room)| {
            room.members
                .get(&actor_id)
                .is_some_and(|m| m.connection_id == connection_id)
        })
        .map(|(room_id, _)| *room_id)
        .collect();

    for room_id in &owned {
        remove_member(&mut rooms, *room_id, actor_id);
    }
    if !owned.is_empty() {
        info!(%actor_id, %connection_id, rooms = owned.len(), "connection left all rooms");
    }
    owned
}

/// Is the actor currently present in the room?
pub async fn is_member(state: &AppState, room_id: Uuid, actor_id: Uuid) -> bool {
    state
        .rooms
        .read()
        .await
        .get(&room_id)
        .is_some_and(|room| room.members.contains_key(&actor_id))
}

/// Everyone present in a room.
pub async fn members(state: &AppState, room_id: Uuid) -> Vec<PresenceMember> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&room_id) else {
        return Vec::new();
    };
    room.members.iter().map(|(id, m)| presence_of(*id, m)).collect()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
