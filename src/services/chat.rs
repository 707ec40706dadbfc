//! Message channel: per-room chat log with authorized deletion.
//!
//! DESIGN
//! ======
//! The server assigns message ids and timestamps. Append and broadcast run
//! under the room's chat lock, so every member receives messages in the same
//! order the log stores them. The sender receives its own message too; the
//! optional `client_ref` is echoed so the sender can replace its optimistic
//! copy exactly.

use std::time::{SystemTime, UNIX_EPOCH};

use frames::{Actor, Message, ServerEvent};
use tracing::info;
use uuid::Uuid;

use crate::services::session;
use crate::state::AppState;
use crate::store::StorageError;

pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message text is empty")]
    EmptyText,
    #[error("message longer than {MAX_MESSAGE_CHARS} characters")]
    TooLong,
    #[error("not joined to room {0}")]
    NotJoined(Uuid),
    #[error("room not found: {0}")]
    RoomNotFound(Uuid),
    #[error("message not found: {0}")]
    NotFound(Uuid),
    #[error("only the sender may delete message {0}")]
    Permission(Uuid),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl frames::ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyText => "E_EMPTY_MESSAGE",
            Self::TooLong => "E_MESSAGE_TOO_LONG",
            Self::NotJoined(_) => "E_NOT_JOINED",
            Self::RoomNotFound(_) => "E_ROOM_NOT_FOUND",
            Self::NotFound(_) => "E_MESSAGE_NOT_FOUND",
            Self::Permission(_) => "E_PERMISSION",
            Self::Storage(e) => frames::ErrorCode::error_code(e),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Append a message to a room and broadcast it to every member, sender
/// included.
///
/// # Errors
///
/// Rejects empty or overlong text, and senders not present in the room.
pub async fn send_message(
    state: &AppState,
    room_id: Uuid,
    sender: &Actor,
    text: &str,
    client_ref: Option<String>,
) -> Result<Message, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyText);
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::TooLong);
    }

    let chat_lock = {
        let rooms = state.rooms.read().await;
        let Some(room) = rooms.get(&room_id).filter(|r| r.members.contains_key(&sender.id)) else {
            return Err(ChatError::NotJoined(room_id));
        };
        room.chat_lock.clone()
    };
    let _ordered = chat_lock.lock().await;

    let message = Message { id: Uuid::new_v4(), room_id, sender_id: sender.id, text: text.to_owned(), created_at: now_ms() };
    state.storage.insert_message(&message).await?;

    let event = ServerEvent::ReceiveMessage { message: message.clone(), client_ref };
    session::broadcast(state, room_id, &event, None).await;
    info!(%room_id, message_id = %message.id, sender_id = %sender.id, "message sent");
    Ok(message)
}

/// Hard-delete a message. Only its sender may do so.
///
/// # Errors
///
/// [`ChatError::NotFound`] if the message is absent, [`ChatError::Permission`]
/// if the requester is not the sender.
pub async fn delete_message(state: &AppState, message_id: Uuid, requester: &Actor) -> Result<Message, ChatError> {
    let message = state
        .storage
        .get_message(message_id)
        .await?
        .ok_or(ChatError::NotFound(message_id))?;
    if message.sender_id != requester.id {
        return Err(ChatError::Permission(message_id));
    }
    if !state.storage.delete_message(message_id).await? {
        return Err(ChatError::NotFound(message_id));
    }

    let event = ServerEvent::MessageDeleted { room_id: message.room_id, message_id };
    session::broadcast(state, message.room_id, &event, None).await;
    info!(room_id = %message.room_id, %message_id, "message deleted");
    Ok(message)
}

/// Room log in arrival order.
///
/// # Errors
///
/// [`ChatError::RoomNotFound`] if the actor may not see the project.
pub async fn history(state: &AppState, actor: &Actor, room_id: Uuid) -> Result<Vec<Message>, ChatError> {
    if !state.storage.can_access(room_id, actor.id).await? {
        return Err(ChatError::RoomNotFound(room_id));
    }
    Ok(state.storage.list_messages(room_id).await?)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
