//! Closed sets of realtime events.
//!
//! Each enum serializes adjacently tagged as `{"event": <name>, "data": {...}}`.
//! The event names are part of the wire contract; see [`ClientEvent::NAMES`]
//! and [`ServerEvent::NAMES`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ErrorCode;
use crate::model::{Column, Message, Position, PresenceMember};

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join-project", rename_all = "camelCase")]
    JoinProject { room_id: Uuid },

    #[serde(rename = "leave-project", rename_all = "camelCase")]
    LeaveProject { room_id: Uuid },

    #[serde(rename = "cursor-move", rename_all = "camelCase")]
    CursorMove {
        room_id: Uuid,
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element_id: Option<String>,
    },

    /// `sender_id` is informational; the server stamps the authenticated actor.
    /// `client_ref` is echoed back on the resulting `receive_message`.
    #[serde(rename = "send_message", rename_all = "camelCase")]
    SendMessage {
        room_id: Uuid,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },
}

impl ClientEvent {
    pub const NAMES: &'static [&'static str] = &["join-project", "leave-project", "cursor-move", "send_message"];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinProject { .. } => "join-project",
            Self::LeaveProject { .. } => "leave-project",
            Self::CursorMove { .. } => "cursor-move",
            Self::SendMessage { .. } => "send_message",
        }
    }

    #[must_use]
    pub fn room_id(&self) -> Uuid {
        match self {
            Self::JoinProject { room_id }
            | Self::LeaveProject { room_id }
            | Self::CursorMove { room_id, .. }
            | Self::SendMessage { room_id, .. } => *room_id,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "user-joined", rename_all = "camelCase")]
    UserJoined {
        room_id: Uuid,
        actor_id: Uuid,
        display_name: String,
        color: String,
    },

    #[serde(rename = "user-left", rename_all = "camelCase")]
    UserLeft { room_id: Uuid, actor_id: Uuid },

    /// Sent only to a joiner: everyone already in the room.
    #[serde(rename = "presence-snapshot", rename_all = "camelCase")]
    PresenceSnapshot { room_id: Uuid, members: Vec<PresenceMember> },

    #[serde(rename = "remote-cursor-move", rename_all = "camelCase")]
    RemoteCursorMove {
        room_id: Uuid,
        actor_id: Uuid,
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element_id: Option<String>,
    },

    #[serde(rename = "receive_message", rename_all = "camelCase")]
    ReceiveMessage {
        message: Message,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<String>,
    },

    #[serde(rename = "message_deleted", rename_all = "camelCase")]
    MessageDeleted { room_id: Uuid, message_id: Uuid },

    /// Full state of columns changed by a board mutation.
    #[serde(rename = "columns-updated", rename_all = "camelCase")]
    ColumnsUpdated { room_id: Uuid, columns: Vec<Column> },

    /// A column and its cards are gone; mirrors drop it from their list.
    #[serde(rename = "column-deleted", rename_all = "camelCase")]
    ColumnDeleted { room_id: Uuid, column_id: Uuid },

    /// `room_id` is set when the failed request targeted one room.
    #[serde(rename = "error", rename_all = "camelCase")]
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<Uuid>,
    },
}

impl ServerEvent {
    pub const NAMES: &'static [&'static str] = &[
        "user-joined",
        "user-left",
        "presence-snapshot",
        "remote-cursor-move",
        "receive_message",
        "message_deleted",
        "columns-updated",
        "column-deleted",
        "error",
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserJoined { .. } => "user-joined",
            Self::UserLeft { .. } => "user-left",
            Self::PresenceSnapshot { .. } => "presence-snapshot",
            Self::RemoteCursorMove { .. } => "remote-cursor-move",
            Self::ReceiveMessage { .. } => "receive_message",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::ColumnsUpdated { .. } => "columns-updated",
            Self::ColumnDeleted { .. } => "column-deleted",
            Self::Error { .. } => "error",
        }
    }

    /// Structured error frame from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error { code: err.error_code().to_owned(), message: err.to_string(), room_id: None }
    }

    /// Error frame for a request aimed at `room_id`.
    #[must_use]
    pub fn error_in_room(room_id: Uuid, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error { code: err.error_code().to_owned(), message: err.to_string(), room_id: Some(room_id) }
    }

    #[must_use]
    pub fn is_cursor(&self) -> bool {
        matches!(self, Self::RemoteCursorMove { .. })
    }
}
