//! Board, chat, and presence records shared by server and client.
//!
//! Field names serialize as camelCase so HTTP bodies and websocket frames
//! carry the same shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// BOARD
// =============================================================================

/// Workflow state of a card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl CardStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parse the storage representation. Unknown values fall back to `Todo`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "in_progress" => Self::InProgress,
            "done" => Self::Done,
            _ => Self::Todo,
        }
    }
}

/// A card lives in exactly one column at a time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    /// Assignee display label.
    pub member: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub status: CardStatus,
}

/// Ordered list of cards. The `cards` order is the rendering order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl Column {
    /// Index of a card within this column, if present.
    #[must_use]
    pub fn position_of(&self, card_id: Uuid) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card_id)
    }

    #[must_use]
    pub fn card_ids(&self) -> Vec<Uuid> {
        self.cards.iter().map(|c| c.id).collect()
    }
}

/// A relocation request: the unit of the reorder/move protocol. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub card_id: Uuid,
    pub from_column_id: Uuid,
    pub to_column_id: Uuid,
    pub from_index: usize,
    pub to_index: usize,
}

impl MoveIntent {
    /// Dropping a card back where it started changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from_column_id == self.to_column_id && self.from_index == self.to_index
    }

    #[must_use]
    pub fn is_reorder(&self) -> bool {
        self.from_column_id == self.to_column_id
    }
}

// =============================================================================
// CHAT
// =============================================================================

/// A chat message. Immutable once created; removed by hard delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    /// Milliseconds since the Unix epoch, assigned by the server.
    pub created_at: i64,
}

// =============================================================================
// PRESENCE
// =============================================================================

/// Pointer coordinates in board space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One actor currently present in a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMember {
    pub actor_id: Uuid,
    pub display_name: String,
    /// Hex color derived from the actor id.
    pub color: String,
}

/// Authenticated identity attached to a connection or request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: Uuid,
    pub display_name: String,
}
