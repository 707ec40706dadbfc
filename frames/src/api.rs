//! Request bodies for the HTTP board and chat endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::CardStatus;

/// `GET /columns?projectId=`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsQuery {
    pub project_id: Uuid,
}

/// `PATCH /columns/{columnId}/cards/reorder`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    pub from_index: usize,
    pub to_index: usize,
}

/// `PATCH /cards/{cardId}/move`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub from_column_id: Uuid,
    pub to_column_id: Uuid,
    pub to_card_index: usize,
}

/// `POST /columns`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnBody {
    pub project_id: Uuid,
    pub title: String,
}

/// `POST /columns/{columnId}/cards`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardBody {
    pub member: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub status: CardStatus,
}
