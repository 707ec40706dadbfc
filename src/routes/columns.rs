//! Board routes: column listing and card ordering.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::Column;
use frames::api::{ColumnsQuery, CreateCardBody, CreateColumnBody, MoveBody, ReorderBody};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::position::{self, BoardError};
use crate::state::AppState;

/// `GET /columns?projectId=`: ordered columns with embedded cards.
pub async fn list_columns(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ColumnsQuery>,
) -> Result<Json<Vec<Column>>, StatusCode> {
    let columns = position::list_columns(&state, &auth.actor, query.project_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(columns))
}

/// `PATCH /columns/:column_id/cards/reorder`: returns the updated column.
pub async fn reorder_cards(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(column_id): Path<Uuid>,
    Json(body): Json<ReorderBody>,
) -> Result<Json<Column>, StatusCode> {
    let column = position::reorder(&state, &auth.actor, column_id, body.from_index, body.to_index)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(column))
}

/// `PATCH /cards/:card_id/move`: returns every touched column.
pub async fn move_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(card_id): Path<Uuid>,
    Json(body): Json<MoveBody>,
) -> Result<Json<Vec<Column>>, StatusCode> {
    let columns = position::move_card(
        &state,
        &auth.actor,
        card_id,
        body.from_column_id,
        body.to_column_id,
        body.to_card_index,
    )
    .await
    .map_err(board_error_to_status)?;
    Ok(Json(columns))
}

/// `POST /columns`: append an empty column.
pub async fn create_column(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateColumnBody>,
) -> Result<(StatusCode, Json<Column>), StatusCode> {
    let column = position::create_column(&state, &auth.actor, body.project_id, &body.title)
        .await
        .map_err(board_error_to_status)?;
    Ok((StatusCode::CREATED, Json(column)))
}

/// `DELETE /columns/:column_id`: delete a column and its cards.
pub async fn delete_column(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(column_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    position::delete_column(&state, &auth.actor, column_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `POST /columns/:column_id/cards`: append a card; returns the column.
pub async fn create_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(column_id): Path<Uuid>,
    Json(body): Json<CreateCardBody>,
) -> Result<(StatusCode, Json<Column>), StatusCode> {
    let column = position::create_card(&state, &auth.actor, column_id, body)
        .await
        .map_err(board_error_to_status)?;
    Ok((StatusCode::CREATED, Json(column)))
}

/// `DELETE /columns/:column_id/cards/:card_id`: returns the column.
pub async fn delete_card(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((column_id, card_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Column>, StatusCode> {
    let column = position::delete_card(&state, &auth.actor, column_id, card_id)
        .await
        .map_err(board_error_to_status)?;
    Ok(Json(column))
}

pub(crate) fn board_error_to_status(err: BoardError) -> StatusCode {
    match err {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        BoardError::Conflict(_) => StatusCode::CONFLICT,
        BoardError::Invalid(_) => StatusCode::BAD_REQUEST,
        e => {
            tracing::error!(error = %e, "board request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "columns_test.rs"]
mod tests;
