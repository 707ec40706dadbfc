//! Position store and move reconciler.
//!
//! DESIGN
//! ======
//! Each project board is hydrated from storage on first use and kept in
//! memory as the single source of truth. Every column sits behind its own
//! async mutex: a reorder locks one column, a cross-column move locks both in
//! ascending id order so two moves over the same pair cannot deadlock. Two
//! splices on one column are therefore linearized, while unrelated columns
//! proceed in parallel.
//!
//! Every successful mutation returns the full state of the columns it touched
//! and broadcasts the same state to the project room as `columns-updated`.
//! The broadcast happens while the column locks are still held, so members
//! observe column states in mutation order.
//!
//! ERROR HANDLING
//! ==============
//! A missing column, card, or index is `NotFound`. A column deleted while a
//! request waited for its lock, or a card deleted before its move ran, is
//! `Conflict`. Callers treat both as "re-fetch and re-render", never retry.
//! Access denial is reported as not found so project ids do not leak.

use std::sync::Arc;

use frames::api::CreateCardBody;
use frames::{Actor, Card, Column, ServerEvent};
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::session;
use crate::state::{AppState, ColumnHandle, ProjectBoard};
use crate::store::StorageError;

const MAX_TITLE_LEN: usize = 200;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),
    #[error("column not found: {0}")]
    ColumnNotFound(Uuid),
    #[error("card not found: {0}")]
    CardNotFound(Uuid),
    #[error("index {index} out of range for column with {len} cards")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl frames::ErrorCode for BoardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "E_PROJECT_NOT_FOUND",
            Self::ColumnNotFound(_) => "E_COLUMN_NOT_FOUND",
            Self::CardNotFound(_) => "E_CARD_NOT_FOUND",
            Self::IndexOutOfRange { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Invalid(_) => "E_INVALID",
            Self::Storage(e) => frames::ErrorCode::error_code(e),
        }
    }
}

impl BoardError {
    /// Referenced entity is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_) | Self::ColumnNotFound(_) | Self::CardNotFound(_) | Self::IndexOutOfRange { .. }
        )
    }
}

// =============================================================================
// SPLICES
// =============================================================================

/// Move the card at `from` to `to` within one column. `to` is clamped to the
/// last index. Returns whether the order changed.
///
/// # Errors
///
/// Returns [`BoardError::IndexOutOfRange`] if `from` does not address a card.
pub fn splice_within(column: &mut Column, from: usize, to: usize) -> Result<bool, BoardError> {
    let len = column.cards.len();
    if from >= len {
        return Err(BoardError::IndexOutOfRange { index: from, len });
    }
    let to = to.min(len - 1);
    if from == to {
        return Ok(false);
    }
    let card = column.cards.remove(from);
    column.cards.insert(to, card);
    Ok(true)
}

/// Transfer the card at `from_pos` of `source` into `target` at
/// `min(hint, target.len())`. Returns the insert position.
fn transfer(source: &mut Column, from_pos: usize, target: &mut Column, hint: usize) -> usize {
    let card = source.cards.remove(from_pos);
    let at = hint.min(target.cards.len());
    target.cards.insert(at, card);
    at
}

// =============================================================================
// HYDRATION
// =============================================================================

/// Return the live board for a project, hydrating it from storage if needed.
///
/// # Errors
///
/// Returns a storage error if hydration fails.
pub async fn load_project(state: &AppState, project_id: Uuid) -> Result<Arc<ProjectBoard>, BoardError> {
    if let Some(board) = state.projects.read().await.get(&project_id) {
        return Ok(board.clone());
    }

    // Read storage outside locks; only applied if nobody hydrated meanwhile.
    let columns = state.storage.load_columns(project_id).await?;

    let mut projects = state.projects.write().await;
    if let Some(board) = projects.get(&project_id) {
        return Ok(board.clone());
    }
    {
        let mut index = state.column_index.write().await;
        for column in &columns {
            index.insert(column.id, project_id);
        }
    }
    info!(%project_id, columns = columns.len(), "hydrated project board");
    let board = Arc::new(ProjectBoard::new(project_id, columns));
    projects.insert(project_id, board.clone());
    Ok(board)
}

/// Deny with not-found unless the actor may see the project.
async fn ensure_access(state: &AppState, project_id: Uuid, actor: &Actor) -> Result<(), BoardError> {
    if state.storage.can_access(project_id, actor.id).await? {
        Ok(())
    } else {
        Err(BoardError::ProjectNotFound(project_id))
    }
}

async fn project_for_column(state: &AppState, column_id: Uuid) -> Result<Uuid, BoardError> {
    if let Some(project_id) = state.column_index.read().await.get(&column_id) {
        return Ok(*project_id);
    }
    state
        .storage
        .project_of_column(column_id)
        .await?
        .ok_or(BoardError::ColumnNotFound(column_id))
}

/// Resolve a column id to its live board and lock handle, checking access.
async fn resolve(
    state: &AppState,
    actor: &Actor,
    column_id: Uuid,
) -> Result<(Arc<ProjectBoard>, ColumnHandle), BoardError> {
    let project_id = project_for_column(state, column_id).await?;
    if !state.storage.can_access(project_id, actor.id).await? {
        return Err(BoardError::ColumnNotFound(column_id));
    }
    let board = load_project(state, project_id).await?;
    let handle = board
        .handle(column_id)
        .await
        .ok_or(BoardError::ColumnNotFound(column_id))?;
    Ok((board, handle))
}

fn missing_card(board: &ProjectBoard, card_id: Uuid) -> BoardError {
    if board.was_card_removed(card_id) {
        BoardError::Conflict(format!("card {card_id} was deleted"))
    } else {
        BoardError::CardNotFound(card_id)
    }
}

fn deleted_column(column_id: Uuid) -> BoardError {
    BoardError::Conflict(format!("column {column_id} was deleted"))
}

async fn publish(state: &AppState, project_id: Uuid, columns: Vec<Column>) {
    let event = ServerEvent::ColumnsUpdated { room_id: project_id, columns };
    session::broadcast(state, project_id, &event, None).await;
}

// =============================================================================
// QUERIES
// =============================================================================

/// Ordered columns of a project with embedded cards.
///
/// # Errors
///
/// Returns [`BoardError::ProjectNotFound`] if the actor may not see the project.
pub async fn list_columns(state: &AppState, actor: &Actor, project_id: Uuid) -> Result<Vec<Column>, BoardError> {
    ensure_access(state, project_id, actor).await?;
    let board = load_project(state, project_id).await?;
    Ok(board.snapshot().await)
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Reorder a card within one column. Returns the column's full state.
///
/// # Errors
///
/// Not-found for an unknown column or an out-of-range `from_index`;
/// [`BoardError::Conflict`] if the column was deleted while waiting.
pub async fn reorder(
    state: &AppState,
    actor: &Actor,
    column_id: Uuid,
    from_index: usize,
    to_index: usize,
) -> Result<Column, BoardError> {
    let (board, handle) = resolve(state, actor, column_id).await?;
    let mut slot = handle.lock().await;
    if slot.deleted {
        return Err(deleted_column(column_id));
    }

    if splice_within(&mut slot.column, from_index, to_index)? {
        slot.touch();
        board.mark_dirty(column_id);
        debug!(%column_id, from_index, to_index, "reordered card");
        publish(state, board.project_id, vec![slot.column.clone()]).await;
    }
    Ok(slot.column.clone())
}

/// Move a card between columns of one project, inserting at
/// `min(to_index_hint, len)`. A move within a single column behaves as a
/// reorder from the card's current position. Returns every touched column.
///
/// # Errors
///
/// Not-found for unknown columns or a card absent from the source column;
/// [`BoardError::Conflict`] if either column or the card was deleted;
/// [`BoardError::Invalid`] if the columns belong to different projects.
pub async fn move_card(
    state: &AppState,
    actor: &Actor,
    card_id: Uuid,
    from_column_id: Uuid,
    to_column_id: Uuid,
    to_index_hint: usize,
) -> Result<Vec<Column>, BoardError> {
    let (board, from_handle) = resolve(state, actor, from_column_id).await?;

    if from_column_id == to_column_id {
        let mut slot = from_handle.lock().await;
        if slot.deleted {
            return Err(deleted_column(from_column_id));
        }
        let Some(from_pos) = slot.column.position_of(card_id) else {
            return Err(missing_card(&board, card_id));
        };
        if splice_within(&mut slot.column, from_pos, to_index_hint)? {
            slot.touch();
            board.mark_dirty(from_column_id);
            publish(state, board.project_id, vec![slot.column.clone()]).await;
        }
        return Ok(vec![slot.column.clone()]);
    }

    let to_project = project_for_column(state, to_column_id).await?;
    if to_project != board.project_id {
        return Err(BoardError::Invalid("columns belong to different projects".into()));
    }
    let to_handle = board
        .handle(to_column_id)
        .await
        .ok_or(BoardError::ColumnNotFound(to_column_id))?;

    // Ascending id order across both columns.
    let (mut source, mut target) = if from_column_id < to_column_id {
        let source = from_handle.lock().await;
        let target = to_handle.lock().await;
        (source, target)
    } else {
        let target = to_handle.lock().await;
        let source = from_handle.lock().await;
        (source, target)
    };

    if source.deleted {
        return Err(deleted_column(from_column_id));
    }
    if target.deleted {
        return Err(deleted_column(to_column_id));
    }
    let Some(from_pos) = source.column.position_of(card_id) else {
        return Err(missing_card(&board, card_id));
    };

    let at = transfer(&mut source.column, from_pos, &mut target.column, to_index_hint);
    source.touch();
    target.touch();
    board.mark_dirty(from_column_id);
    board.mark_dirty(to_column_id);
    debug!(%card_id, %from_column_id, %to_column_id, at, "moved card");

    let columns = vec![source.column.clone(), target.column.clone()];
    publish(state, board.project_id, columns.clone()).await;
    Ok(columns)
}

/// Append a new empty column to a project.
///
/// # Errors
///
/// [`BoardError::Invalid`] for an empty or overlong title; not-found if the
/// actor may not see the project.
pub async fn create_column(
    state: &AppState,
    actor: &Actor,
    project_id: Uuid,
    title: &str,
) -> Result<Column, BoardError> {
    let title = title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(BoardError::Invalid(format!("column title must be 1..={MAX_TITLE_LEN} bytes")));
    }
    ensure_access(state, project_id, actor).await?;
    let board = load_project(state, project_id).await?;

    let column = Column { id: Uuid::new_v4(), project_id, title: title.to_owned(), cards: Vec::new() };
    state.column_index.write().await.insert(column.id, project_id);
    board.layout.write().await.push(ColumnHandle::new(column.clone()));
    board.mark_dirty(column.id);
    info!(%project_id, column_id = %column.id, "created column");

    publish(state, project_id, vec![column.clone()]).await;
    Ok(column)
}

/// Delete a column and every card in it. Requests already waiting on the
/// column's lock fail with a conflict.
///
/// # Errors
///
/// Not-found for an unknown column.
pub async fn delete_column(state: &AppState, actor: &Actor, column_id: Uuid) -> Result<(), BoardError> {
    let (board, handle) = resolve(state, actor, column_id).await?;

    let remaining: Vec<Uuid> = {
        let mut layout = board.layout.write().await;
        let Some(pos) = layout.iter().position(|h| h.id == column_id) else {
            return Err(BoardError::ColumnNotFound(column_id));
        };
        layout.remove(pos);
        layout.iter().map(|h| h.id).collect()
    };

    {
        let mut slot = handle.lock().await;
        slot.deleted = true;
        slot.touch();
        for card in &slot.column.cards {
            board.mark_card_removed(card.id);
        }
    }
    board.mark_column_removed(column_id);
    // Later columns shift position.
    board.mark_all_dirty(remaining);
    state.column_index.write().await.remove(&column_id);
    info!(project_id = %board.project_id, %column_id, "deleted column");

    let event = ServerEvent::ColumnDeleted { room_id: board.project_id, column_id };
    session::broadcast(state, board.project_id, &event, None).await;
    Ok(())
}

/// Append a card to a column. Returns the column's full state.
///
/// # Errors
///
/// [`BoardError::Invalid`] for an empty member label; not-found or conflict
/// as for [`reorder`].
pub async fn create_card(
    state: &AppState,
    actor: &Actor,
    column_id: Uuid,
    body: CreateCardBody,
) -> Result<Column, BoardError> {
    let member = body.member.trim();
    if member.is_empty() {
        return Err(BoardError::Invalid("card member must not be empty".into()));
    }
    let (board, handle) = resolve(state, actor, column_id).await?;
    let mut slot = handle.lock().await;
    if slot.deleted {
        return Err(deleted_column(column_id));
    }

    let card = Card { id: Uuid::new_v4(), member: member.to_owned(), tasks: body.tasks, status: body.status };
    info!(%column_id, card_id = %card.id, "created card");
    slot.column.cards.push(card);
    slot.touch();
    board.mark_dirty(column_id);

    publish(state, board.project_id, vec![slot.column.clone()]).await;
    Ok(slot.column.clone())
}

/// Remove a card from a column. Later moves of the same card conflict.
///
/// # Errors
///
/// Not-found if the card is not in the column.
pub async fn delete_card(state: &AppState, actor: &Actor, column_id: Uuid, card_id: Uuid) -> Result<Column, BoardError> {
    let (board, handle) = resolve(state, actor, column_id).await?;
    let mut slot = handle.lock().await;
    if slot.deleted {
        return Err(deleted_column(column_id));
    }
    let Some(pos) = slot.column.position_of(card_id) else {
        return Err(missing_card(&board, card_id));
    };

    slot.column.cards.remove(pos);
    slot.touch();
    board.mark_card_removed(card_id);
    board.mark_dirty(column_id);
    info!(%column_id, %card_id, "deleted card");

    publish(state, board.project_id, vec![slot.column.clone()]).await;
    Ok(slot.column.clone())
}

#[cfg(test)]
#[path = "position_test.rs"]
mod tests;
