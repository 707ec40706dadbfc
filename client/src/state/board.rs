//! Optimistic mirror of one project's columns.
//!
//! SYSTEM CONTEXT
//! ==============
//! Drag visuals mutate the mirror synchronously through
//! [`BoardClient::apply_local_move`] so the card tracks the pointer with no
//! network wait. On drop the intent is committed as a reorder (same column)
//! or a move (across columns), and the mirror is then replaced wholesale by
//! a fresh fetch, whether the commit succeeded or not. The optimistic guess
//! is never trusted past the drop.

#[cfg(test)]
#[path = "board_test.rs"]
mod board_test;

use std::sync::Arc;

use frames::api::{MoveBody, ReorderBody};
use frames::{Column, MoveIntent};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::net::api::BoardApi;

/// In-flight drag gesture.
#[derive(Clone, Debug)]
struct Drag {
    card_id: Uuid,
    origin_column: Uuid,
    origin_index: usize,
    /// Where the card currently sits in the mirror.
    column: usize,
    index: usize,
    snapshot: Vec<Column>,
}

/// Result of ending a drag.
#[derive(Debug)]
pub enum DropOutcome {
    /// Nothing to commit: no drag, or the card was dropped where it started.
    NoOp,
    Committed,
    /// The server refused; the mirror has been re-synced from the server.
    Rejected(ClientError),
}

pub struct BoardClient<A: BoardApi> {
    api: Arc<A>,
    project_id: Uuid,
    columns: Vec<Column>,
    drag: Option<Drag>,
}

impl<A: BoardApi> BoardClient<A> {
    pub fn new(api: Arc<A>, project_id: Uuid) -> Self {
        Self { api, project_id, columns: Vec::new(), drag: None }
    }

    #[must_use]
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Replace the mirror with the server's columns.
    ///
    /// # Errors
    ///
    /// Propagates the fetch failure; the mirror is left untouched.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.columns = self.api.fetch_columns(self.project_id).await?;
        Ok(())
    }

    // =========================================================================
    // DRAG
    // =========================================================================

    /// Start dragging the card at `(column, index)`. Returns its id.
    pub fn begin_drag(&mut self, column: usize, index: usize) -> Option<Uuid> {
        let col = self.columns.get(column)?;
        let card_id = col.cards.get(index)?.id;
        self.drag = Some(Drag {
            card_id,
            origin_column: col.id,
            origin_index: index,
            column,
            index,
            snapshot: self.columns.clone(),
        });
        Some(card_id)
    }

    /// Drag-hover: move the dragged card to `(to_column, to_index)`.
    pub fn hover(&mut self, to_column: usize, to_index: usize) -> bool {
        let Some((column, index)) = self.drag.as_ref().map(|d| (d.column, d.index)) else {
            return false;
        };
        self.apply_local_move(column, index, to_column, to_index)
    }

    /// Splice the mirror synchronously. Returns whether anything changed.
    ///
    /// Repeated events for a position the card already holds are no-ops.
    pub fn apply_local_move(&mut self, from_column: usize, from_index: usize, to_column: usize, to_index: usize) -> bool {
        if from_column == to_column && from_index == to_index {
            return false;
        }
        if to_column >= self.columns.len() {
            return false;
        }
        let Some(source) = self.columns.get_mut(from_column) else {
            return false;
        };
        if from_index >= source.cards.len() {
            return false;
        }

        let landed = if from_column == to_column {
            let target = to_index.min(source.cards.len() - 1);
            if target == from_index {
                return false;
            }
            let card = source.cards.remove(from_index);
            source.cards.insert(target, card);
            target
        } else {
            let card = source.cards.remove(from_index);
            let dest = &mut self.columns[to_column];
            let target = to_index.min(dest.cards.len());
            dest.cards.insert(target, card);
            target
        };

        if let Some(drag) = self.drag.as_mut() {
            if drag.column == from_column && drag.index == from_index {
                drag.column = to_column;
                drag.index = landed;
            }
        }
        true
    }

    /// Abandon the gesture: restore the pre-drag mirror, no request.
    pub fn cancel_drag(&mut self) -> bool {
        match self.drag.take() {
            Some(drag) => {
                self.columns = drag.snapshot;
                true
            }
            None => false,
        }
    }

    /// End the gesture and commit it.
    pub async fn drop_card(&mut self) -> DropOutcome {
        let Some(drag) = self.drag.take() else {
            return DropOutcome::NoOp;
        };
        let Some(to_column_id) = self.columns.get(drag.column).map(|c| c.id) else {
            self.columns = drag.snapshot;
            return DropOutcome::NoOp;
        };
        let intent = MoveIntent {
            card_id: drag.card_id,
            from_column_id: drag.origin_column,
            to_column_id,
            from_index: drag.origin_index,
            to_index: drag.index,
        };
        if intent.is_noop() {
            return DropOutcome::NoOp;
        }
        self.commit(intent, Some(drag.snapshot)).await
    }

    /// Commit an intent against the server, then re-sync the mirror.
    pub async fn commit_move(&mut self, intent: MoveIntent) -> DropOutcome {
        if intent.is_noop() {
            return DropOutcome::NoOp;
        }
        self.commit(intent, None).await
    }

    async fn commit(&mut self, intent: MoveIntent, rollback: Option<Vec<Column>>) -> DropOutcome {
        let result = if intent.is_reorder() {
            let body = ReorderBody { from_index: intent.from_index, to_index: intent.to_index };
            self.api.reorder(intent.from_column_id, body).await.map(|_| ())
        } else {
            let body = MoveBody {
                from_column_id: intent.from_column_id,
                to_column_id: intent.to_column_id,
                to_card_index: intent.to_index,
            };
            self.api.move_card(intent.card_id, body).await.map(|_| ())
        };

        if let Err(e) = &result {
            debug!(card_id = %intent.card_id, error = %e, "board: commit rejected; re-syncing");
        }

        // The optimistic guess is discarded either way.
        if let Err(e) = self.load().await {
            warn!(project_id = %self.project_id, error = %e, "board: re-sync failed");
            if result.is_err() {
                if let Some(snapshot) = rollback {
                    self.columns = snapshot;
                }
            }
        }

        match result {
            Ok(()) => DropOutcome::Committed,
            Err(e) => DropOutcome::Rejected(e),
        }
    }

    // =========================================================================
    // REMOTE
    // =========================================================================

    /// Replace columns broadcast by the server. Ignored during a drag; the
    /// drop re-fetch reconciles.
    pub fn apply_remote_columns(&mut self, columns: Vec<Column>) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let mut changed = false;
        for column in columns.into_iter().filter(|c| c.project_id == self.project_id) {
            match self.columns.iter_mut().find(|c| c.id == column.id) {
                Some(existing) => {
                    if *existing != column {
                        *existing = column;
                        changed = true;
                    }
                }
                None => {
                    self.columns.push(column);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Drop a column the server deleted. A drag that started in or is
    /// hovering over that column cannot land and is abandoned.
    pub fn apply_column_deleted(&mut self, column_id: Uuid) -> bool {
        let Some(index) = self.columns.iter().position(|c| c.id == column_id) else {
            return false;
        };
        let mut abandoned = None;
        if let Some(drag) = self.drag.as_mut() {
            drag.snapshot.retain(|c| c.id != column_id);
            if drag.origin_column == column_id || drag.column == index {
                abandoned = Some(std::mem::take(&mut drag.snapshot));
            } else if drag.column > index {
                drag.column -= 1;
            }
        }
        if let Some(snapshot) = abandoned {
            debug!(%column_id, "board: dragged column deleted; abandoning drag");
            self.drag = None;
            self.columns = snapshot;
            return true;
        }
        self.columns.remove(index);
        true
    }
}
