//! Persistence service: background flush of dirty columns.
//!
//! DESIGN
//! ======
//! A background task writes every dirty column of every live board, then
//! evicts boards nobody is using, then sleeps for the configured interval.
//! Request handlers therefore never wait on storage I/O for board mutations.
//!
//! ERROR HANDLING
//! ==============
//! Dirty flags are cleared only after a successful write, and only for
//! columns whose revision did not move while the write was in flight.
//! Repeated writes are acceptable, silent loss is not. A board is evicted
//! only when it is clean, has no room members, and no request holds it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::state::{AppState, ProjectBoard};
use crate::store::StorageError;

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let interval = state.config.column_flush_interval;
    info!(flush_interval_ms = interval.as_millis(), "column persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_dirty(&state).await;
            evict_idle(&state).await;
            tokio::time::sleep(interval).await;
        }
    })
}

/// Flush every dirty board once. Returns the number of columns written.
pub async fn flush_all_dirty(state: &AppState) -> usize {
    let boards: Vec<Arc<ProjectBoard>> = state
        .projects
        .read()
        .await
        .values()
        .filter(|b| b.is_dirty())
        .cloned()
        .collect();

    let mut written = 0;
    for board in boards {
        match flush_board(state, &board).await {
            Ok(count) => written += count,
            Err(e) => {
                error!(error = %e, project_id = %board.project_id, "column flush failed; will retry");
            }
        }
    }
    written
}

async fn flush_board(state: &AppState, board: &ProjectBoard) -> Result<usize, StorageError> {
    let layout = board.layout.read().await.clone();

    // PHASE: LOCK EVERY COLUMN IN ASCENDING ID ORDER
    // Same order as move_card, so a cross-column move lands either wholly
    // before or wholly after the snapshot.
    let mut order: Vec<usize> = (0..layout.len()).collect();
    order.sort_by_key(|&i| layout[i].id);
    let mut guards = Vec::with_capacity(layout.len());
    for i in order {
        guards.push((i, layout[i].lock().await));
    }
    guards.sort_by_key(|(i, _)| *i);

    // Mutations mark dirty under their column locks, so this read agrees
    // with the slots we hold.
    let (dirty, removed) = board.pending();

    // PHASE: SNAPSHOT DIRTY COLUMNS WITH THEIR REVISIONS
    let mut writes = Vec::new();
    let mut revisions = Vec::new();
    let mut clean: Vec<Uuid> = Vec::with_capacity(dirty.len());
    for (position, slot) in &guards {
        let handle = &layout[*position];
        if !dirty.contains(&handle.id) {
            continue;
        }
        if slot.deleted {
            clean.push(handle.id);
            continue;
        }
        writes.push((*position, slot.column.clone()));
        revisions.push((handle.clone(), slot.revision));
    }
    drop(guards);

    state
        .storage
        .write_columns(board.project_id, &writes, &removed)
        .await?;

    // PHASE: ACK ONLY UNCHANGED COLUMNS
    for (handle, revision) in revisions {
        if handle.lock().await.revision == revision {
            clean.push(handle.id);
        }
    }
    // Dirty ids whose column has since left the layout.
    clean.extend(dirty.iter().filter(|id| !layout.iter().any(|h| h.id == **id)));
    board.ack_flushed(&clean, &removed);

    debug!(project_id = %board.project_id, columns = writes.len(), removed = removed.len(), "flushed columns");
    Ok(writes.len())
}

/// Drop clean, unused boards from memory. Returns how many were evicted.
pub async fn evict_idle(state: &AppState) -> usize {
    let mut projects = state.projects.write().await;
    let idle: Vec<Uuid> = {
        let rooms = state.rooms.read().await;
        projects
            .iter()
            .filter(|(id, board)| !rooms.contains_key(*id) && !board.is_dirty() && Arc::strong_count(board) == 1)
            .map(|(id, _)| *id)
            .collect()
    };
    if idle.is_empty() {
        return 0;
    }

    let mut index = state.column_index.write().await;
    for project_id in &idle {
        projects.remove(project_id);
        info!(%project_id, "evicted project board from memory");
    }
    index.retain(|_, project_id| !idle.contains(project_id));
    idle.len()
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
