//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the storage collaborator, the live project boards, and the room
//! registry. Each project board keeps its columns in memory behind one async
//! mutex per column, so mutations on the same column serialize while
//! different columns proceed in parallel. Mutated columns are marked dirty
//! and flushed by the persistence task.
//!
//! LOCK ORDER
//! ==========
//! `projects` → `column_index`, and `layout` → column slots (ascending id) →
//! `rooms`. Column locks may be held while broadcasting; nothing holding
//! `rooms` waits on a board. Board bookkeeping uses a std mutex and is never
//! held across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use frames::{Column, ServerEvent};
use tokio::sync::{Mutex, MutexGuard, RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::store::Storage;

// =============================================================================
// COLUMNS
// =============================================================================

/// A column plus the flags the reconciler needs under its lock.
pub struct ColumnSlot {
    pub column: Column,
    /// Set when the column is deleted; waiters that acquire the lock later
    /// must treat their intent as conflicted.
    pub deleted: bool,
    /// Bumped on every mutation; lets the flusher tell whether a snapshot is
    /// still current.
    pub revision: u64,
}

impl ColumnSlot {
    pub fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Cheap, clonable reference to one column's lock.
#[derive(Clone)]
pub struct ColumnHandle {
    pub id: Uuid,
    slot: Arc<Mutex<ColumnSlot>>,
}

impl ColumnHandle {
    #[must_use]
    pub fn new(column: Column) -> Self {
        Self { id: column.id, slot: Arc::new(Mutex::new(ColumnSlot { column, deleted: false, revision: 0 })) }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ColumnSlot> {
        self.slot.lock().await
    }
}

// =============================================================================
// PROJECT BOARD
// =============================================================================

#[derive(Default)]
struct Bookkeeping {
    dirty: HashSet<Uuid>,
    removed_columns: HashSet<Uuid>,
    removed_cards: HashSet<Uuid>,
}

/// Live, authoritative board of one project.
pub struct ProjectBoard {
    pub project_id: Uuid,
    /// Columns in board order.
    pub layout: RwLock<Vec<ColumnHandle>>,
    book: StdMutex<Bookkeeping>,
}

impl ProjectBoard {
    #[must_use]
    pub fn new(project_id: Uuid, columns: Vec<Column>) -> Self {
        Self {
            project_id,
            layout: RwLock::new(columns.into_iter().map(ColumnHandle::new).collect()),
            book: StdMutex::new(Bookkeeping::default()),
        }
    }

    fn book(&self) -> std::sync::MutexGuard<'_, Bookkeeping> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full board state, columns in order. Locks each column in turn.
    pub async fn snapshot(&self) -> Vec<Column> {
        let layout = self.layout.read().await.clone();
        let mut columns = Vec::with_capacity(layout.len());
        for handle in &layout {
            columns.push(handle.lock().await.column.clone());
        }
        columns
    }

    pub async fn handle(&self, column_id: Uuid) -> Option<ColumnHandle> {
        self.layout
            .read()
            .await
            .iter()
            .find(|h| h.id == column_id)
            .cloned()
    }

    pub fn mark_dirty(&self, column_id: Uuid) {
        self.book().dirty.insert(column_id);
    }

    pub fn mark_all_dirty(&self, column_ids: impl IntoIterator<Item = Uuid>) {
        self.book().dirty.extend(column_ids);
    }

    pub fn mark_column_removed(&self, column_id: Uuid) {
        let mut book = self.book();
        book.dirty.remove(&column_id);
        book.removed_columns.insert(column_id);
    }

    pub fn mark_card_removed(&self, card_id: Uuid) {
        self.book().removed_cards.insert(card_id);
    }

    #[must_use]
    pub fn was_card_removed(&self, card_id: Uuid) -> bool {
        self.book().removed_cards.contains(&card_id)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let book = self.book();
        !book.dirty.is_empty() || !book.removed_columns.is_empty()
    }

    /// Dirty column ids and removed column ids awaiting a flush.
    #[must_use]
    pub fn pending(&self) -> (HashSet<Uuid>, Vec<Uuid>) {
        let book = self.book();
        (book.dirty.clone(), book.removed_columns.iter().copied().collect())
    }

    /// Clear flags for writes that have been persisted.
    pub fn ack_flushed(&self, clean: &[Uuid], removed: &[Uuid]) {
        let mut book = self.book();
        for id in clean {
            book.dirty.remove(id);
        }
        for id in removed {
            book.removed_columns.remove(id);
        }
    }
}

// =============================================================================
// ROOMS
// =============================================================================

/// One actor's registration in a room.
pub struct RoomMember {
    /// Connection that registered this actor; only it may remove the entry.
    pub connection_id: Uuid,
    pub display_name: String,
    pub color: String,
    pub tx: mpsc::Sender<ServerEvent>,
}

/// Presence set and chat ordering lock of one project room.
#[derive(Default)]
pub struct RoomState {
    /// Keyed by actor id: an actor appears at most once per room.
    pub members: HashMap<Uuid, RoomMember>,
    /// Serializes append + broadcast so delivery order matches log order.
    pub chat_lock: Arc<Mutex<()>>,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<Config>,
    /// Loaded project boards keyed by project id.
    pub projects: Arc<RwLock<HashMap<Uuid, Arc<ProjectBoard>>>>,
    /// Column id → project id for loaded and freshly created columns.
    pub column_index: Arc<RwLock<HashMap<Uuid, Uuid>>>,
    /// Rooms keyed by project id.
    pub rooms: Arc<RwLock<HashMap<Uuid, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            projects: Arc::new(RwLock::new(HashMap::new())),
            column_index: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
