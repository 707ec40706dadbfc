//! In-memory storage for tests and database-less local runs.
//!
//! With open access enabled, any non-empty token resolves to a stable actor
//! derived from the token text and every project is accessible. Nothing
//! survives a restart.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use frames::{Actor, Column, Message};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{ColumnWrite, Storage, StorageError};

#[derive(Default)]
struct Inner {
    actors: HashMap<String, Actor>,
    members: HashMap<Uuid, HashSet<Uuid>>,
    columns: HashMap<Uuid, Vec<Column>>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    open_access: bool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any token and any project. Local development only.
    #[must_use]
    pub fn with_open_access() -> Self {
        Self { inner: Mutex::new(Inner::default()), open_access: true }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a session token for an actor.
    pub fn add_actor(&self, token: &str, actor: Actor) {
        self.lock().actors.insert(token.to_owned(), actor);
    }

    /// Grant an actor access to a project.
    pub fn grant(&self, project_id: Uuid, actor_id: Uuid) {
        self.lock().members.entry(project_id).or_default().insert(actor_id);
    }

    /// Seed stored columns for a project, in board order.
    pub fn put_columns(&self, project_id: Uuid, columns: Vec<Column>) {
        self.lock().columns.insert(project_id, columns);
    }

    /// Snapshot of what a flush has written so far.
    #[must_use]
    pub fn stored_columns(&self, project_id: Uuid) -> Vec<Column> {
        self.lock().columns.get(&project_id).cloned().unwrap_or_default()
    }
}

/// Stable actor id for an open-access token.
fn token_actor(token: &str) -> Actor {
    let digest = Sha256::digest(token.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Actor { id: Uuid::from_bytes(bytes), display_name: token.to_owned() }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn actor_for_token(&self, token: &str) -> Result<Option<Actor>, StorageError> {
        if let Some(actor) = self.lock().actors.get(token) {
            return Ok(Some(actor.clone()));
        }
        if self.open_access && !token.is_empty() {
            return Ok(Some(token_actor(token)));
        }
        Ok(None)
    }

    async fn can_access(&self, project_id: Uuid, actor_id: Uuid) -> Result<bool, StorageError> {
        if self.open_access {
            return Ok(true);
        }
        Ok(self
            .lock()
            .members
            .get(&project_id)
            .is_some_and(|m| m.contains(&actor_id)))
    }

    async fn load_columns(&self, project_id: Uuid) -> Result<Vec<Column>, StorageError> {
        Ok(self.stored_columns(project_id))
    }

    async fn project_of_column(&self, column_id: Uuid) -> Result<Option<Uuid>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .columns
            .iter()
            .find(|(_, cols)| cols.iter().any(|c| c.id == column_id))
            .map(|(project_id, _)| *project_id))
    }

    async fn write_columns(
        &self,
        project_id: Uuid,
        columns: &[ColumnWrite],
        removed: &[Uuid],
    ) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let stored = inner.columns.entry(project_id).or_default();

        let written_cards: HashSet<Uuid> = columns.iter().flat_map(|(_, c)| c.card_ids()).collect();
        stored.retain(|c| !removed.contains(&c.id));
        for column in stored.iter_mut() {
            column.cards.retain(|card| !written_cards.contains(&card.id));
        }

        let mut ordered: Vec<(usize, Column)> = stored
            .drain(..)
            .enumerate()
            .filter(|(_, c)| !columns.iter().any(|(_, w)| w.id == c.id))
            .collect();
        ordered.extend(columns.iter().cloned());
        ordered.sort_by_key(|(position, _)| *position);
        *stored = ordered.into_iter().map(|(_, c)| c).collect();
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        self.lock().messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, StorageError> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StorageError> {
        Ok(self.lock().messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<bool, StorageError> {
        let mut inner = self.lock();
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != message_id);
        Ok(inner.messages.len() != before)
    }
}
