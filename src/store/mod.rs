//! Storage seam for the external collaborators the core trusts.
//!
//! DESIGN
//! ======
//! Authentication, project membership, and durable board/chat storage are
//! owned outside the synchronization core. They are reached through one
//! async trait so the server can run against Postgres in production and an
//! in-memory store in tests or local development. The core treats board
//! storage as a sequence-mutation API: it writes whole columns in order and
//! never patches individual positions.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use frames::{Actor, Column, Message};
use uuid::Uuid;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl frames::ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::Migrate(_) => "E_MIGRATE",
            Self::Corrupt(_) => "E_CORRUPT_ROW",
        }
    }
}

/// A column write: the column's index in the board plus its full contents.
pub type ColumnWrite = (usize, Column);

#[async_trait]
pub trait Storage: Send + Sync {
    /// Resolve a session token to its actor.
    async fn actor_for_token(&self, token: &str) -> Result<Option<Actor>, StorageError>;

    /// Membership authority: may this actor see and join the project?
    async fn can_access(&self, project_id: Uuid, actor_id: Uuid) -> Result<bool, StorageError>;

    /// Columns of a project in board order, cards in column order.
    async fn load_columns(&self, project_id: Uuid) -> Result<Vec<Column>, StorageError>;

    /// Owning project of a persisted column.
    async fn project_of_column(&self, column_id: Uuid) -> Result<Option<Uuid>, StorageError>;

    /// Replace the stored contents of the given columns and drop removed ones,
    /// atomically. Cards absent from a written column are deleted unless they
    /// appear in another written column.
    async fn write_columns(
        &self,
        project_id: Uuid,
        columns: &[ColumnWrite],
        removed: &[Uuid],
    ) -> Result<(), StorageError>;

    /// Append a message to its room log.
    async fn insert_message(&self, message: &Message) -> Result<(), StorageError>;

    /// Room log in arrival order.
    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, StorageError>;

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StorageError>;

    /// Hard delete. Returns `false` if the message was already gone.
    async fn delete_message(&self, message_id: Uuid) -> Result<bool, StorageError>;
}
