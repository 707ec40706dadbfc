//! Postgres-backed storage.

use async_trait::async_trait;
use frames::{Actor, Card, CardStatus, Column, Message};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{ColumnWrite, Storage, StorageError};

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connect, apply embedded migrations, and wrap the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl Storage for PgStorage {
    async fn actor_for_token(&self, token: &str) -> Result<Option<Actor>, StorageError> {
        let row = sqlx::query(
            "SELECT u.id, u.display_name
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Actor { id: r.get("id"), display_name: r.get("display_name") }))
    }

    async fn can_access(&self, project_id: Uuid, actor_id: Uuid) -> Result<bool, StorageError> {
        let allowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1
                FROM projects p
                WHERE p.id = $1
                  AND (p.owner_id = $2
                       OR EXISTS(SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = $2))
            )",
        )
        .bind(project_id)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed)
    }

    async fn load_columns(&self, project_id: Uuid) -> Result<Vec<Column>, StorageError> {
        let column_rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, title FROM board_columns WHERE project_id = $1 ORDER BY position ASC, id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let card_rows = sqlx::query_as::<_, (Uuid, Uuid, String, serde_json::Value, String)>(
            "SELECT c.id, c.column_id, c.member, c.tasks, c.status
             FROM cards c
             JOIN board_columns bc ON bc.id = c.column_id
             WHERE bc.project_id = $1
             ORDER BY c.column_id, c.position ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut columns: Vec<Column> = column_rows
            .into_iter()
            .map(|(id, title)| Column { id, project_id, title, cards: Vec::new() })
            .collect();

        for (id, column_id, member, tasks, status) in card_rows {
            let tasks: Vec<String> =
                serde_json::from_value(tasks).map_err(|e| StorageError::Corrupt(format!("card {id} tasks: {e}")))?;
            let Some(column) = columns.iter_mut().find(|c| c.id == column_id) else {
                continue;
            };
            column.cards.push(Card { id, member, tasks, status: CardStatus::parse(&status) });
        }

        Ok(columns)
    }

    async fn project_of_column(&self, column_id: Uuid) -> Result<Option<Uuid>, StorageError> {
        let project_id = sqlx::query_scalar::<_, Uuid>("SELECT project_id FROM board_columns WHERE id = $1")
            .bind(column_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project_id)
    }

    async fn write_columns(
        &self,
        project_id: Uuid,
        columns: &[ColumnWrite],
        removed: &[Uuid],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        // PHASE: UPSERT EVERY WRITTEN COLUMN AND CARD
        // WHY: cards moved between two written columns must be reassigned
        // before orphan cleanup runs for either side.
        for (position, column) in columns {
            sqlx::query(
                "INSERT INTO board_columns (id, project_id, title, position) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, position = EXCLUDED.position",
            )
            .bind(column.id)
            .bind(project_id)
            .bind(&column.title)
            .bind(to_i32(*position))
            .execute(tx.as_mut())
            .await?;

            for (index, card) in column.cards.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO cards (id, column_id, member, tasks, status, position) VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (id) DO UPDATE SET
                         column_id = EXCLUDED.column_id, member = EXCLUDED.member, tasks = EXCLUDED.tasks,
                         status = EXCLUDED.status, position = EXCLUDED.position",
                )
                .bind(card.id)
                .bind(column.id)
                .bind(&card.member)
                .bind(serde_json::json!(card.tasks))
                .bind(card.status.as_str())
                .bind(to_i32(index))
                .execute(tx.as_mut())
                .await?;
            }
        }

        // PHASE: DROP ORPHANED CARDS AND REMOVED COLUMNS
        for (_, column) in columns {
            sqlx::query("DELETE FROM cards WHERE column_id = $1 AND NOT (id = ANY($2))")
                .bind(column.id)
                .bind(column.card_ids())
                .execute(tx.as_mut())
                .await?;
        }
        if !removed.is_empty() {
            sqlx::query("DELETE FROM board_columns WHERE project_id = $1 AND id = ANY($2)")
                .bind(project_id)
                .bind(removed)
                .execute(tx.as_mut())
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO messages (id, room_id, sender_id, text, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(message.id)
            .bind(message.room_id)
            .bind(message.sender_id)
            .bind(&message.text)
            .bind(message.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, StorageError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, i64)>(
            "SELECT id, room_id, sender_id, text, created_at FROM messages WHERE room_id = $1 ORDER BY seq ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, room_id, sender_id, text, created_at)| Message { id, room_id, sender_id, text, created_at })
            .collect())
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StorageError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, i64)>(
            "SELECT id, room_id, sender_id, text, created_at FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, room_id, sender_id, text, created_at)| Message { id, room_id, sender_id, text, created_at }))
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
