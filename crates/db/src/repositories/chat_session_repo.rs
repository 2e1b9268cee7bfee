//! Repository for the `chat_sessions` table.
//!
//! Every read and write is scoped by `(id, owner_id)`. A session belonging
//! to another owner is indistinguishable from a nonexistent one at this
//! layer -- both come back as `None` / zero rows affected.

use parley_core::chat::StoredMessage;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::chat_session::{ChatSession, CreateChatSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, title, model, messages, created_at, updated_at";

/// Provides CRUD operations for chat sessions.
pub struct ChatSessionRepo;

impl ChatSessionRepo {
    /// Insert a new session with an empty message list, returning the row.
    ///
    /// Session ids are UUIDv7 so they sort by creation time.
    pub async fn create(
        pool: &PgPool,
        input: &CreateChatSession,
    ) -> Result<ChatSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_sessions (id, owner_id, title, model)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatSession>(&query)
            .bind(Uuid::now_v7())
            .bind(&input.owner_id)
            .bind(&input.title)
            .bind(&input.model)
            .fetch_one(pool)
            .await
    }

    /// Find a session by id, scoped to its owner.
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<ChatSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_sessions
             WHERE id = $1 AND owner_id = $2"
        );
        sqlx::query_as::<_, ChatSession>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Append one message to the session's message list.
    ///
    /// The append is a single atomic JSONB concatenation; concurrent appends
    /// from two requests interleave without corrupting the array. Returns
    /// `true` if the row was updated.
    pub async fn append_message(
        pool: &PgPool,
        id: Uuid,
        owner_id: &str,
        message: &StoredMessage,
    ) -> Result<bool, sqlx::Error> {
        let payload = serde_json::to_value(message)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let result = sqlx::query(
            "UPDATE chat_sessions
             SET messages = messages || jsonb_build_array($3::jsonb),
                 updated_at = NOW()
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(payload)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the session's model reference. Returns `true` on update.
    pub async fn update_model(
        pool: &PgPool,
        id: Uuid,
        owner_id: &str,
        model: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET model = $3, updated_at = NOW()
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(model)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the session title. Returns `true` on update.
    pub async fn update_title(
        pool: &PgPool,
        id: Uuid,
        owner_id: &str,
        title: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET title = $3, updated_at = NOW()
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(title)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
