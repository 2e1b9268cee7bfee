//! Chat session model and DTOs.

use chrono::{DateTime, Utc};
use parley_core::chat::StoredMessage;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A conversation session row from the `chat_sessions` table.
///
/// Messages live in a JSONB column so the message list can be appended to
/// atomically without read-modify-write cycles.
#[derive(Debug, Clone, FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    /// Identity-provider subject of the owning user.
    pub owner_id: String,
    pub title: String,
    /// Last model reference used in this session, if any.
    pub model: Option<String>,
    pub messages: Json<Vec<StoredMessage>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Number of messages currently embedded in the session.
    pub fn message_count(&self) -> usize {
        self.messages.0.len()
    }
}

/// DTO for creating a new chat session.
pub struct CreateChatSession {
    pub owner_id: String,
    pub title: String,
    pub model: Option<String>,
}
