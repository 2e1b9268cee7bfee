//! Chat message types shared by the API surface, the persistence layer,
//! and the upstream model client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to a session before the first exchange has been summarized.
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// Who authored a message. Closed set -- anything else is a wire error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Reference to a previously uploaded file.
///
/// The chat core never owns file bytes; it holds the opaque storage id plus
/// the client-declared metadata, and downloads content on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    /// Opaque id understood by the object-storage collaborator.
    pub file_id: String,
    /// Declared MIME type (e.g. `image/png`).
    pub mime_type: String,
    /// Declared file name, used in degraded-mode placeholder notes.
    pub name: String,
    /// Declared size in bytes, if the client supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// One turn of a conversation as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentRef>>,
}

/// One turn of a conversation as embedded in a persisted session.
///
/// Identical to [`ChatMessage`] plus server-side timestamp and optional
/// metadata (e.g. linkage to a generated document). Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Build a persisted message from a wire message, stamped now.
    pub fn from_wire(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            attachments: message.attachments.clone(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Build an assistant message from accumulated streamed text.
    pub fn assistant(content: String) -> Self {
        Self {
            role: ChatRole::Assistant,
            content,
            attachments: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}
