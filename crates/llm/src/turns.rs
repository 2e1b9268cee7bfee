//! Transformation of conversation history into the Gemini wire format.
//!
//! Assistant turns are relabeled to the provider's `model` role. Attachments
//! on the most recent user turn are resolved to inline base64 content; a
//! failed download degrades to a placeholder note. Attachments on earlier
//! turns are summarized as a file-name note so large payloads are not
//! re-sent on every turn.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parley_core::chat::{AttachmentRef, ChatMessage, ChatRole};
use parley_storage::FileStore;
use serde::{Deserialize, Serialize};

/// Fixed system instruction sent with every chat completion.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant. Answer clearly and concisely, using markdown \
     formatting where it aids readability.";

/// Prompt substituted when the latest user turn carries attachments but no text.
pub const DEFAULT_ATTACHMENT_PROMPT: &str = "Describe the attached file(s).";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded file content.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: String, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type,
                data: BASE64.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub system_instruction: SystemInstruction,
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            system_instruction: SystemInstruction {
                parts: vec![Part::text(SYSTEM_INSTRUCTION)],
            },
            contents,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if any is present.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ---------------------------------------------------------------------------
// History transformation
// ---------------------------------------------------------------------------

fn provider_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

/// Short note standing in for attachments on historical turns.
fn attachment_note(attachments: &[AttachmentRef]) -> String {
    let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
    format!("[Attached files: {}]", names.join(", "))
}

/// Transform the conversation history into Gemini `contents`.
///
/// Only the most recent user turn has its attachments downloaded; a failed
/// download becomes a placeholder note rather than failing the whole turn.
pub async fn build_contents(messages: &[ChatMessage], store: &dyn FileStore) -> Vec<Content> {
    let last_user_index = messages
        .iter()
        .rposition(|m| m.role == ChatRole::User);

    let mut contents = Vec::with_capacity(messages.len());
    for (index, message) in messages.iter().enumerate() {
        let mut parts = Vec::new();
        let trimmed = message.content.trim();
        if !trimmed.is_empty() {
            parts.push(Part::text(message.content.clone()));
        }

        if let Some(attachments) = message.attachments.as_deref() {
            if !attachments.is_empty() {
                if Some(index) == last_user_index {
                    for attachment in attachments {
                        match store.download_to_buffer(&attachment.file_id).await {
                            Ok(bytes) => {
                                parts.push(Part::inline(attachment.mime_type.clone(), &bytes));
                            }
                            Err(e) => {
                                tracing::warn!(
                                    file_id = %attachment.file_id,
                                    error = %e,
                                    "Attachment download failed; degrading to placeholder"
                                );
                                parts.push(Part::text(format!(
                                    "[Attachment unavailable: {}]",
                                    attachment.name
                                )));
                            }
                        }
                    }
                    if trimmed.is_empty() {
                        parts.push(Part::text(DEFAULT_ATTACHMENT_PROMPT));
                    }
                } else {
                    parts.push(Part::text(attachment_note(attachments)));
                }
            }
        }

        if parts.is_empty() {
            // Nothing to say on this turn; the provider rejects empty parts.
            continue;
        }
        contents.push(Content {
            role: provider_role(message.role).to_string(),
            parts,
        });
    }
    contents
}
