//! Best-effort session title generation.
//!
//! Runs fire-and-forget after the first exchange, so it must never surface
//! an error: any upstream failure or unusable result falls back to
//! truncating the first user message.

use parley_core::catalog::UTILITY_MODEL;
use parley_core::chat::{ChatMessage, ChatRole, PLACEHOLDER_TITLE};

use crate::client::ChatClient;

const TITLE_SYSTEM: &str = "You generate very short titles for chat conversations.";

/// Word budget given to the model.
const TITLE_WORD_LIMIT: usize = 6;

/// A generated title longer than this is rejected in favor of truncation.
const TITLE_MAX_CHARS: usize = 80;

/// Character budget for the truncation fallback.
const TRUNCATE_BUDGET: usize = 40;

/// Summarize the first exchange into a short title.
///
/// Requires at least one non-empty user message, else returns the fixed
/// placeholder. Never returns an error.
pub async fn generate(client: &dyn ChatClient, messages: &[ChatMessage]) -> String {
    let first_user = messages
        .iter()
        .find(|m| m.role == ChatRole::User && !m.content.trim().is_empty());
    let Some(first_user) = first_user else {
        return PLACEHOLDER_TITLE.to_string();
    };

    let prompt = format!(
        "Summarize the following conversation opening as a title of at most \
         {TITLE_WORD_LIMIT} words. Reply with the title only, no quotes.\n\n{}",
        transcript(messages)
    );

    match client.complete(UTILITY_MODEL, TITLE_SYSTEM, &prompt).await {
        Ok(raw) => {
            let title = raw.trim().trim_matches('"').trim().to_string();
            if !title.is_empty() && title.chars().count() <= TITLE_MAX_CHARS {
                return title;
            }
            tracing::debug!(len = title.chars().count(), "Generated title unusable; truncating");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Title generation failed; truncating");
        }
    }

    truncate(&first_user.content)
}

/// First exchange rendered as a short transcript for the summarization call.
fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .take(2)
        .map(|m| {
            let speaker = match m.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to the character budget, appending an ellipsis when cut.
fn truncate(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= TRUNCATE_BUDGET {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(TRUNCATE_BUDGET).collect();
    format!("{}...", cut.trim_end())
}
