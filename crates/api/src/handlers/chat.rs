//! The streaming chat endpoint.
//!
//! Persistence is split around the stream on purpose: the user's message is
//! written before the first byte is streamed, and the assistant's message is
//! written after the stream terminates -- whatever the termination cause. A
//! crash mid-stream loses at most the assistant's reply, never the user's
//! input, and a disconnect still yields a usable partial transcript.
//!
//! Wire protocol: `text/event-stream`. The first event carries
//! `{"sessionId"}`, subsequent events carry `{"chunk"}` or `{"error"}`, and
//! the stream ends with a literal `[DONE]` sentinel (omitted if the client
//! disconnected first).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use parley_core::catalog;
use parley_core::chat::{ChatMessage, ChatRole, StoredMessage, PLACEHOLDER_TITLE};
use parley_core::error::CoreError;
use parley_db::models::chat_session::CreateChatSession;
use parley_db::repositories::ChatSessionRepo;
use parley_db::DbPool;
use parley_llm::{ChatClient, FragmentStream, LlmError};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /api/v1/chat/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    /// Full conversation history; the last entry must be the user's turn.
    pub messages: Vec<ChatMessage>,
    /// Optional model reference (`provider/model` or bare model id).
    #[serde(default)]
    pub model: Option<String>,
    /// Existing session to append to; a new session is created when absent.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

/// POST /api/v1/chat/stream
///
/// Streams a model response as server-sent events while keeping the
/// persisted session consistent with whatever the client actually saw.
pub async fn stream(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ChatStreamRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // 1. Validate the history shape.
    let latest = input
        .messages
        .last()
        .ok_or_else(|| AppError::Core(CoreError::Validation("messages must not be empty".into())))?;
    if latest.role != ChatRole::User {
        return Err(AppError::Core(CoreError::Validation(
            "last message must be from the user".into(),
        )));
    }

    // 2. Resolve the model reference; unknown references never reach streaming.
    let model_ref = catalog::resolve(input.model.as_deref()).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown model: {}",
            input.model.as_deref().unwrap_or_default()
        )))
    })?;
    let model_name = format!("{}/{}", model_ref.provider_id, model_ref.model_id);

    // 3. Resolve or lazily create the session, scoped to the caller.
    let (session, created) = match input.session_id {
        Some(id) => {
            let session = ChatSessionRepo::find_by_id_and_owner(&state.pool, id, &user.subject)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::NotFound {
                        entity: "ChatSession",
                        id: id.to_string(),
                    })
                })?;
            (session, false)
        }
        None => {
            let create = CreateChatSession {
                owner_id: user.subject.clone(),
                title: PLACEHOLDER_TITLE.to_string(),
                model: Some(model_name.clone()),
            };
            (ChatSessionRepo::create(&state.pool, &create).await?, true)
        }
    };

    // 4. Persist the user's message before any streaming begins, so the
    //    input survives even if the model call fails. A freshly created
    //    session already carries the model reference.
    let user_message = StoredMessage::from_wire(latest);
    let appended =
        ChatSessionRepo::append_message(&state.pool, session.id, &user.subject, &user_message)
            .await?;
    if !appended {
        tracing::warn!(session_id = %session.id, "Session vanished before user write");
    }
    if !created {
        let updated =
            ChatSessionRepo::update_model(&state.pool, session.id, &user.subject, &model_name)
                .await?;
        if !updated {
            tracing::warn!(session_id = %session.id, "Session vanished before model update");
        }
    }
    let count_after_user = session.message_count() + 1;

    // 5. Open the upstream stream. Failures here are still ordinary HTTP
    //    errors; nothing has been written to the response yet.
    let fragments = state
        .chat_client
        .stream_chat(&model_ref.provider_id, &model_ref.model_id, &input.messages)
        .await?;

    // 6. Hand the stream to a pump task. The response only polls a channel,
    //    so a client disconnect surfaces to the pump as a failed send.
    let (tx, rx) = mpsc::channel::<Event>(32);
    let pump = StreamPump {
        pool: state.pool.clone(),
        chat_client: Arc::clone(&state.chat_client),
        session_id: session.id,
        owner_id: user.subject.clone(),
        latest_user: latest.clone(),
        title_pending: session.title == PLACEHOLDER_TITLE,
        count_after_user,
        expose_error_details: state.config.expose_error_details,
    };
    tokio::spawn(pump.run(fragments, tx));

    Ok(Sse::new(ReceiverStream::new(rx).map(Ok::<_, Infallible>)))
}

/// Terminal sentinel written after a completed or error-terminated stream.
const DONE_SENTINEL: &str = "[DONE]";

/// State owned by the spawned streaming task.
struct StreamPump {
    pool: DbPool,
    chat_client: Arc<dyn ChatClient>,
    session_id: Uuid,
    owner_id: String,
    /// The user's latest turn, kept for title generation.
    latest_user: ChatMessage,
    /// Whether the session title is still the placeholder.
    title_pending: bool,
    /// Message count after the pre-stream user append.
    count_after_user: usize,
    expose_error_details: bool,
}

impl StreamPump {
    /// Consume the fragment stream, forward events, then persist.
    ///
    /// Runs detached from the request: all failures are logged, never
    /// surfaced, because no request is waiting on the post-stream writes.
    async fn run(self, mut fragments: FragmentStream, tx: mpsc::Sender<Event>) {
        let mut buffer = String::new();
        let mut aborted = false;

        let first = sse_json(&json!({ "sessionId": self.session_id }));
        if tx.send(first).await.is_err() {
            aborted = true;
        }

        while !aborted {
            match fragments.next().await {
                Some(Ok(chunk)) => {
                    if tx.send(sse_json(&json!({ "chunk": chunk }))).await.is_err() {
                        // Client gone: stop emitting and stop accumulating,
                        // but keep what was already delivered.
                        aborted = true;
                        break;
                    }
                    buffer.push_str(&chunk);
                }
                Some(Err(e)) => {
                    // Headers are committed; the failure goes in-band,
                    // followed by the same sentinel as a success.
                    tracing::error!(
                        session_id = %self.session_id,
                        error = %e,
                        "Upstream stream failed mid-flight"
                    );
                    let message = if self.expose_error_details {
                        // Surface the upstream reason itself, not the
                        // wrapped display string.
                        match e {
                            LlmError::Upstream(reason) => reason,
                            other => other.to_string(),
                        }
                    } else {
                        "The model call failed.".to_string()
                    };
                    let _ = tx.send(sse_json(&json!({ "error": message }))).await;
                    break;
                }
                None => break,
            }
        }
        // Drop the upstream stream promptly; for an aborted request this
        // closes the provider connection instead of draining it.
        drop(fragments);

        if !aborted {
            let _ = tx.send(Event::default().data(DONE_SENTINEL)).await;
        }

        self.persist_assistant(buffer).await;
    }

    /// Append the accumulated assistant message (if any) and kick off
    /// title generation on the first completed exchange.
    async fn persist_assistant(&self, buffer: String) {
        if buffer.is_empty() {
            return;
        }

        let assistant = StoredMessage::assistant(buffer.clone());
        match ChatSessionRepo::append_message(&self.pool, self.session_id, &self.owner_id, &assistant)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(session_id = %self.session_id, "Session vanished before assistant write");
                return;
            }
            Err(e) => {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to persist assistant message"
                );
                return;
            }
        }

        if self.title_pending && self.count_after_user + 1 == 2 {
            let pool = self.pool.clone();
            let client = Arc::clone(&self.chat_client);
            let session_id = self.session_id;
            let owner_id = self.owner_id.clone();
            let exchange = vec![
                self.latest_user.clone(),
                ChatMessage {
                    role: ChatRole::Assistant,
                    content: buffer,
                    attachments: None,
                },
            ];
            tokio::spawn(async move {
                let title = parley_llm::title::generate(client.as_ref(), &exchange).await;
                if let Err(e) =
                    ChatSessionRepo::update_title(&pool, session_id, &owner_id, &title).await
                {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to persist generated title"
                    );
                }
            });
        }
    }
}

/// Build an SSE event from a JSON payload.
fn sse_json(value: &serde_json::Value) -> Event {
    Event::default().data(value.to_string())
}
