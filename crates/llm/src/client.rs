//! The upstream model provider as a collaborator trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use parley_core::chat::ChatMessage;

use crate::LlmError;

/// Lazy sequence of generated text fragments.
///
/// Finite and not restartable. A failure while consuming the upstream
/// stream is delivered as one `Err` item after any fragments already
/// yielded; the stream ends after that. Cancellation is the consumer
/// dropping the stream, which closes the underlying HTTP response body.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Client for the hosted model API.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Start a streaming chat completion for the given conversation.
    ///
    /// Fails immediately for unsupported providers or an empty key list;
    /// failures after the stream is open arrive in-band as `Err` items.
    async fn stream_chat(
        &self,
        provider_id: &str,
        model_id: &str,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, LlmError>;

    /// One-shot, non-streaming completion. Used for short utility calls
    /// such as title generation.
    async fn complete(
        &self,
        model_id: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, LlmError>;
}
