//! Upstream model client: streaming chat completion against the Google
//! Gemini API, API-key rotation, attachment resolution, and best-effort
//! title generation.

pub mod client;
pub mod gemini;
pub mod keyring;
pub mod title;
pub mod turns;

pub use client::{ChatClient, FragmentStream};
pub use gemini::GeminiClient;
pub use keyring::KeyRing;

/// Errors from the upstream model client.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The resolved provider has no implementation. Hard failure, no retry.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The upstream API key list is empty. Configuration error.
    #[error("No upstream API keys configured")]
    NoApiKeys,

    /// The model call itself failed (network, HTTP status, malformed body).
    #[error("Upstream model call failed: {0}")]
    Upstream(String),
}
