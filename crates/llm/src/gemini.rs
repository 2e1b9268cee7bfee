//! Streaming client for the Google Gemini API.
//!
//! Uses the SSE variant of `streamGenerateContent`: the response body is a
//! sequence of `data:` lines, each carrying one JSON chunk with candidate
//! parts. The client buffers bytes into lines, extracts candidate text, and
//! yields only non-empty fragments.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::chat::ChatMessage;
use parley_storage::FileStore;

use crate::client::{ChatClient, FragmentStream};
use crate::keyring::KeyRing;
use crate::turns::{self, GenerateRequest, GenerateResponse};
use crate::LlmError;

/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The one provider this client implements.
const PROVIDER_ID: &str = "google";

/// Client for the Gemini generative-language API.
pub struct GeminiClient {
    http: reqwest::Client,
    keys: Arc<KeyRing>,
    store: Arc<dyn FileStore>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(keys: Arc<KeyRing>, store: Arc<dyn FileStore>) -> Self {
        Self::with_base_url(keys, store, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        keys: Arc<KeyRing>,
        store: Arc<dyn FileStore>,
        base_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            keys,
            store,
            base_url,
        }
    }

    async fn post_generate(
        &self,
        model_id: &str,
        verb: &str,
        query: &str,
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let key = self.keys.next()?.to_string();
        let url = format!("{}/models/{}:{}{}", self.base_url, model_id, verb, query);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream(format!(
                "HTTP {status} from upstream: {body}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn stream_chat(
        &self,
        provider_id: &str,
        model_id: &str,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, LlmError> {
        if provider_id != PROVIDER_ID {
            return Err(LlmError::UnsupportedProvider(provider_id.to_string()));
        }

        let contents = turns::build_contents(messages, self.store.as_ref()).await;
        let request = GenerateRequest::new(contents);

        let response = self
            .post_generate(model_id, "streamGenerateContent", "?alt=sse", &request)
            .await?;

        tracing::debug!(model_id, "Upstream stream opened");

        let state = PumpState {
            inner: response.bytes_stream(),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(fragment) = st.pending.pop_front() {
                    return Some((Ok(fragment), st));
                }
                if st.done {
                    return None;
                }
                match st.inner.next().await {
                    Some(Ok(bytes)) => st.decoder.push_chunk(&bytes, &mut st.pending),
                    Some(Err(e)) => {
                        st.done = true;
                        return Some((Err(LlmError::Upstream(e.to_string())), st));
                    }
                    None => {
                        st.decoder.finish(&mut st.pending);
                        st.done = true;
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn complete(
        &self,
        model_id: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let request = GenerateRequest {
            system_instruction: turns::SystemInstruction {
                parts: vec![turns::Part::text(system)],
            },
            contents: vec![turns::Content {
                role: "user".to_string(),
                parts: vec![turns::Part::text(prompt)],
            }],
        };

        let response = self
            .post_generate(model_id, "generateContent", "", &request)
            .await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        body.text()
            .ok_or_else(|| LlmError::Upstream("Upstream returned no text".into()))
    }
}

/// Pull-side state for the fragment stream.
struct PumpState<S> {
    inner: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Incremental `data:`-line decoder over the upstream byte stream.
#[derive(Default)]
struct SseDecoder {
    buf: String,
}

impl SseDecoder {
    /// Feed one chunk of bytes; completed fragments land in `out`.
    fn push_chunk(&mut self, chunk: &[u8], out: &mut VecDeque<String>) {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            if let Some(fragment) = parse_sse_line(line.trim_end()) {
                out.push_back(fragment);
            }
        }
    }

    /// Flush a trailing line that arrived without a newline terminator.
    fn finish(&mut self, out: &mut VecDeque<String>) {
        let line = std::mem::take(&mut self.buf);
        if let Some(fragment) = parse_sse_line(line.trim_end()) {
            out.push_back(fragment);
        }
    }
}

/// Extract the text fragment from one SSE line, if it carries any.
///
/// Non-`data:` lines, empty payloads, `[DONE]` sentinels, unparsable JSON,
/// and chunks without candidate text all yield `None`.
fn parse_sse_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    let response: GenerateResponse = match serde_json::from_str(payload) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "Dropping unparsable upstream chunk");
            return None;
        }
    };
    response.text()
}
