//! Shared integration-test harness: scripted collaborator fakes, the app
//! builder, and request/body helpers.
//!
//! The identity provider and the upstream model client are both trait-based
//! collaborators, so tests script them instead of standing up servers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use parley_api::auth::service::{AuthError, Claims, TokenPair, TokenService};
use parley_api::config::{LlmConfig, OidcConfig, ServerConfig};
use parley_api::router::build_app_router;
use parley_api::state::AppState;
use parley_core::chat::ChatMessage;
use parley_llm::{ChatClient, FragmentStream, LlmError};
use sqlx::PgPool;
use tokio::sync::Notify;
use tower::ServiceExt;

/// Issuer used by the stub token service.
pub const TEST_ISSUER: &str = "https://id.test/realms/parley";

// ---------------------------------------------------------------------------
// Scripted upstream model client
// ---------------------------------------------------------------------------

/// One step of a scripted fragment stream.
#[derive(Clone)]
pub enum Segment {
    /// Yield a text fragment.
    Chunk(String),
    /// Yield an upstream failure (ends the stream).
    Fail(String),
    /// Park until the test signals the notify handle.
    WaitFor(Arc<Notify>),
}

/// Chat client that replays a fixed segment script per stream call.
pub struct ScriptedChat {
    segments: Vec<Segment>,
    title: String,
    pub stream_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
}

impl ScriptedChat {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            title: "Scripted Title".to_string(),
            stream_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn stream_chat(
        &self,
        _provider_id: &str,
        _model_id: &str,
        _messages: &[ChatMessage],
    ) -> Result<FragmentStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let queue: VecDeque<Segment> = self.segments.clone().into();
        let stream = futures::stream::unfold(queue, |mut queue| async move {
            loop {
                match queue.pop_front()? {
                    Segment::Chunk(text) => return Some((Ok(text), queue)),
                    Segment::Fail(message) => {
                        queue.clear();
                        return Some((Err(LlmError::Upstream(message)), queue));
                    }
                    Segment::WaitFor(gate) => gate.notified().await,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn complete(
        &self,
        _model_id: &str,
        _system: &str,
        _prompt: &str,
    ) -> Result<String, LlmError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.title.clone())
    }
}

// ---------------------------------------------------------------------------
// Stub identity provider
// ---------------------------------------------------------------------------

/// Token service with scripted verification and refresh outcomes, plus
/// call counters for asserting the auth-gate state machine.
#[derive(Default)]
pub struct StubTokens {
    valid: HashMap<String, String>,
    expired: HashSet<String>,
    refreshable: HashMap<String, TokenPair>,
    pub verify_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl StubTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as valid for the given subject.
    pub fn with_valid(mut self, token: &str, subject: &str) -> Self {
        self.valid.insert(token.to_string(), subject.to_string());
        self
    }

    /// Register `token` as structurally valid but expired.
    pub fn with_expired(mut self, token: &str) -> Self {
        self.expired.insert(token.to_string());
        self
    }

    /// Register a refresh token exchangeable for a new pair.
    pub fn with_refresh(mut self, refresh_token: &str, pair: TokenPair) -> Self {
        self.refreshable.insert(refresh_token.to_string(), pair);
        self
    }
}

/// Build a token pair whose access token should itself be registered valid.
pub fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: 900,
    }
}

#[async_trait]
impl TokenService for StubTokens {
    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(subject) = self.valid.get(access_token) {
            return Ok(Claims {
                sub: subject.clone(),
                email: Some(format!("{subject}@test.com")),
                given_name: Some("Test".to_string()),
                family_name: Some("User".to_string()),
                iss: TEST_ISSUER.to_string(),
                exp: chrono::Utc::now().timestamp() + 900,
            });
        }
        if self.expired.contains(access_token) {
            return Err(AuthError::Expired);
        }
        Err(AuthError::Invalid)
    }

    async fn refresh(&self, refresh_token: &str) -> Option<TokenPair> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshable.get(refresh_token).cloned()
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// Error detail exposure is on, matching development mode, so stream error
/// events carry the underlying message.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        expose_error_details: true,
        oidc: OidcConfig {
            issuer_url: TEST_ISSUER.to_string(),
            client_id: "parley-backend".to_string(),
            client_secret: "test-secret".to_string(),
        },
        llm: LlmConfig {
            api_keys: vec!["test-key".to_string()],
            base_url: "http://127.0.0.1:1/v1beta".to_string(),
        },
        storage_bucket: "test-bucket".to_string(),
    }
}

/// Build the full application router with all middleware layers, using the
/// given pool and scripted collaborators.
pub fn build_test_app(
    pool: PgPool,
    chat_client: Arc<dyn ChatClient>,
    token_service: Arc<dyn TokenService>,
) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        token_service,
        chat_client,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request / response helpers
// ---------------------------------------------------------------------------

/// POST a JSON body, optionally with a bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body with a `Cookie` header instead of a bearer token.
pub async fn post_json_cookie(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    cookie: &str,
) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("cookie", cookie)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET a path with no auth.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Drain an SSE response body and return the `data:` payloads in order.
pub async fn read_sse_data(response: Response) -> Vec<String> {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    parse_sse_data(&String::from_utf8_lossy(&bytes))
}

/// Extract `data:` payloads from a raw event-stream transcript.
pub fn parse_sse_data(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|payload| payload.trim().to_string())
        .collect()
}

/// Assert a response is the standard JSON error shape with this code.
pub async fn assert_error_code(response: Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected error body: {json}");
}

/// Poll a condition until it holds or a 3-second budget elapses.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..120 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
