//! Integration tests for the authentication middleware: verification,
//! transparent refresh, cookie rotation, and rejection paths.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{
    assert_error_code, build_test_app, pair, post_json_auth, post_json_cookie, ScriptedChat,
    Segment, StubTokens,
};

fn chat_body() -> serde_json::Value {
    json!({ "messages": [{ "role": "user", "content": "hello" }] })
}

fn scripted_chat() -> Arc<ScriptedChat> {
    Arc::new(ScriptedChat::new(vec![Segment::Chunk("Hi".to_string())]))
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn valid_bearer_token_passes_without_refresh(pool: PgPool) {
    let tokens = Arc::new(StubTokens::new().with_valid("tok-valid", "user-1"));
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let response = post_json_auth(app, "/api/v1/chat/stream", chat_body(), Some("tok-valid")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(tokens.verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn access_cookie_authenticates(pool: PgPool) {
    let tokens = Arc::new(StubTokens::new().with_valid("tok-valid", "user-1"));
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let response = post_json_cookie(
        app,
        "/api/v1/chat/stream",
        chat_body(),
        "parley_access=tok-valid",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_token_with_refresh_cookie_rotates_pair(pool: PgPool) {
    let tokens = Arc::new(
        StubTokens::new()
            .with_expired("tok-expired")
            .with_valid("tok-new", "user-1")
            .with_refresh("rt-1", pair("tok-new", "rt-2")),
    );
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/chat/stream")
        .header("content-type", "application/json")
        .header("authorization", "Bearer tok-expired")
        .header("cookie", "parley_refresh=rt-1")
        .body(axum::body::Body::from(chat_body().to_string()))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 1);
    // Expired access then new access are both verified.
    assert_eq!(tokens.verify_calls.load(Ordering::SeqCst), 2);

    let cookies: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("parley_access=tok-new")));
    assert!(cookies.iter().any(|c| c.starts_with("parley_refresh=rt-2")));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_cookie_alone_authenticates(pool: PgPool) {
    let tokens = Arc::new(
        StubTokens::new()
            .with_valid("tok-new", "user-1")
            .with_refresh("rt-1", pair("tok-new", "rt-2")),
    );
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let response = post_json_cookie(
        app,
        "/api/v1/chat/stream",
        chat_body(),
        "parley_refresh=rt-1",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 1);
    let cookies: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_credentials_rejected_before_any_provider_call(pool: PgPool) {
    let chat = scripted_chat();
    let tokens = Arc::new(StubTokens::new());
    let app = build_test_app(pool, chat.clone(), tokens.clone());

    let response = post_json_auth(app, "/api/v1/chat/stream", chat_body(), None).await;

    assert_error_code(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(tokens.verify_calls.load(Ordering::SeqCst), 0);
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(chat.stream_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_token_rejected(pool: PgPool) {
    let tokens = Arc::new(StubTokens::new().with_valid("tok-valid", "user-1"));
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let response = post_json_auth(app, "/api/v1/chat/stream", chat_body(), Some("garbage")).await;

    assert_error_code(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_token_without_refresh_rejected(pool: PgPool) {
    let tokens = Arc::new(StubTokens::new().with_expired("tok-expired"));
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let response =
        post_json_auth(app, "/api/v1/chat/stream", chat_body(), Some("tok-expired")).await;

    assert_error_code(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_refresh_exchange_rejected(pool: PgPool) {
    let tokens = Arc::new(StubTokens::new());
    let app = build_test_app(pool, scripted_chat(), tokens.clone());

    let response = post_json_cookie(
        app,
        "/api/v1/chat/stream",
        chat_body(),
        "parley_refresh=rt-unknown",
    )
    .await;

    assert_error_code(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
    assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 1);
}
