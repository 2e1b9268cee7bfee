//! Integration tests for the health endpoint and baseline router behavior.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use sqlx::PgPool;

use common::{body_json, build_test_app, get, ScriptedChat, StubTokens};

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_ok_with_reachable_database(pool: PgPool) {
    let app = build_test_app(
        pool,
        Arc::new(ScriptedChat::new(vec![])),
        Arc::new(StubTokens::new()),
    );

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_is_not_behind_the_auth_gate(pool: PgPool) {
    let app = build_test_app(
        pool,
        Arc::new(ScriptedChat::new(vec![])),
        Arc::new(StubTokens::new()),
    );

    // No credentials at all; the route must still answer.
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_route_returns_404(pool: PgPool) {
    let app = build_test_app(
        pool,
        Arc::new(ScriptedChat::new(vec![])),
        Arc::new(StubTokens::new()),
    );

    let response = get(app, "/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn responses_carry_a_request_id(pool: PgPool) {
    let app = build_test_app(
        pool,
        Arc::new(ScriptedChat::new(vec![])),
        Arc::new(StubTokens::new()),
    );

    let response = get(app, "/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}
