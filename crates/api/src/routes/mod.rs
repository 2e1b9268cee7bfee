pub mod chat;
pub mod health;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::middleware::auth::auth_gate;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /chat/stream   POST   streaming chat completion (auth required)
/// ```
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/chat",
        chat::router().route_layer(from_fn_with_state(state, auth_gate)),
    )
}
