//! Route definitions for the `/chat` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chat`.
///
/// ```text
/// POST /stream -> streaming chat completion
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/stream", post(chat::stream))
}
