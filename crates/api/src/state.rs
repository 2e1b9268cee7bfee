use std::sync::Arc;

use parley_llm::ChatClient;

use crate::auth::service::TokenService;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: parley_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Identity-provider collaborator (token verification and refresh).
    pub token_service: Arc<dyn TokenService>,
    /// Upstream model client.
    pub chat_client: Arc<dyn ChatClient>,
}
