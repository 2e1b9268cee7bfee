use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley_api::auth::KeycloakTokenService;
use parley_api::config::ServerConfig;
use parley_api::router::build_app_router;
use parley_api::state::AppState;
use parley_llm::{GeminiClient, KeyRing};
use parley_storage::S3FileStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = parley_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    parley_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    parley_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let token_service = Arc::new(KeycloakTokenService::new(config.oidc.clone()));

    let file_store = Arc::new(S3FileStore::from_env(config.storage_bucket.clone()).await);
    tracing::info!(bucket = %config.storage_bucket, "Object storage client ready");

    let key_ring = Arc::new(KeyRing::new(config.llm.api_keys.clone()));
    if key_ring.is_empty() {
        tracing::warn!("No upstream API keys configured; chat calls will fail");
    }
    let chat_client = Arc::new(GeminiClient::with_base_url(
        key_ring,
        file_store,
        config.llm.base_url.clone(),
    ));

    // --- App state & router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        token_service,
        chat_client,
    };
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
