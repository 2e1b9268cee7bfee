/// Server configuration loaded from environment variables.
///
/// All fields except the OIDC settings have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Whether error responses carry underlying detail (development only).
    pub expose_error_details: bool,
    /// Identity provider settings.
    pub oidc: OidcConfig,
    /// Upstream model client settings.
    pub llm: LlmConfig,
    /// Object-storage bucket holding uploaded attachments.
    pub storage_bucket: String,
}

/// Identity provider (OIDC) configuration.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Issuer URL, e.g. `https://id.example.com/realms/parley`.
    pub issuer_url: String,
    /// Confidential client id used for the refresh grant.
    pub client_id: String,
    /// Confidential client secret used for the refresh grant.
    pub client_secret: String,
}

/// Upstream model client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API keys rotated round-robin across outbound calls.
    pub api_keys: Vec<String>,
    /// Base URL of the Gemini API (overridable for tests/proxies).
    pub base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Required | Default                   |
    /// |------------------------|----------|---------------------------|
    /// | `HOST`                 | no       | `0.0.0.0`                 |
    /// | `PORT`                 | no       | `3000`                    |
    /// | `CORS_ORIGINS`         | no       | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS` | no       | `30`                      |
    /// | `APP_ENV`              | no       | `production`              |
    /// | `OIDC_ISSUER_URL`      | **yes**  | --                        |
    /// | `OIDC_CLIENT_ID`       | **yes**  | --                        |
    /// | `OIDC_CLIENT_SECRET`   | **yes**  | --                        |
    /// | `GOOGLE_API_KEYS`      | no       | empty (calls fail)        |
    /// | `GEMINI_BASE_URL`      | no       | official endpoint         |
    /// | `STORAGE_BUCKET`       | **yes**  | --                        |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a value fails to parse;
    /// misconfiguration should fail at startup, not at first request.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let expose_error_details =
            std::env::var("APP_ENV").map(|v| v == "development").unwrap_or(false);

        let oidc = OidcConfig {
            issuer_url: std::env::var("OIDC_ISSUER_URL")
                .expect("OIDC_ISSUER_URL must be set")
                .trim_end_matches('/')
                .to_string(),
            client_id: std::env::var("OIDC_CLIENT_ID").expect("OIDC_CLIENT_ID must be set"),
            client_secret: std::env::var("OIDC_CLIENT_SECRET")
                .expect("OIDC_CLIENT_SECRET must be set"),
        };

        let api_keys: Vec<String> = std::env::var("GOOGLE_API_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let llm = LlmConfig {
            api_keys,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| parley_llm::gemini::DEFAULT_BASE_URL.into()),
        };

        let storage_bucket =
            std::env::var("STORAGE_BUCKET").expect("STORAGE_BUCKET must be set");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            expose_error_details,
            oidc,
            llm,
            storage_bucket,
        }
    }
}
