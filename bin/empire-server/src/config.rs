//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for empire-server.
///
/// Every field except the Groq API key has a sensible default so the server
/// works out-of-the-box without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// SQLite (or other) database URL (default: `"sqlite://empire.db"`).
    /// Supports any sqlx-compatible connection string – swap the scheme to
    /// migrate to Postgres (`postgres://…`) or MySQL (`mysql://…`).
    pub database_url: String,

    /// Bearer token for the Groq API.  Without it every chat turn falls back
    /// to the configuration-issue reply.
    pub groq_api_key: String,

    /// Model identifier requested from the Groq API.
    pub groq_model: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("EMPIRE_BIND", "0.0.0.0:8000"),
            database_url: env_or("EMPIRE_DATABASE_URL", "sqlite://empire.db"),
            groq_api_key: env_or("GROQ_API_KEY", ""),
            groq_model: env_or("EMPIRE_MODEL", empire_ai::groq::DEFAULT_MODEL),
            log_level: env_or("EMPIRE_LOG", "info"),
            log_json: bool_env("EMPIRE_LOG_JSON", false),
            cors_allowed_origins: std::env::var("EMPIRE_CORS_ORIGINS").ok(),
            enable_swagger: bool_env("EMPIRE_ENABLE_SWAGGER", true),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn bool_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
