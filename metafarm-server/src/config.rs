//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

/// Runtime configuration for metafarm-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// with only `METAFARM_OPENAI_KEY` set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite::memory:"`).
    /// Records live only as long as the process unless a file URL is given.
    pub database_url: String,

    /// Secret key for the completion API.
    pub openai_key: String,

    /// Base URL of the OpenAI-compatible API, without trailing slash.
    pub openai_base_url: String,

    /// Model identifier sent with every completion request.
    pub openai_model: String,

    /// Deadline for a single completion call.
    pub openai_timeout: Duration,

    /// Maximum number of concurrent completion calls. `0` means unbounded.
    pub max_in_flight: usize,

    /// Request body limit in megabytes. Base64 images are large.
    pub max_body_mb: usize,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory for daily-rolling log files, in addition to stdout.
    pub log_dir: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("METAFARM_BIND", "0.0.0.0:8080"),
            database_url: env_or("METAFARM_DATABASE_URL", "sqlite::memory:"),
            openai_key: env_or("METAFARM_OPENAI_KEY", ""),
            openai_base_url: env_or("METAFARM_OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_owned(),
            openai_model: env_or("METAFARM_OPENAI_MODEL", "gpt-4o-mini"),
            openai_timeout: Duration::from_secs(parse_env("METAFARM_OPENAI_TIMEOUT_SECS", 60)),
            max_in_flight: parse_env("METAFARM_MAX_IN_FLIGHT", 0),
            max_body_mb: parse_env("METAFARM_MAX_BODY_MB", 20),
            cors_allowed_origins: std::env::var("METAFARM_CORS_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            enable_swagger: parse_bool("METAFARM_ENABLE_SWAGGER", true),
            log_level: env_or("METAFARM_LOG", "info"),
            log_json: parse_bool("METAFARM_LOG_JSON", false),
            log_dir: std::env::var("METAFARM_LOG_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
            database_url: "sqlite::memory:".to_owned(),
            openai_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_owned(),
            openai_model: "gpt-4o-mini".to_owned(),
            openai_timeout: Duration::from_secs(60),
            max_in_flight: 0,
            max_body_mb: 20,
            cors_allowed_origins: None,
            enable_swagger: true,
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
