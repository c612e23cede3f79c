//! Server configuration, loaded from environment variables at startup.

use relaychat_types::chat::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Runtime configuration for relaychat-server.
///
/// Every field has a default so the server starts without any environment
/// variables set; without `RELAYCHAT_UPSTREAM_API_KEY` the upstream call is
/// sent unauthenticated.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Upstream chat-completions endpoint.
    pub upstream_url: String,

    /// Bearer credential for the upstream provider.
    pub upstream_api_key: Option<String>,

    /// Value of the `customerId` header sent upstream, when set.
    pub upstream_customer_id: Option<String>,

    /// Seconds allowed for establishing the upstream connection.
    pub upstream_connect_timeout_secs: u64,

    /// Model used when the request carries none.
    pub default_model: String,

    pub default_temperature: f32,

    pub default_max_tokens: u32,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated allowed CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to
    /// [`Config::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_address: env_or("RELAYCHAT_BIND", d.bind_address),
            upstream_url: env_or("RELAYCHAT_UPSTREAM_URL", d.upstream_url),
            upstream_api_key: env_opt("RELAYCHAT_UPSTREAM_API_KEY"),
            upstream_customer_id: env_opt("RELAYCHAT_UPSTREAM_CUSTOMER_ID"),
            upstream_connect_timeout_secs: parse_env(
                "RELAYCHAT_UPSTREAM_CONNECT_TIMEOUT_SECS",
                d.upstream_connect_timeout_secs,
            ),
            default_model: env_or("RELAYCHAT_DEFAULT_MODEL", d.default_model),
            default_temperature: parse_env("RELAYCHAT_DEFAULT_TEMPERATURE", d.default_temperature),
            default_max_tokens: parse_env("RELAYCHAT_DEFAULT_MAX_TOKENS", d.default_max_tokens),
            log_level: env_or("RELAYCHAT_LOG", d.log_level),
            log_json: env_flag("RELAYCHAT_LOG_JSON", d.log_json),
            cors_allowed_origins: env_opt("RELAYCHAT_CORS_ORIGINS"),
            enable_docs: env_flag("RELAYCHAT_ENABLE_DOCS", d.enable_docs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            upstream_url: "https://openrouter.ai/api/v1/chat/completions".to_owned(),
            upstream_api_key: None,
            upstream_customer_id: None,
            upstream_connect_timeout_secs: 10,
            default_model: DEFAULT_MODEL.to_owned(),
            default_temperature: DEFAULT_TEMPERATURE,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_docs: true,
        }
    }
}

// The API key must never reach the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("upstream_url", &self.upstream_url)
            .field(
                "upstream_api_key",
                &self.upstream_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("upstream_customer_id", &self.upstream_customer_id)
            .field("upstream_connect_timeout_secs", &self.upstream_connect_timeout_secs)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("enable_docs", &self.enable_docs)
            .finish()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
