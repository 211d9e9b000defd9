//! Configuration management for the documentation server and chat client.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (optionally via a `.env` file) or
//! defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Main configuration structure.
///
/// The server binary reads `server`, `docs`, `logging` and `transport`; the
/// chat binary additionally reads `chat` and `credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Upstream documentation site.
    pub docs: DocsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Chat client and relay loop settings.
    pub chat: ChatConfig,

    /// External API credentials configuration.
    pub credentials: CredentialsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Upstream documentation site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Site root, without trailing slash (e.g. `https://www.better-auth.com`).
    pub base_url: String,

    /// Route of the markdown index.
    pub index_path: String,

    /// `User-Agent` sent with every request.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Chat client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// JSON-RPC endpoint of a running documentation server.
    /// If None, the chat client serves the tools in-process.
    pub mcp_url: Option<String>,

    /// Hosted model name.
    pub model: String,

    /// Base URL of the Gemini REST API.
    pub api_base: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tool rounds per user turn before the turn is abandoned.
    pub max_tool_rounds: usize,

    /// Timeout for a single model call, in seconds.
    pub model_timeout_secs: u64,

    /// Timeout for a single tool call, in seconds.
    pub tool_timeout_secs: u64,
}

/// Configuration for external API credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Gemini API key (required by the chat client).
    pub gemini_api_key: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.better-auth.com".to_string(),
            index_path: "/llms.txt".to_string(),
            user_agent: "better-auth-mcp/1.0".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mcp_url: None,
            model: "gemini-2.5-flash-lite".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.7,
            max_tool_rounds: 8,
            model_timeout_secs: 60,
            tool_timeout_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "better-auth-docs".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            docs: DocsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            chat: ChatConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Server settings use the `MCP_` prefix, upstream settings `DOCS_`,
    /// client settings `CHAT_` and `GEMINI_`. Unparseable numbers fall back
    /// to their defaults with a warning.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        if let Ok(base_url) = std::env::var("DOCS_BASE_URL") {
            config.docs.base_url = base_url;
        }
        if let Ok(index_path) = std::env::var("DOCS_INDEX_PATH") {
            config.docs.index_path = index_path;
        }
        if let Ok(user_agent) = std::env::var("DOCS_USER_AGENT") {
            config.docs.user_agent = user_agent;
        }
        config.docs.request_timeout_secs =
            parse_env("DOCS_REQUEST_TIMEOUT_SECS", config.docs.request_timeout_secs);

        config.chat.mcp_url = std::env::var("CHAT_MCP_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        if let Ok(model) = std::env::var("CHAT_MODEL") {
            config.chat.model = model;
        }
        if let Ok(api_base) = std::env::var("GEMINI_API_BASE") {
            config.chat.api_base = api_base;
        }
        config.chat.temperature = parse_env("CHAT_TEMPERATURE", config.chat.temperature);
        config.chat.max_tool_rounds =
            parse_env("CHAT_MAX_TOOL_ROUNDS", config.chat.max_tool_rounds);
        config.chat.model_timeout_secs =
            parse_env("CHAT_MODEL_TIMEOUT_SECS", config.chat.model_timeout_secs);
        config.chat.tool_timeout_secs =
            parse_env("CHAT_TOOL_TIMEOUT_SECS", config.chat.tool_timeout_secs);

        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            config.credentials.gemini_api_key = Some(api_key);
            info!("Gemini API key loaded from environment");
        }

        config
    }
}

/// Read and parse an environment variable, keeping `default` when it is
/// unset or invalid.
fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
