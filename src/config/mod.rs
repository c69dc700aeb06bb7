mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Environment variable holding the default provider API key
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the default provider base URL
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
/// Environment variable holding the default model identifier
pub const ENV_MODEL: &str = "OPENAI_MODEL";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Proxy server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            host: "127.0.0.1".to_string(),
        }
    }
}

/// Completion provider defaults, used when a request carries no override
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API (e.g., "https://api.openai.com/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Default model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Transport timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// TLS configuration options
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for provider connections
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Accept invalid certificates (self-signed, expired)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Path to custom CA certificate (PEM format)
    pub ca_cert_path: Option<String>,
}

pub(crate) fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    300
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_seconds: default_timeout(),
            tls: None,
        }
    }
}

impl ProviderConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns true if the URL uses HTTPS
    pub fn is_tls(&self) -> bool {
        self.base_url.to_lowercase().starts_with("https://")
    }
}

/// Stats logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub format: StatsFormat,
}

fn default_stats_enabled() -> bool {
    true
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            format: StatsFormat::default(),
        }
    }
}

/// Stats output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    Pretty,
    Json,
    #[default]
    Compact,
}

/// Streaming relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    #[serde(default)]
    pub framing: StreamFraming,
    /// Number of framed chunks buffered between the provider and the client
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    32
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            framing: StreamFraming::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Wire framing used when relaying a streamed completion to the client
///
/// - `DataStream`: newline-delimited `<type>:<json>` parts, as read by the editor's chat hook
/// - `Sse`: OpenAI-style `data: {...}` server-sent events ending with `[DONE]`
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StreamFraming {
    #[default]
    DataStream,
    Sse,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration, falling back to built-in defaults when the file does not exist
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = config_path.unwrap_or_else(|| Path::new("config.yaml"));
        match Self::from_file(path) {
            Err(ConfigError::NotFound(p)) => {
                tracing::info!("No config file at {}, using defaults", p);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Overlay the process environment (`OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`)
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay values from an arbitrary lookup; empty values are ignored
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.provider.base_url = url;
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.provider.model = model;
        }
    }

    /// Check values that would otherwise only fail at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.provider.base_url).map_err(|e| {
            ConfigError::Validation(format!("invalid provider base_url {:?}: {}", self.provider.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "provider base_url must be http or https, got {}",
                parsed.scheme()
            )));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Validation("provider model must not be empty".to_string()));
        }
        if self.streaming.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "streaming channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
