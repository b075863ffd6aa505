//! Configuration management for chatline
//!
//! Settings come from a YAML file, then `CHATLINE_*` environment variables,
//! then command-line flags. A missing file means defaults.

use crate::conversation::{StoreOptions, DEFAULT_TITLE_MAX_CHARS};
use crate::error::{ChatlineError, Result};
use crate::streaming::SamplingOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Local persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Scheme, host and port of the backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the API routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Timeout for non-streaming requests (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Timeout for establishing a connection (seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

/// Chat behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model used when neither a flag nor a saved selection names one
    #[serde(default)]
    pub default_model: Option<String>,

    /// Sampling temperature sent with each turn
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Cap on generated tokens sent with each turn
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Length of titles derived from the first user message
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_title_max_chars() -> usize {
    DEFAULT_TITLE_MAX_CHARS
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            temperature: None,
            max_tokens: None,
            title_max_chars: default_title_max_chars(),
        }
    }
}

/// Local persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; the platform data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Minimum interval between writes while a reply streams (milliseconds)
    ///
    /// Zero writes on every fragment.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

fn default_flush_interval_ms() -> u64 {
    250
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatlineError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatlineError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("CHATLINE_BASE_URL") {
            self.backend.base_url = base_url;
        }

        if let Ok(prefix) = std::env::var("CHATLINE_API_PREFIX") {
            self.backend.api_prefix = prefix;
        }

        if let Ok(timeout) = std::env::var("CHATLINE_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATLINE_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(model) = std::env::var("CHATLINE_MODEL") {
            if !model.is_empty() {
                self.chat.default_model = Some(model);
            }
        }

        if let Ok(temperature) = std::env::var("CHATLINE_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.chat.temperature = Some(value);
            } else {
                tracing::warn!("Invalid CHATLINE_TEMPERATURE: {}", temperature);
            }
        }

        if let Ok(max_tokens) = std::env::var("CHATLINE_MAX_TOKENS") {
            if let Ok(value) = max_tokens.parse() {
                self.chat.max_tokens = Some(value);
            } else {
                tracing::warn!("Invalid CHATLINE_MAX_TOKENS: {}", max_tokens);
            }
        }

        if let Ok(db_path) = std::env::var(crate::storage::DB_PATH_ENV) {
            if !db_path.is_empty() {
                self.storage.path = Some(PathBuf::from(db_path));
            }
        }

        if let Ok(interval) = std::env::var("CHATLINE_FLUSH_INTERVAL_MS") {
            if let Ok(value) = interval.parse() {
                self.storage.flush_interval_ms = value;
            } else {
                tracing::warn!("Invalid CHATLINE_FLUSH_INTERVAL_MS: {}", interval);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.backend.base_url = base_url.clone();
        }
        if let Some(path) = &cli.storage_path {
            tracing::debug!("Using storage path from CLI: {}", path.display());
            self.storage.path = Some(path.clone());
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a `Config` error naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend.base_url).map_err(|e| {
            ChatlineError::Config(format!(
                "backend.base_url is not a valid URL ({}): {}",
                e, self.backend.base_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatlineError::Config(format!(
                "backend.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.backend.timeout_seconds == 0 {
            return Err(ChatlineError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.backend.connect_timeout_seconds == 0 {
            return Err(ChatlineError::Config(
                "backend.connect_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(temperature) = self.chat.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ChatlineError::Config(
                    "chat.temperature must be between 0.0 and 2.0".to_string(),
                )
                .into());
            }
        }

        if self.chat.max_tokens == Some(0) {
            return Err(
                ChatlineError::Config("chat.max_tokens must be greater than 0".to_string()).into(),
            );
        }

        if self.chat.title_max_chars == 0 {
            return Err(ChatlineError::Config(
                "chat.title_max_chars must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.default_model.as_deref() == Some("") {
            return Err(
                ChatlineError::Config("chat.default_model cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Store options derived from the chat and storage sections
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            title_max_chars: self.chat.title_max_chars,
            flush_interval: Duration::from_millis(self.storage.flush_interval_ms),
        }
    }

    /// Sampling parameters sent with each turn
    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.chat.temperature,
            max_tokens: self.chat.max_tokens,
        }
    }

    /// Picks the model for a turn
    ///
    /// An explicit flag wins, then the saved selection, then
    /// `chat.default_model`.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when none of them names a model
    pub fn resolve_model(
        &self,
        flag: Option<&str>,
        selected: Option<&str>,
    ) -> std::result::Result<String, ChatlineError> {
        let named = |m: &&str| !m.trim().is_empty();
        flag.filter(named)
            .or(selected.filter(named))
            .or(self.chat.default_model.as_deref().filter(named))
            .map(str::to_string)
            .ok_or_else(|| {
                ChatlineError::Config(
                    "no model selected; pass --model, run `chatline models select <id>`, \
                     or set chat.default_model"
                        .to_string(),
                )
            })
    }
}
