//! Configuration loading, validation, and management for stbl-mcp.
//!
//! Loads configuration from `~/.stbl-mcp/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stbl-mcp/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Stability API key. The try-it-out key works but is rate limited.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// The caller's chain address, once discovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,

    /// Whether onboarding (key + address discovery) has completed.
    #[serde(default)]
    pub setup_complete: bool,

    /// Event engine configuration
    #[serde(default)]
    pub events: EventsConfig,

    /// Local storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_api_key() -> String {
    "try-it-out".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &str) -> &'static str {
    if s == "try-it-out" { "try-it-out" } else { "[REDACTED]" }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("user_address", &self.user_address)
            .field("setup_complete", &self.setup_complete)
            .field("events", &self.events)
            .field("storage", &self.storage)
            .finish()
    }
}

/// Event subscription engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// WebSocket URL of the chain event stream.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Bounded event buffer capacity (FIFO eviction beyond this).
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Default limit for `recent_events` when the caller passes none.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Default limit for `query_events` when the caller passes none.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    /// Reconnection policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_ws_url() -> String {
    "wss://events.stabilityprotocol.com/ws".into()
}
fn default_buffer_capacity() -> usize {
    1000
}
fn default_recent_limit() -> usize {
    50
}
fn default_query_limit() -> usize {
    100
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            buffer_capacity: default_buffer_capacity(),
            recent_limit: default_recent_limit(),
            query_limit: default_query_limit(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Exponential backoff reconnection settings.
///
/// Attempt N (1-indexed) is scheduled after `base_delay_ms * 2^(N-1)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    5
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Local JSON storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override for the storage base directory (default `~/.stbl-mcp`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.stbl-mcp/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `STBL_API_KEY`
    /// - `STBL_WS_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;

        if let Ok(key) = std::env::var("STBL_API_KEY") {
            if !key.is_empty() {
                config.api_key = key;
            }
        }

        if let Ok(url) = std::env::var("STBL_WS_URL") {
            if !url.is_empty() {
                config.events.ws_url = url;
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write this configuration to the default path, creating the directory
    /// if needed. Used when address discovery updates `user_address`.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Write this configuration to a specific file path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stbl-mcp")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// The storage base directory (config override or the config dir).
    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .base_dir
            .clone()
            .unwrap_or_else(Self::config_dir)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.events.buffer_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "events.buffer_capacity must be at least 1".into(),
            ));
        }

        if self.events.reconnect.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "events.reconnect.base_delay_ms must be at least 1".into(),
            ));
        }

        if !self.events.ws_url.starts_with("ws://") && !self.events.ws_url.starts_with("wss://") {
            return Err(ConfigError::ValidationError(
                "events.ws_url must be a ws:// or wss:// URL".into(),
            ));
        }

        Ok(())
    }

    /// Whether a production API key is configured.
    pub fn has_production_key(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != "try-it-out"
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            user_address: None,
            setup_complete: false,
            events: EventsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.api_key, "try-it-out");
        assert_eq!(config.events.buffer_capacity, 1000);
        assert_eq!(config.events.reconnect.max_attempts, 5);
        assert!(!config.setup_complete);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.events.ws_url, config.events.ws_url);
        assert_eq!(parsed.events.recent_limit, 50);
        assert_eq!(parsed.events.query_limit, 100);
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.events.buffer_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_websocket_url_rejected() {
        let mut config = AppConfig::default();
        config.events.ws_url = "https://events.stabilityprotocol.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().api_key, "try-it-out");
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.user_address = Some("0x1234567890abcdef1234567890abcdef12345678".into());
        config.setup_complete = true;
        config.save_to(&path).unwrap();

        let reloaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.user_address, config.user_address);
        assert!(reloaded.setup_complete);
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.api_key = "sk-production-secret".into();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-production-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("try-it-out"));
        assert!(toml_str.contains("wss://events.stabilityprotocol.com/ws"));
    }
}
