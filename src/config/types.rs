//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
///
/// Loaded once at startup and shared read-only (behind an `Arc`) with the
/// connection manager and the plugin runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Remote server to connect to.
    pub server: ServerConfig,
    /// Registration identity.
    pub identity: IdentityConfig,
    /// Outgoing flood control.
    #[serde(default)]
    pub flood: FloodConfig,
    /// Reconnect backoff.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Inbound line decoding.
    #[serde(default)]
    pub codec: CodecConfig,
    /// Plugin modules loaded at startup.
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Minimal configuration for tests and embedding.
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        let nick = nick.into();
        Self {
            server: ServerConfig {
                host: host.into(),
                port,
            },
            identity: IdentityConfig {
                username: nick.clone(),
                realname: nick.clone(),
                nick,
                nick_suffix: default_nick_suffix(),
                nick_retry_limit: None,
            },
            flood: FloodConfig::default(),
            reconnect: ReconnectConfig::default(),
            codec: CodecConfig::default(),
            plugins: PluginsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Remote server address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Identity announced during registration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Username sent with USER.
    pub username: String,
    /// Real name sent with USER.
    pub realname: String,
    /// Desired nickname.
    pub nick: String,
    /// Character appended to the nickname on every collision (default: "`").
    #[serde(default = "default_nick_suffix")]
    pub nick_suffix: String,
    /// Maximum collision retries before giving up. Unbounded when absent.
    #[serde(default)]
    pub nick_retry_limit: Option<u32>,
}

/// Self-imposed outgoing rate budget.
///
/// The bot stops sending once `ceiling` bytes are unacknowledged and emits
/// `sentinel`, an invalid command whose "unknown command" reply proves the
/// server has processed everything before it.
#[derive(Debug, Clone, Deserialize)]
pub struct FloodConfig {
    /// Maximum unacknowledged bytes (default: 1024).
    #[serde(default = "default_ceiling")]
    pub ceiling: usize,
    /// Reserved command token used as the flow-control marker.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            ceiling: default_ceiling(),
            sentinel: default_sentinel(),
        }
    }
}

/// Reconnect backoff configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Delay after the nth consecutive failed registration is `base^n` seconds (default: 10).
    #[serde(default = "default_backoff_base")]
    pub base: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base: default_backoff_base(),
        }
    }
}

/// Inbound decoding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfig {
    /// Encoding label tried when a line is not valid UTF-8 (default: "iso-8859-1").
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            fallback_encoding: default_fallback_encoding(),
        }
    }
}

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginsConfig {
    /// Module identifiers loaded at startup, in order.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Channels joined by the built-in `autojoin` module.
    #[serde(default)]
    pub autojoin: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_port() -> u16 {
    6667
}

fn default_nick_suffix() -> String {
    "`".to_string()
}

fn default_ceiling() -> usize {
    1024
}

fn default_sentinel() -> String {
    "SPLIDGEPLOIT".to_string()
}

fn default_backoff_base() -> u64 {
    10
}

fn default_fallback_encoding() -> String {
    slirc_proto::DEFAULT_FALLBACK_ENCODING.to_string()
}
