//! Settings types. Every struct deserializes with `#[serde(default)]`, so a
//! partial user file only needs the keys it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrillSettings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub scenario: ScenarioSettings,
    pub mail: MailSettings,
}

impl DrillSettings {
    /// Reject values that would make the server unusable.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be at least 1".into(),
            ));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if self.server.max_message_size < 1024 {
            return Err(SettingsError::InvalidValue(
                "server.maxMessageSize must be at least 1024 bytes".into(),
            ));
        }
        if self.scenario.max_tokens == 0 {
            return Err(SettingsError::InvalidValue(
                "scenario.maxTokens must be at least 1".into(),
            ));
        }
        if self.mail.enabled && self.mail.relay_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "mail.relayUrl is required when mail is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Network settings for the HTTP/WebSocket listener.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (`0` picks a free port).
    pub port: u16,
    /// Upgrades beyond this many open sockets are refused.
    pub max_connections: usize,
    /// Per-connection outbound queue depth.
    pub send_queue_capacity: usize,
    /// Largest accepted WebSocket message in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_connections: 1024,
            send_queue_capacity: 256,
            max_message_size: 64 * 1024,
        }
    }
}

/// Location of the interaction database.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Relative paths resolve against the data directory.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "drill.db".to_string(),
        }
    }
}

/// Log level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a level name, case-insensitively.
    pub fn parse(val: &str) -> Option<Self> {
        match val.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    /// JSON lines on stdout instead of human-readable text.
    pub json: bool,
    /// Persist warn+ events to a log database.
    pub log_to_sqlite: bool,
    /// Relative paths resolve against the data directory.
    pub log_db_path: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: true,
            log_to_sqlite: true,
            log_db_path: "logs.db".to_string(),
        }
    }
}

/// LLM scenario generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioSettings {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }
}

/// Outgoing mail through an HTTP mail relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailSettings {
    pub enabled: bool,
    pub relay_url: String,
    pub from_address: String,
    pub timeout_ms: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            relay_url: String::new(),
            from_address: "security-awareness@example.com".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Resolve a settings path against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
