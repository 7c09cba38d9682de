use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level console configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub console: ConsoleSettings,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Allowlist backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Admin password used to (re-)establish a session. Prefer the
    /// `AUTHGATE_SERVER__PASSWORD` env var over writing it to a file.
    #[serde(default)]
    pub password: Option<String>,
}

/// Table refresh and notification timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_toast_duration")]
    pub toast_duration_ms: u64,
    /// Number of historical log records fetched on start.
    #[serde(default = "default_snapshot_limit")]
    pub log_snapshot_limit: usize,
}

/// Push-channel reconnect policy and log display bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_display_cap")]
    pub display_cap: usize,
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_base_url() -> String { "http://localhost:8000".into() }
fn default_request_timeout() -> u64 { 10_000 }
fn default_poll_interval() -> u64 { 2_000 }
fn default_toast_duration() -> u64 { 3_000 }
fn default_snapshot_limit() -> usize { 20 }
fn default_reconnect_delay() -> u64 { 3_000 }
fn default_max_reconnect_attempts() -> u32 { 10 }
fn default_display_cap() -> usize { 100 }
fn default_seen_capacity() -> usize { 4_096 }
fn default_log_level() -> String { "info".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
            password: None,
        }
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            toast_duration_ms: default_toast_duration(),
            log_snapshot_limit: default_snapshot_limit(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            display_cap: default_display_cap(),
            seen_capacity: default_seen_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ConsoleSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl ConsoleConfig {
    /// Load configuration from a YAML file + `AUTHGATE_` env overrides.
    ///
    /// Nested keys use a double underscore: `AUTHGATE_STREAM__DISPLAY_CAP=50`.
    /// A missing file contributes nothing.
    pub fn load(path: &Path) -> Result<Self, crate::GateError> {
        let config: ConsoleConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("AUTHGATE_").split("__"))
            .extract()
            .map_err(|e| crate::GateError::Config(e.to_string()))?;
        tracing::debug!(path = %path.display(), base_url = %config.server.base_url, "Config loaded");
        Ok(config)
    }
}
