//! Configuration system for Switchboard.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $SWITCHBOARD_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/switchboard/config.toml
//!   3. ~/.config/switchboard/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::wire::{DEFAULT_DIRECTORY_PORT, DEFAULT_HOST};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    pub node: NodeConfig,
    pub directory: DirectoryConfig,
    pub relay: RelaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Peer id announced at registration. Empty = random per process.
    pub id: String,
    /// Display name. Empty = `client-<port>`.
    pub name: String,
    /// Address other peers use to reach this one.
    pub host: String,
    /// HTTP listen port. 0 = directory port + index.
    pub http_port: u16,
    /// Offset from the directory port. Index 0 is the directory itself.
    pub index: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub host: String,
    pub port: u16,
    /// Registration attempts before startup is declared failed.
    pub register_attempts: u32,
    /// Delay between registration attempts, multiplied by the attempt number.
    pub register_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Timeout applied to each delivery attempt independently.
    pub attempt_timeout_ms: u64,
    /// Attempts per target. 1 = no retry.
    pub max_attempts: u32,
    /// Delay between retries, multiplied by the attempt number.
    pub backoff_ms: u64,
    /// Max concurrent deliveries per send. 0 = unbounded.
    pub fanout_limit: usize,
    /// Deregister a peer after this many consecutive unreachable attempts.
    /// 0 = never.
    pub evict_after_failures: u32,
    /// Overall deadline for one send. 0 = none.
    pub send_deadline_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            host: DEFAULT_HOST.to_string(),
            http_port: 0,
            index: 0,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_DIRECTORY_PORT,
            register_attempts: 20,
            register_backoff_ms: 100,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 3_000,
            max_attempts: 1,
            backoff_ms: 200,
            fanout_limit: 0,
            evict_after_failures: 0,
            send_deadline_ms: 0,
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Port this node listens on.
    pub fn listen_port(&self, directory_port: u16) -> u16 {
        if self.http_port != 0 {
            self.http_port
        } else {
            directory_port.saturating_add(self.index)
        }
    }

    /// Configured id, or a fresh random one.
    pub fn resolved_id(&self) -> String {
        if self.id.trim().is_empty() {
            hex::encode(rand::random::<[u8; 8]>())
        } else {
            self.id.clone()
        }
    }

    pub fn resolved_name(&self, port: u16) -> String {
        if self.name.trim().is_empty() {
            format!("client-{port}")
        } else {
            self.name.clone()
        }
    }
}

impl DirectoryConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl RelaySettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn send_deadline(&self) -> Option<Duration> {
        (self.send_deadline_ms > 0).then(|| Duration::from_millis(self.send_deadline_ms))
    }

    pub fn fanout_limit(&self) -> Option<usize> {
        (self.fanout_limit > 0).then_some(self.fanout_limit)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("switchboard")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SwitchboardConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path without env overrides. A missing file
    /// yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(SwitchboardConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SWITCHBOARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config to `path` if nothing is there yet.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&SwitchboardConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply SWITCHBOARD_* overrides, reading values through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SWITCHBOARD_NODE__ID") {
            self.node.id = v;
        }
        if let Some(v) = lookup("SWITCHBOARD_NODE__NAME") {
            self.node.name = v;
        }
        if let Some(v) = lookup("SWITCHBOARD_NODE__HOST") {
            self.node.host = v;
        }
        if let Some(p) = lookup("SWITCHBOARD_NODE__HTTP_PORT").and_then(|v| v.parse().ok()) {
            self.node.http_port = p;
        }
        if let Some(i) = lookup("SWITCHBOARD_NODE__INDEX").and_then(|v| v.parse().ok()) {
            self.node.index = i;
        }
        if let Some(v) = lookup("SWITCHBOARD_DIRECTORY__HOST") {
            self.directory.host = v;
        }
        if let Some(p) = lookup("SWITCHBOARD_DIRECTORY__PORT").and_then(|v| v.parse().ok()) {
            self.directory.port = p;
        }
        if let Some(ms) = lookup("SWITCHBOARD_RELAY__ATTEMPT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.relay.attempt_timeout_ms = ms;
        }
        if let Some(n) = lookup("SWITCHBOARD_RELAY__MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.relay.max_attempts = n;
        }
        if let Some(n) = lookup("SWITCHBOARD_RELAY__FANOUT_LIMIT").and_then(|v| v.parse().ok()) {
            self.relay.fanout_limit = n;
        }
        if let Some(n) = lookup("SWITCHBOARD_RELAY__EVICT_AFTER_FAILURES").and_then(|v| v.parse().ok()) {
            self.relay.evict_after_failures = n;
        }
    }
}
