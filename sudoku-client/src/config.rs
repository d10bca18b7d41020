//! Engine configuration.
//!
//! Loaded from a TOML file (default: `sudoku.toml`). Every field has a
//! default, so an empty file is a valid configuration.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use sudoku_core::{PollPolicy, SavePolicy};

/// Root configuration for the sync engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Timer configuration.
    #[serde(default)]
    pub timer: TimerConfig,
    /// Local store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Social polling configuration.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Remote store configuration.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Timer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    /// Ticks counted down before a new session starts running (default: 4).
    #[serde(default = "default_countdown_ticks")]
    pub countdown_ticks: u32,
    /// Tick cadence in milliseconds (default: 1000).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Seconds without a selection change before auto-pausing (default: 300).
    #[serde(default = "default_inactivity_secs")]
    pub inactivity_secs: u64,
    /// How often inactivity is checked, in seconds (default: 60).
    #[serde(default = "default_inactivity_check_secs")]
    pub inactivity_check_secs: u64,
}

/// Local store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Prefix of every session key (default: `sudoku-`).
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Answer-stack entries kept locally (default: 10).
    #[serde(default = "default_local_stack_limit")]
    pub local_stack_limit: usize,
    /// Answer-stack entries kept locally once complete (default: 2).
    #[serde(default = "default_completed_local_limit")]
    pub completed_local_limit: usize,
    /// Answer-stack entries sent to the remote store (default: 3).
    #[serde(default = "default_remote_stack_limit")]
    pub remote_stack_limit: usize,
    /// Local entries older than this are purged when listed (default: 32 days).
    #[serde(default = "default_purge_after_days")]
    pub purge_after_days: u64,
    /// Entries older than this go first when the store is full (default: 3 days).
    #[serde(default = "default_quota_stale_days")]
    pub quota_stale_days: u64,
    /// Remote records expire this long after their last save (default: 32 days).
    #[serde(default = "default_remote_expiry_days")]
    pub remote_expiry_days: u64,
    /// Directory for the file-backed store (optional, CLI only).
    pub data_dir: Option<PathBuf>,
}

/// Social polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Poll cadence in seconds (default: 30).
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Minimum seconds since the last save (default: 30).
    #[serde(default = "default_min_since_save")]
    pub min_since_save_secs: u64,
    /// Seconds since the last save after which polling stops (default: 1800).
    #[serde(default = "default_max_since_save")]
    pub max_since_save_secs: u64,
}

/// Remote store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the session API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Application id sent with every request (default: `sudoku`).
    #[serde(default = "default_app")]
    pub app: String,
    /// Bearer token (optional; requests go out unauthenticated without it).
    pub token: Option<String>,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_countdown_ticks() -> u32 {
    4
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_inactivity_secs() -> u64 {
    5 * 60
}

fn default_inactivity_check_secs() -> u64 {
    60
}

fn default_key_prefix() -> String {
    "sudoku-".to_string()
}

fn default_local_stack_limit() -> usize {
    10
}

fn default_completed_local_limit() -> usize {
    2
}

fn default_remote_stack_limit() -> usize {
    3
}

fn default_purge_after_days() -> u64 {
    32
}

fn default_quota_stale_days() -> u64 {
    3
}

fn default_remote_expiry_days() -> u64 {
    32
}

fn default_poll_interval() -> u64 {
    30
}

fn default_min_since_save() -> u64 {
    30
}

fn default_max_since_save() -> u64 {
    30 * 60
}

fn default_base_url() -> String {
    "https://api.bubblyclouds.com".to_string()
}

fn default_app() -> String {
    "sudoku".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

const DAY: u64 = 24 * 60 * 60;

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: default_countdown_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            inactivity_secs: default_inactivity_secs(),
            inactivity_check_secs: default_inactivity_check_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            local_stack_limit: default_local_stack_limit(),
            completed_local_limit: default_completed_local_limit(),
            remote_stack_limit: default_remote_stack_limit(),
            purge_after_days: default_purge_after_days(),
            quota_stale_days: default_quota_stale_days(),
            remote_expiry_days: default_remote_expiry_days(),
            data_dir: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            min_since_save_secs: default_min_since_save(),
            max_since_save_secs: default_max_since_save(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app: default_app(),
            token: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

impl TimerConfig {
    /// Tick cadence.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Inactivity window.
    pub fn inactivity(&self) -> Duration {
        Duration::from_secs(self.inactivity_secs)
    }

    /// Inactivity check cadence.
    pub fn inactivity_check(&self) -> Duration {
        Duration::from_secs(self.inactivity_check_secs)
    }
}

impl StorageConfig {
    /// Per-store stack limits.
    pub fn save_policy(&self) -> SavePolicy {
        SavePolicy {
            local_limit: self.local_stack_limit,
            completed_local_limit: self.completed_local_limit,
            remote_limit: self.remote_stack_limit,
        }
    }

    /// Local purge age.
    pub fn purge_after(&self) -> Duration {
        Duration::from_secs(self.purge_after_days * DAY)
    }

    /// Age past which entries are dropped first under quota pressure.
    pub fn quota_stale_age(&self) -> Duration {
        Duration::from_secs(self.quota_stale_days * DAY)
    }

    /// Lifetime of a remote record after its last save.
    pub fn remote_expiry(&self) -> Duration {
        Duration::from_secs(self.remote_expiry_days * DAY)
    }
}

impl PollingConfig {
    /// The poll decision parameters.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval_secs),
            min_since_save: Duration::from_secs(self.min_since_save_secs),
            max_since_save: Duration::from_secs(self.max_since_save_secs),
        }
    }
}

impl RemoteConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
