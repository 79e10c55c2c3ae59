//! TOML-based configuration persistence for the hub.
//!
//! Reads and writes [`HubConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\QuizBuzzer\config.toml`
//! - Linux:    `~/.config/quizbuzzer/config.toml`
//! - macOS:    `~/Library/Application Support/QuizBuzzer/config.toml`
//!
//! An explicit file can be used instead through [`load_config_from`].
//!
//! ```toml
//! [hub]
//! log_level = "info"
//! event_capacity = 64
//!
//! [discovery]
//! network_prefix = "192.168.1"
//! name_filter = "Quiz"
//! probe_timeout_ms = 2000
//!
//! [session]
//! command_timeout_ms = 5000
//! monitor_interval_ms = 2000
//! ```
//!
//! Every field has a `#[serde(default = "...")]`, and so does every section,
//! so an empty or partial file is valid and a missing file means "all
//! defaults".

use std::path::{Path, PathBuf};
use std::time::Duration;

use buzzer_core::NetworkPrefix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::communication::SessionSettings;
use crate::infrastructure::network::discovery::{DiscoverySettings, DEFAULT_NAME_FILTER};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level hub configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    #[serde(default)]
    pub hub: HubSection,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// General hub behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubSection {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Capacity of the domain event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Subnet sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// First three octets of the /24 network to sweep.
    #[serde(default)]
    pub network_prefix: NetworkPrefix,
    /// Only devices whose name starts with this (case-insensitively) are kept.
    #[serde(default = "default_name_filter")]
    pub name_filter: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

/// Session and monitoring settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Timeout of connect probes, monitor probes, commands and renames.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Pause between two health probes of a connected device.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_event_capacity() -> usize {
    64
}
fn default_name_filter() -> String {
    DEFAULT_NAME_FILTER.to_string()
}
fn default_probe_timeout_ms() -> u64 {
    2000
}
fn default_command_timeout_ms() -> u64 {
    5000
}
fn default_monitor_interval_ms() -> u64 {
    2000
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            network_prefix: NetworkPrefix::default(),
            name_filter: default_name_filter(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
        }
    }
}

// ── Runtime settings ──────────────────────────────────────────────────────────

impl From<&DiscoveryConfig> for DiscoverySettings {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            network_prefix: config.network_prefix,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            request_timeout: Duration::from_millis(config.command_timeout_ms),
            monitor_interval: Duration::from_millis(config.monitor_interval_ms),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`HubConfig`] from the platform config file, returning the defaults
/// if the file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<HubConfig, ConfigError> {
    let path = config_file_path()?;
    load_config_from(&path)
}

/// Loads [`HubConfig`] from `path`, returning the defaults if it does not
/// exist.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_from(path: &Path) -> Result<HubConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HubConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &HubConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `QuizBuzzer` part.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("QuizBuzzer"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("quizbuzzer"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("QuizBuzzer")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
