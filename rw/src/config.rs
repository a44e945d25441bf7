//! Runwaiter configuration types and loading

use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::DEFAULT_INTERVAL_SECS;

/// Main runwaiter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External command and periodic run settings
    pub runner: RunnerConfig,

    /// Directories, history bound, and background intervals
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.runner.command.trim().is_empty() {
            return Err(eyre::eyre!("runner.command must not be empty"));
        }
        if self.runner.interval_secs == 0 {
            return Err(eyre::eyre!("runner.interval-secs must be positive"));
        }
        if self.storage.history_limit == 0 {
            return Err(eyre::eyre!("storage.history-limit must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .runwaiter.yml
        let local_config = PathBuf::from(".runwaiter.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/runwaiter/runwaiter.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("runwaiter").join("runwaiter.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// External command and periodic run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Default command line for standard runs (program plus arguments,
    /// whitespace separated; no shell quoting)
    pub command: String,

    /// Seconds between periodic runs
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Whether the interval timer admits runs at all
    #[serde(rename = "periodic-enabled")]
    pub periodic_enabled: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: "chef-client".to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            periodic_enabled: true,
        }
    }
}

/// Directories, history bound, and background intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the scheduler state snapshot
    #[serde(rename = "state-dir")]
    pub state_dir: PathBuf,

    /// Directory for per-run captured-output logs
    #[serde(rename = "logs-dir")]
    pub logs_dir: PathBuf,

    /// Maximum run records kept in the job table
    #[serde(rename = "history-limit")]
    pub history_limit: usize,

    /// Seconds between scheduler state snapshots
    #[serde(rename = "snapshot-interval-secs")]
    pub snapshot_interval_secs: u64,

    /// Seconds between evicted-log deletion sweeps
    #[serde(rename = "sweep-interval-secs")]
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/runwaiter on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("runwaiter"))
            .unwrap_or_else(|| PathBuf::from(".runwaiter"));

        Self {
            state_dir: data_dir.clone(),
            logs_dir: data_dir.join("logs"),
            history_limit: 20,
            snapshot_interval_secs: 60,
            sweep_interval_secs: 60,
        }
    }
}
