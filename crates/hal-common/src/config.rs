//! Configuration structures for the HAL.
//!
//! Supports TOML deserialization with defaults matching the behavior of the
//! controller firmware, so an empty file is a valid configuration.

use crate::error::{HalError, HalResult};
use crate::handles::MAX_HANDLE_SLOTS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level HAL configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Notifier (alarm) configuration.
    pub notifier: NotifierConfig,

    /// Simulation harness configuration.
    pub sim: SimConfig,
}

/// Notifier tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Sleep used by a waiter with no armed deadline, or while paused.
    #[serde(with = "humantime_serde")]
    pub idle_wait: Duration,

    /// Upper bound on each wait of the simulation barrier before it re-polls.
    #[serde(with = "humantime_serde")]
    pub sync_retry: Duration,

    /// Maximum number of simultaneously registered notifiers.
    pub max_handles: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_secs(1000),
            sync_retry: Duration::from_secs(1),
            max_handles: MAX_HANDLE_SLOTS,
        }
    }
}

impl NotifierConfig {
    /// Check that the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Config`] for zero durations or a handle capacity
    /// outside `1..=MAX_HANDLE_SLOTS`.
    pub fn validate(&self) -> HalResult<()> {
        if self.idle_wait.is_zero() {
            return Err(HalError::Config("idle_wait must be non-zero".into()));
        }
        if self.sync_retry.is_zero() {
            return Err(HalError::Config("sync_retry must be non-zero".into()));
        }
        if self.max_handles == 0 || self.max_handles > MAX_HANDLE_SLOTS {
            return Err(HalError::Config(format!(
                "max_handles must be in 1..={MAX_HANDLE_SLOTS}, got {}",
                self.max_handles
            )));
        }
        Ok(())
    }
}

/// Simulation harness settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of periodic runners to spawn.
    pub runners: usize,

    /// Base period of the first runner; runner `n` uses `period * (n + 1)`.
    #[serde(with = "humantime_serde")]
    pub period: Duration,

    /// Simulated time advanced per step.
    #[serde(with = "humantime_serde")]
    pub step: Duration,

    /// Number of steps to run.
    pub steps: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            runners: 3,
            period: Duration::from_millis(20),
            step: Duration::from_millis(20),
            steps: 50,
        }
    }
}

impl HalConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
