//! Configuration for the WiFi motion tracker.
//!
//! [`DetectorConfig`] holds the parameters of one detection run. It is fixed
//! for the lifetime of a pipeline; changing it means building a new one.
//! [`Config`] wraps it with the output paths and queue sizing used by the CLI
//! and persists as JSON.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Detection parameters for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Capacity of the short (variance) window
    pub window_size: usize,
    /// Requested capacity of the long (median/MAD baseline) window
    pub long_window: usize,
    /// Short-window standard deviation that triggers activity
    pub threshold: f64,
    /// EMA smoothing factor in (0, 1]
    pub ema_alpha: f64,
    /// Robust z-score that triggers activity once the baseline is ready
    pub dev_factor: f64,
    /// Fraction of `threshold` below which activity decays
    pub down_ratio: f64,
    /// Minimum sustained activity before an event opens (seconds)
    pub min_duration_secs: f64,
    /// Time between samples (seconds)
    pub sample_interval_secs: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            long_window: 120,
            threshold: 8.0,
            ema_alpha: 0.3,
            dev_factor: 3.0,
            down_ratio: 0.6,
            min_duration_secs: 1.0,
            sample_interval_secs: 0.5,
        }
    }
}

impl DetectorConfig {
    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be positive".into()));
        }
        if self.long_window == 0 {
            return Err(ConfigError::Invalid("long_window must be positive".into()));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        check_positive("threshold", self.threshold)?;
        check_positive("dev_factor", self.dev_factor)?;
        check_positive("sample_interval_secs", self.sample_interval_secs)?;
        if !(self.down_ratio > 0.0 && self.down_ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "down_ratio must be in (0, 1), got {}",
                self.down_ratio
            )));
        }
        if !self.min_duration_secs.is_finite() || self.min_duration_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_duration_secs must be a non-negative number, got {}",
                self.min_duration_secs
            )));
        }
        Ok(())
    }

    /// Capacity of the long window: never smaller than four short windows.
    pub fn long_capacity(&self) -> usize {
        self.long_window.max(self.window_size * 4)
    }

    /// Consecutive active samples needed before an event opens.
    pub fn min_samples(&self) -> u32 {
        let samples = (self.min_duration_secs / self.sample_interval_secs).round();
        (samples as u32).max(1)
    }

    /// Sampling interval as a [`Duration`].
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sample_interval_secs)
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

/// Main configuration for the tracker CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Detection parameters
    pub detector: DetectorConfig,

    /// Wireless interface to read (first connected interface when unset)
    pub interface: Option<String>,

    /// Delimited-text log of every sample
    pub sample_log: Option<PathBuf>,

    /// Delimited-text log of every closed event
    pub event_log: Option<PathBuf>,

    /// Path for run statistics
    pub data_path: PathBuf,

    /// Capacity of each consumer queue
    pub queue_capacity: usize,

    /// Number of recent samples and events kept for display
    pub history_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wifi-motion-tracker");

        Self {
            detector: DetectorConfig::default(),
            interface: None,
            sample_log: None,
            event_log: None,
            data_path: data_dir,
            queue_capacity: 256,
            history_len: 100,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: Config =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.detector.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wifi-motion-tracker")
            .join("config.json")
    }

    /// Path of the persisted run statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Parse error: {e}"),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
