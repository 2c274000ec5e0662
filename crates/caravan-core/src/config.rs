//! Configuration loading and typed config structures for the Caravan core.
//!
//! The canonical configuration lives in `caravan-config.yaml` at the project
//! root. Each subsystem owns the struct for its own section; this module ties
//! them together and provides the loader.

use std::path::{Path, PathBuf};

use caravan_market::MarketConfig;
use caravan_survival::VitalsConfig;
use serde::Deserialize;

use crate::clock::ClockConfig;

/// Environment variable overriding `world.seed`.
pub const ENV_SEED: &str = "CARAVAN_SEED";

/// Environment variable overriding `companion.url`.
pub const ENV_COMPANION_URL: &str = "CARAVAN_COMPANION_URL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot be used.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `caravan-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Seed and starting placement.
    #[serde(default)]
    pub world: WorldConfig,

    /// Game clock.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Survival rates and thresholds.
    #[serde(default)]
    pub vitals: VitalsConfig,

    /// Market pricing and stock.
    #[serde(default)]
    pub market: MarketConfig,

    /// Frame loop.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Save slots.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dialogue companion probe.
    #[serde(default)]
    pub companion: CompanionConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variables override YAML values:
    /// - `CARAVAN_SEED` overrides `world.seed`
    /// - `CARAVAN_COMPANION_URL` overrides `companion.url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] for invalid YAML or
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production, a map in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `CARAVAN_SEED` is not a `u64`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_SEED) {
            self.world.seed = raw.trim().parse().map_err(|_err| ConfigError::Invalid {
                reason: format!("{ENV_SEED} must be an unsigned integer, got '{raw}'"),
            })?;
        }
        if let Some(url) = lookup(ENV_COMPANION_URL) {
            self.companion.url = Some(url);
        }
        Ok(())
    }

    /// Check cross-section constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vitals.validate().map_err(|err| ConfigError::Invalid {
            reason: err.to_string(),
        })?;
        if self.market.update_interval_minutes == 0 {
            return Err(invalid("market.update_interval_minutes must be at least 1"));
        }
        if self.scheduler.max_frame_delta_ms == 0 {
            return Err(invalid("scheduler.max_frame_delta_ms must be at least 1"));
        }
        if self.scheduler.frame_interval_ms == 0 {
            return Err(invalid("scheduler.frame_interval_ms must be at least 1"));
        }
        if self.clock.days_per_season == 0 {
            return Err(invalid("clock.days_per_season must be at least 1"));
        }
        Ok(())
    }

    /// Market configuration with the world seed applied.
    pub fn market_config(&self) -> MarketConfig {
        MarketConfig {
            seed: self.world.seed,
            ..self.market.clone()
        }
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for every random source (default: 42).
    pub seed: u64,
    /// Normal-world location a new game starts at. Defaults to the world
    /// graph's own start.
    pub starting_location: Option<String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            starting_location: None,
        }
    }
}

/// Frame loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Largest real-time delta applied in one frame (default: 100 ms).
    pub max_frame_delta_ms: u64,
    /// Target real-time interval between frames (default: 16 ms).
    pub frame_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_frame_delta_ms: 100,
            frame_interval_ms: 16,
        }
    }
}

/// Save slot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding file-backed save slots (default: `saves`).
    pub save_dir: PathBuf,
    /// Slot written by autosave (default: `autosave`).
    pub autosave_slot: String,
    /// Frames between autosaves; 0 disables (default: 3600).
    pub autosave_every_frames: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            autosave_slot: "autosave".to_owned(),
            autosave_every_frames: 3_600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

/// Dialogue companion probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Health endpoint of the companion service. No probe when unset.
    pub url: Option<String>,
    /// Probe timeout (default: 2000 ms).
    pub timeout_ms: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 2_000,
        }
    }
}
