//! Configuration management for whereabouts.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, LocationError, Result};
use crate::host::PositionOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "whereabouts";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "storage.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WHEREABOUTS_`, sections separated
///    by `__`, e.g. `WHEREABOUTS_GEOLOCATION__TIMEOUT_MS`)
/// 2. TOML config file at `~/.config/whereabouts/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Geolocation request configuration.
    pub geolocation: GeolocationConfig,
    /// Simulated geolocation host configuration.
    pub simulator: SimulatorConfig,
    /// Device profile configuration.
    pub profile: ProfileConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/whereabouts/storage.db`
    pub database_path: Option<PathBuf>,
    /// Directory export artifacts are written to.
    /// Defaults to the current directory.
    pub export_dir: Option<PathBuf>,
}

/// Options handed to the host with every location request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Ask the host for its most accurate fix.
    pub high_accuracy: bool,
    /// How long the host may take to produce a fix, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum age of a cached fix the host may return, in milliseconds.
    pub max_cached_age_ms: u64,
    /// Interval between updates from the simulated host while watching.
    pub watch_interval_ms: u64,
}

/// Simulated geolocation host.
///
/// Used when the machine has no location service of its own, so the
/// capture pipeline can still be demonstrated end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Install the simulated host. When disabled, geolocation is unsupported.
    pub enabled: bool,
    /// Reported latitude in degrees.
    pub latitude: f64,
    /// Reported longitude in degrees.
    pub longitude: f64,
    /// Reported accuracy in meters.
    pub accuracy: f64,
    /// Reported altitude in meters, if any.
    pub altitude: Option<f64>,
    /// Force every request to fail with this host error code.
    pub error_code: Option<u16>,
}

/// Device profile configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Permission names queried when building a profile.
    pub permissions: Vec<String>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 10_000,
            max_cached_age_ms: 60_000,
            watch_interval_ms: 1_000,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: 37.7749,
            longitude: -122.4194,
            accuracy: 10.0,
            altitude: None,
            error_code: None,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            permissions: default_permissions(),
        }
    }
}

/// Permissions a privacy-curious page typically asks about.
fn default_permissions() -> Vec<String> {
    vec![
        "geolocation".to_string(),
        "camera".to_string(),
        "microphone".to_string(),
        "notifications".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("WHEREABOUTS_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.geolocation.timeout_ms == 0 {
            return Err(Error::config("timeout_ms must be greater than 0"));
        }

        if self.geolocation.watch_interval_ms == 0 {
            return Err(Error::config("watch_interval_ms must be greater than 0"));
        }

        if let Some(code) = self.simulator.error_code {
            if matches!(LocationError::from_code(code), LocationError::Unknown { .. }) {
                return Err(Error::config(format!(
                    "simulator error_code must be 1, 2 or 3 (got {code})"
                )));
            }
        }

        if self
            .profile
            .permissions
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(Error::config("permission names must not be empty"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the export directory, resolving defaults if not set.
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.storage
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Build the options passed to the host geolocation capability.
    #[must_use]
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.geolocation.high_accuracy,
            timeout: Duration::from_millis(self.geolocation.timeout_ms),
            max_cached_age: Duration::from_millis(self.geolocation.max_cached_age_ms),
        }
    }

    /// Get the simulated watch interval as a Duration.
    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.geolocation.watch_interval_ms)
    }
}
