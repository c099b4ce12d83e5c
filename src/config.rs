//! Configuration loading using Figment.
//!
//! Settings are layered, lowest precedence first:
//! 1. Built-in defaults (`Settings::default()`)
//! 2. `config/thermo_daq.toml` (optional)
//! 3. Environment variables prefixed with `THERMO_DAQ_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore so that key names may
//! themselves contain underscores:
//!
//! ```text
//! THERMO_DAQ_SERIAL__PORT=/dev/ttyUSB0
//! THERMO_DAQ_SERIAL__BAUD_RATE=115200
//! THERMO_DAQ_ACQUISITION__SAMPLE_INTERVAL_MS=500
//! THERMO_DAQ_APPLICATION__LOG_LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```no_run
//! use thermo_daq::config::Settings;
//!
//! let settings = Settings::load().expect("configuration");
//! println!("Reading {} at {} baud", settings.serial.port, settings.serial.baud_rate);
//! ```

use crate::error::{AppResult, DaqError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the optional configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/thermo_daq.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "THERMO_DAQ_";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Serial connection settings
    #[serde(default)]
    pub serial: SerialConfig,
    /// Acquisition pacing
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    /// Output file settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Window title
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g., "/dev/ttyUSB0", "COM4")
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Per-read timeout in milliseconds. A timed-out read is retried; the
    /// timeout only bounds how long a stop request can go unnoticed.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Acquisition pacing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Wait between two consecutive reads, in milliseconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
}

/// Output file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that relative CSV file names are resolved against
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "Adquisición de Datos de Temperatura y Humedad".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> String {
    "COM4".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout() -> u64 {
    500
}

fn default_sample_interval() -> u64 {
    2000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl SerialConfig {
    /// Read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl AcquisitionConfig {
    /// Sampling interval as a `Duration`.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load configuration from the default file and environment variables.
    ///
    /// A missing file is not an error; defaults fill every field.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path, then validate it.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Self::from_figment(Self::figment(path.as_ref()))
    }

    /// The provider stack used by [`Settings::load_from`].
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate settings from an arbitrary provider stack.
    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        let settings: Self = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Serial port name is not empty
    /// - Baud rate and read timeout are non-zero
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.serial.port.trim().is_empty() {
            return Err(DaqError::Configuration(
                "serial.port cannot be empty".to_string(),
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(DaqError::Configuration(
                "serial.baud_rate must be > 0".to_string(),
            ));
        }

        if self.serial.read_timeout_ms == 0 {
            return Err(DaqError::Configuration(
                "serial.read_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
