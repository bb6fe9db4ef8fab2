//! Configuration for the converter binaries
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! absent file or an empty one is equivalent to the built-in defaults.
//! CLI flags override file values in the binaries.
//!
//! # Example
//! ```ignore
//! let config = Config::load("config.toml")?;
//! let batch = config.converter.events_per_batch;
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::converter::ConverterConfig;
use crate::emulator::EmulatorConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub converter: ConverterConfig,
    pub emulator: EmulatorConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
