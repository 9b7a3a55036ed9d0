//! Configuration types for ObjectIO
//!
//! This module defines the configuration of the disk identity check
//! layer. Every section has defaults so a partial (or empty) TOML file
//! is valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of samples the latency average roughly spans
pub const DEFAULT_EWMA_AGE: f64 = 30.0;

/// Root configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Disk identity check and API metrics
    pub disk_check: DiskCheckConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.disk_check.validate()
    }
}

/// Disk identity check configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCheckConfig {
    /// Smoothing factor of the per-operation latency average.
    /// Must be in (0, 1]; higher values favour recent samples.
    pub latency_ewma_alpha: f64,
}

impl DiskCheckConfig {
    /// Smoothing factor equivalent to an average over `age` samples
    #[must_use]
    pub fn alpha_for_age(age: f64) -> f64 {
        2.0 / (age + 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        let alpha = self.latency_ewma_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::configuration(format!(
                "latency_ewma_alpha must be in (0, 1], got {alpha}"
            )));
        }
        Ok(())
    }
}

impl Default for DiskCheckConfig {
    fn default() -> Self {
        Self {
            latency_ewma_alpha: Self::alpha_for_age(DEFAULT_EWMA_AGE),
        }
    }
}

/// Logging configuration, consumed by the embedding binary
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "objectio_diskcheck=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
