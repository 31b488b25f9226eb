//! Session configuration
//!
//! Per-session tunables for the flow-control thresholds and the bounded
//! frame queue. Loaded from TOML with built-in defaults for every field;
//! a missing file or missing keys fall back to the defaults defined here,
//! not in external files.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

fn default_underflow_threshold() -> usize {
    4
}

fn default_overflow_threshold() -> usize {
    8
}

fn default_max_queue_length() -> usize {
    2000
}

/// Per-session playback configuration
///
/// Queue depths above `overflow_threshold` pause the backend; depths below
/// `underflow_threshold` resume it; depths strictly between the two leave
/// playback untouched (hysteresis band).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Queue depth below which a paused backend is resumed
    #[serde(default = "default_underflow_threshold")]
    pub underflow_threshold: usize,

    /// Queue depth above which a playing backend is paused
    #[serde(default = "default_overflow_threshold")]
    pub overflow_threshold: usize,

    /// Maximum frames held per adapter queue; frames past this are dropped
    #[serde(default = "default_max_queue_length")]
    pub max_queue_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            underflow_threshold: default_underflow_threshold(),
            overflow_threshold: default_overflow_threshold(),
            max_queue_length: default_max_queue_length(),
        }
    }
}

impl SessionConfig {
    /// Parse configuration from a TOML string and validate it
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: SessionConfig =
            toml::from_str(raw).map_err(|e| Error::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        info!(
            "Loaded session config from {}: thresholds {}/{}, max queue {}",
            path.display(),
            config.underflow_threshold,
            config.overflow_threshold,
            config.max_queue_length
        );
        Ok(config)
    }

    /// Validate threshold ordering and queue bounds
    pub fn validate(&self) -> Result<()> {
        if self.overflow_threshold <= self.underflow_threshold {
            return Err(Error::Config(format!(
                "overflow_threshold ({}) must be greater than underflow_threshold ({})",
                self.overflow_threshold, self.underflow_threshold
            )));
        }
        if self.max_queue_length == 0 {
            return Err(Error::Config(
                "max_queue_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Convenience constructor for the common case of explicit thresholds
    pub fn with_thresholds(underflow: usize, overflow: usize) -> Result<Self> {
        let config = Self {
            underflow_threshold: underflow,
            overflow_threshold: overflow,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }
}
