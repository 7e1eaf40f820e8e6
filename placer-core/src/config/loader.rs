//! TOML configuration loading
//!
//! Reads the `[processor]` table of a machine configuration file. Every key
//! is optional and falls back to its default:
//!
//! ```toml
//! [processor]
//! job_order = "part_height"
//! max_alignment_retries = 3
//! allow_immediate_tip_calibration = false
//! optimize_multiple_nozzles = true
//! fiducial_level = 1
//! planner = "minimize"
//! ```

use core::fmt;

use serde::Deserialize;

use super::types::ProcessorConfig;

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// TOML parsing failed
    Parse(String),
    /// TOML serialization failed
    Serialize(String),
    /// A value was outside its allowed range
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "config serialize error: {}", msg),
            ConfigError::InvalidValue(key) => write!(f, "invalid value for {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    processor: ProcessorConfig,
}

/// Parse TOML configuration into a ProcessorConfig
pub fn from_toml(input: &str) -> Result<ProcessorConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&file.processor)?;
    Ok(file.processor)
}

/// Serialize a ProcessorConfig back to TOML
pub fn to_toml(config: &ProcessorConfig) -> Result<String, ConfigError> {
    #[derive(serde::Serialize)]
    struct Out<'a> {
        processor: &'a ProcessorConfig,
    }
    toml::to_string(&Out { processor: config }).map_err(|e| ConfigError::Serialize(e.to_string()))
}

fn validate(config: &ProcessorConfig) -> Result<(), ConfigError> {
    if config.max_alignment_retries == 0 {
        return Err(ConfigError::InvalidValue("max_alignment_retries"));
    }
    Ok(())
}
