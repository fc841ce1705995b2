//! Configuration error types.
//!
//! The scoring functions themselves cannot fail; only loading and
//! validating operator configuration can.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid weight for {table}.{name}: {weight} (must be finite and non-negative)")]
    InvalidWeight {
        table: String,
        name: String,
        weight: f64,
    },

    #[error("Invalid optimal band for {name}: min {min} is above max {max}")]
    InvalidBand { name: String, min: f64, max: f64 },

    #[error("Invalid trend scale for {name}: {scale} (must be positive)")]
    InvalidTrendScale { name: String, scale: f64 },

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Invalid threshold {name}: {value} (must be finite and non-negative)")]
    InvalidThreshold { name: String, value: f64 },

    #[error("Stock-out metric '{0}' is not scored by any category table")]
    UntrackedStockOutMetric(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
