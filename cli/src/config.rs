//! Runtime configuration for the `roti` binary.
//!
//! Every value has a compile-time default and can be overridden through a
//! dedicated environment variable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default directory for the database file.
const DEFAULT_DATA_DIR: &str = "./data";

/// Database file name inside the data directory.
const DATABASE_FILE: &str = "roti.db";

/// Default retention window for polls (in days).
const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Default gauge sampling interval (in seconds).
const DEFAULT_METRICS_INTERVAL_SECS: u64 = 15;

pub const DATA_DIR_VAR: &str = "ROTI_DATA_DIR";
pub const RETENTION_DAYS_VAR: &str = "ROTI_RETENTION_DAYS";
pub const METRICS_INTERVAL_VAR: &str = "ROTI_METRICS_INTERVAL_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidVar { var: &'static str, value: String },
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub retention_days: u32,
    pub metrics_interval: Duration,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = read(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let retention_days = parse_var(RETENTION_DAYS_VAR, read(RETENTION_DAYS_VAR), DEFAULT_RETENTION_DAYS)?;
        let interval_secs = parse_var(
            METRICS_INTERVAL_VAR,
            read(METRICS_INTERVAL_VAR),
            DEFAULT_METRICS_INTERVAL_SECS,
        )?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidVar {
                var: METRICS_INTERVAL_VAR,
                value: "0".to_string(),
            });
        }

        Ok(Self {
            data_dir,
            retention_days,
            metrics_interval: Duration::from_secs(interval_secs),
        })
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value }),
    }
}
