use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{LedgerError, Result};

/// upper bound for `default_after_days`, one hundred years
pub const MAX_DEFAULT_AFTER_DAYS: i64 = 36_500;

/// sqlite takes the busy timeout as a C int of milliseconds
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

/// ledger engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// sqlite database file; `None` keeps the ledger in memory
    pub database_path: Option<PathBuf>,
    /// how long a unit of work waits on a lock held by another connection
    pub busy_timeout_ms: u64,
    /// days an overdue installment may age before its active loan defaults
    pub default_after_days: i64,
    /// prefix for loan numbers derived when the caller supplies none
    pub loan_number_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: 5_000,
            default_after_days: 30,
            loan_number_prefix: "LN".to_string(),
        }
    }
}

impl EngineConfig {
    /// in-memory ledger with default thresholds
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn with_default_after_days(mut self, days: i64) -> Self {
        self.default_after_days = days;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LedgerError::InvalidConfiguration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_DEFAULT_AFTER_DAYS).contains(&self.default_after_days) {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "default_after_days must be between 0 and {}, got {}",
                    MAX_DEFAULT_AFTER_DAYS, self.default_after_days
                ),
            });
        }

        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "busy_timeout_ms must not exceed {}, got {}",
                    MAX_BUSY_TIMEOUT_MS, self.busy_timeout_ms
                ),
            });
        }

        if self.loan_number_prefix.trim().is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "loan_number_prefix must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
