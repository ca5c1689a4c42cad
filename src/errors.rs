use rusqlite::ErrorCode;
use thiserror::Error;

use crate::decimal::{Money, Rate};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{entity} not found: {key}")]
    NotFound {
        entity: &'static str,
        key: String,
    },

    #[error("conflict: {message}")]
    Conflict {
        message: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidRate {
        rate: Rate,
    },

    #[error("invalid loan term: {message}")]
    InvalidTerm {
        message: String,
    },

    #[error("invalid loan status: {value}")]
    InvalidStatus {
        value: String,
    },

    #[error("invalid role specified: {value}")]
    InvalidRole {
        value: String,
    },

    #[error("unsupported payment frequency: {value}")]
    UnsupportedFrequency {
        value: String,
    },

    #[error("lender and borrower cannot be the same company: {company_id}")]
    SameParty {
        company_id: uuid::Uuid,
    },

    #[error("total {total} does not equal principal {principal} plus interest {interest}")]
    AmountMismatch {
        total: Money,
        principal: Money,
        interest: Money,
    },

    #[error("principal payment {requested} exceeds outstanding loan amount {outstanding}")]
    ExceedsOutstanding {
        outstanding: Money,
        requested: Money,
    },

    #[error("schedule item {schedule_item_id} has already been paid")]
    AlreadyPaid {
        schedule_item_id: uuid::Uuid,
    },

    #[error("schedule item {schedule_item_id} does not belong to loan {loan_id}")]
    MismatchedLoan {
        schedule_item_id: uuid::Uuid,
        loan_id: uuid::Uuid,
    },

    #[error("serialization conflict, retry the operation: {message}")]
    SerializationConflict {
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LedgerError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// true for failures a caller may resolve by retrying the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::SerializationConflict { .. })
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                LedgerError::SerializationConflict {
                    message: err.to_string(),
                }
            }
            _ => LedgerError::Storage {
                message: err.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_serialization_conflict() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        let err = LedgerError::from(busy);
        assert!(matches!(err, LedgerError::SerializationConflict { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_failures_map_to_storage() {
        let err = LedgerError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, LedgerError::Storage { .. }));
        assert!(!err.is_retryable());
    }
}
