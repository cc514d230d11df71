//! Ledger error types.

use crate::db::timeouts::TimeoutError;
use std::time::Duration;
use thiserror::Error;

use super::models::PlayerId;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage did not answer in time
    #[error("Ledger operation timed out after {0:?}")]
    Timeout(Duration),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    /// Account not found
    #[error("Account not found for player {0}")]
    AccountNotFound(PlayerId),

    /// Invalid amount (negative credit or non-positive debit)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Balance would overflow
    #[error("Balance overflow")]
    BalanceOverflow,
}

impl LedgerError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::Timeout(_) => {
                "Internal server error".to_string()
            }
            LedgerError::AccountNotFound(_) => "Account not found".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the failure came from the storage layer rather than a rule.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, LedgerError::Database(_) | LedgerError::Timeout(_))
    }
}

impl From<TimeoutError> for LedgerError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(after) => LedgerError::Timeout(after),
            TimeoutError::Database(e) => LedgerError::Database(e),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
