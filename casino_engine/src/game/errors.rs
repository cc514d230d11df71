//! Game error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ledger::{LedgerError, PlayerId};

/// Errors surfaced by a game round
#[derive(Debug, Error)]
pub enum GameError {
    /// Wager is not positive or exceeds the balance
    #[error("Invalid wager: {0}")]
    InvalidWager(String),

    /// Malformed game parameters
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Balance could not cover the wager at debit time
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    /// Ledger failure
    #[error("Persistence error: {0}")]
    Persistence(#[source] LedgerError),

    /// Round state broke an internal rule (e.g. deck exhausted mid-hand)
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// Winnings were computed but the credit could not be committed
    #[error("Unsettled credit of {amount} for player {player}")]
    UnsettledCredit { player: PlayerId, amount: i64 },

    /// No blackjack hand in flight for this player
    #[error("No active round")]
    NoActiveRound,

    /// A blackjack hand is already in flight for this player
    #[error("Round already in progress")]
    RoundInProgress,

    /// The promotion was already claimed inside its cooldown
    #[error("Promotion already claimed, next claim at {next_claim_at}")]
    CooldownActive { next_claim_at: DateTime<Utc> },

    /// Symbol table rarities are invalid
    #[error("Invalid symbol table: {0}")]
    InvalidSymbolTable(String),
}

impl GameError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            GameError::Persistence(e) => e.client_message(),
            GameError::InternalInconsistency(_) => "Internal server error".to_string(),
            GameError::UnsettledCredit { amount, .. } => {
                format!("Winnings of {amount} are pending settlement")
            }
            _ => self.to_string(),
        }
    }

    /// Whether the round was rejected before any balance change.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GameError::InvalidWager(_)
                | GameError::InvalidSelection(_)
                | GameError::NoActiveRound
                | GameError::RoundInProgress
                | GameError::CooldownActive { .. }
        )
    }
}

impl From<LedgerError> for GameError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                available,
                required,
            } => GameError::InsufficientFunds {
                available,
                required,
            },
            other => GameError::Persistence(other),
        }
    }
}

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_insufficient_funds_maps_from_ledger() {
        let err: GameError = LedgerError::InsufficientFunds {
            available: 5,
            required: 10,
        }
        .into();
        assert!(matches!(
            err,
            GameError::InsufficientFunds {
                available: 5,
                required: 10
            }
        ));
    }

    #[test]
    fn test_storage_failure_maps_to_persistence() {
        let err: GameError = LedgerError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(err, GameError::Persistence(_)));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_unsettled_credit_message_hides_player() {
        let err = GameError::UnsettledCredit {
            player: 31337,
            amount: 200,
        };
        assert!(!err.client_message().contains("31337"));
        assert!(err.client_message().contains("200"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(GameError::InvalidWager("zero".into()).is_validation());
        assert!(GameError::NoActiveRound.is_validation());
        assert!(!GameError::InternalInconsistency("deck".into()).is_validation());
        assert!(
            GameError::CooldownActive {
                next_claim_at: Utc::now()
            }
            .is_validation()
        );
    }
}
