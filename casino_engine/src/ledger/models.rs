//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque player identifier supplied by the identity collaborator.
pub type PlayerId = i64;

/// Whole units of virtual currency. Never negative once stored.
pub type Balance = i64;

/// Balance row as stored by the PostgreSQL ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub player_id: PlayerId,
    pub balance: Balance,
    pub updated_at: DateTime<Utc>,
}
