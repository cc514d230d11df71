//! Balance ledger: the only writer of a player's stored currency.
//!
//! Every adjustment is a single atomic read-modify-write:
//! - PostgreSQL: one conditional `UPDATE ... RETURNING balance` statement
//! - In-memory: one write guard held for the whole adjustment
//!
//! Balances never go negative. Debits that would overdraw are rejected,
//! signed adjustments clamp at zero.
//!
//! Winnings go through [`Ledger::settle_round`], which credits a round at
//! most once. A settlement whose acknowledgement was lost (e.g. a query
//! timeout after the commit) can be retried without paying twice.
//!
//! ## Example
//!
//! ```no_run
//! use casino_engine::db::Database;
//! use casino_engine::ledger::{Ledger, PgLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect(&Default::default()).await?;
//!     let ledger = PgLedger::new(db.shared_pool());
//!
//!     ledger.open_account(1, 10_000).await?;
//!     let balance = ledger.try_debit(1, 250).await?;
//!     println!("Balance after wager: {balance}");
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use uuid::Uuid;

pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;

pub use errors::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use models::{Account, Balance, PlayerId};
pub use postgres::PgLedger;

/// Atomic balance operations consumed by the game engine.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance for a player
    async fn get_balance(&self, player: PlayerId) -> LedgerResult<Balance>;

    /// Debit `amount` only if the balance covers it. Returns the new balance.
    async fn try_debit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance>;

    /// Credit a non-negative `amount`. Returns the new balance.
    async fn credit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance>;

    /// Credit `amount` for `round` unless that round was already settled.
    /// Returns the balance afterwards either way.
    async fn settle_round(
        &self,
        player: PlayerId,
        round: Uuid,
        amount: i64,
    ) -> LedgerResult<Balance>;

    /// Apply `balance = max(balance + delta, 0)`. Returns the new balance.
    async fn adjust(&self, player: PlayerId, delta: i64) -> LedgerResult<Balance>;

    /// Create the account with `initial` if it doesn't exist yet. Returns the
    /// balance the account holds afterwards.
    async fn open_account(&self, player: PlayerId, initial: Balance) -> LedgerResult<Balance>;
}
