//! In-memory ledger for simulations and tests.

use super::{
    Ledger,
    errors::{LedgerError, LedgerResult},
    models::{Balance, PlayerId},
};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Book {
    balances: HashMap<PlayerId, Balance>,
    settled: HashSet<Uuid>,
}

/// Ledger keeping balances in a shared map.
///
/// Every mutation runs under a single write guard, so concurrent rounds for
/// the same player are linearized.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    book: Arc<RwLock<Book>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger with pre-opened accounts
    pub fn with_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (PlayerId, Balance)>,
    {
        let balances = accounts
            .into_iter()
            .map(|(player, balance)| (player, balance.max(0)))
            .collect();
        Self {
            book: Arc::new(RwLock::new(Book {
                balances,
                settled: HashSet::new(),
            })),
        }
    }

    /// Whether `round` has been settled.
    pub async fn is_settled(&self, round: Uuid) -> bool {
        self.book.read().await.settled.contains(&round)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_balance(&self, player: PlayerId) -> LedgerResult<Balance> {
        self.book
            .read()
            .await
            .balances
            .get(&player)
            .copied()
            .ok_or(LedgerError::AccountNotFound(player))
    }

    async fn try_debit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut book = self.book.write().await;
        let balance = book
            .balances
            .get_mut(&player)
            .ok_or(LedgerError::AccountNotFound(player))?;

        if *balance < amount {
            return Err(LedgerError::InsufficientFunds {
                available: *balance,
                required: amount,
            });
        }

        *balance -= amount;
        Ok(*balance)
    }

    async fn credit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut book = self.book.write().await;
        let balance = book
            .balances
            .get_mut(&player)
            .ok_or(LedgerError::AccountNotFound(player))?;

        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(*balance)
    }

    async fn settle_round(
        &self,
        player: PlayerId,
        round: Uuid,
        amount: i64,
    ) -> LedgerResult<Balance> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut book = self.book.write().await;
        let Book { balances, settled } = &mut *book;
        let balance = balances
            .get_mut(&player)
            .ok_or(LedgerError::AccountNotFound(player))?;

        if settled.contains(&round) {
            return Ok(*balance);
        }
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        settled.insert(round);
        Ok(*balance)
    }

    async fn adjust(&self, player: PlayerId, delta: i64) -> LedgerResult<Balance> {
        let mut book = self.book.write().await;
        let balance = book
            .balances
            .get_mut(&player)
            .ok_or(LedgerError::AccountNotFound(player))?;

        *balance = balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow)?
            .max(0);
        Ok(*balance)
    }

    async fn open_account(&self, player: PlayerId, initial: Balance) -> LedgerResult<Balance> {
        if initial < 0 {
            return Err(LedgerError::InvalidAmount(initial));
        }

        let mut book = self.book.write().await;
        Ok(*book.balances.entry(player).or_insert(initial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debit_and_credit() {
        let ledger = MemoryLedger::with_accounts([(1, 1_000)]);
        assert_eq!(ledger.try_debit(1, 300).await.unwrap(), 700);
        assert_eq!(ledger.credit(1, 50).await.unwrap(), 750);
        assert_eq!(ledger.get_balance(1).await.unwrap(), 750);
    }

    #[tokio::test]
    async fn test_debit_rejects_overdraw() {
        let ledger = MemoryLedger::with_accounts([(1, 100)]);
        let err = ledger.try_debit(1, 101).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                available: 100,
                required: 101
            }
        ));
        assert_eq!(ledger.get_balance(1).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_debit_rejects_non_positive_amount() {
        let ledger = MemoryLedger::with_accounts([(1, 100)]);
        assert!(matches!(
            ledger.try_debit(1, 0).await,
            Err(LedgerError::InvalidAmount(0))
        ));
    }

    #[tokio::test]
    async fn test_credit_rejects_negative_amount() {
        let ledger = MemoryLedger::with_accounts([(1, 100)]);
        assert!(matches!(
            ledger.credit(1, -5).await,
            Err(LedgerError::InvalidAmount(-5))
        ));
    }

    #[tokio::test]
    async fn test_adjust_clamps_at_zero() {
        let ledger = MemoryLedger::with_accounts([(1, 100)]);
        assert_eq!(ledger.adjust(1, -250).await.unwrap(), 0);
        assert_eq!(ledger.adjust(1, 40).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_credit_overflow_detected() {
        let ledger = MemoryLedger::with_accounts([(1, i64::MAX - 1)]);
        assert!(matches!(
            ledger.credit(1, 2).await,
            Err(LedgerError::BalanceOverflow)
        ));
    }

    #[tokio::test]
    async fn test_settle_round_pays_once() {
        let ledger = MemoryLedger::with_accounts([(1, 100)]);
        let round = Uuid::new_v4();

        assert_eq!(ledger.settle_round(1, round, 50).await.unwrap(), 150);
        ledger.try_debit(1, 20).await.unwrap();
        // A replay reports the current balance and credits nothing.
        assert_eq!(ledger.settle_round(1, round, 50).await.unwrap(), 130);
        assert!(ledger.is_settled(round).await);

        assert_eq!(ledger.settle_round(1, Uuid::new_v4(), 5).await.unwrap(), 135);
    }

    #[tokio::test]
    async fn test_settle_round_unknown_account_is_not_marked() {
        let ledger = MemoryLedger::new();
        let round = Uuid::new_v4();
        assert!(matches!(
            ledger.settle_round(3, round, 10).await,
            Err(LedgerError::AccountNotFound(3))
        ));
        assert!(!ledger.is_settled(round).await);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let ledger = MemoryLedger::new();
        assert!(matches!(
            ledger.get_balance(9).await,
            Err(LedgerError::AccountNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_open_account_is_idempotent() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.open_account(5, 1_000).await.unwrap(), 1_000);
        ledger.try_debit(5, 100).await.unwrap();
        assert_eq!(ledger.open_account(5, 1_000).await.unwrap(), 900);
    }
}
