//! PostgreSQL ledger with single-statement atomic balance updates.
#![allow(clippy::needless_raw_string_hashes)]

use super::{
    Ledger,
    errors::{LedgerError, LedgerResult},
    models::{Account, Balance, PlayerId},
};
use crate::db::timeouts::with_default_timeout;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Ledger backed by the `wallets` table
#[derive(Clone)]
pub struct PgLedger {
    pool: Arc<PgPool>,
}

impl PgLedger {
    /// Create a new ledger
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get the full account row for a player
    ///
    /// # Errors
    ///
    /// * `LedgerError::AccountNotFound` - No wallet row for the player
    pub async fn get_account(&self, player: PlayerId) -> LedgerResult<Account> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                SELECT user_id, balance, updated_at
                FROM wallets
                WHERE user_id = $1
                "#,
            )
            .bind(player)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(player))?;

        Ok(Account {
            player_id: row.get("user_id"),
            balance: row.get("balance"),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Explain why a guarded update touched no row.
    async fn rejection_reason(&self, player: PlayerId, required: i64) -> LedgerError {
        match self.get_balance(player).await {
            Ok(available) => LedgerError::InsufficientFunds {
                available,
                required,
            },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn get_balance(&self, player: PlayerId) -> LedgerResult<Balance> {
        let row = with_default_timeout(
            sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
                .bind(player)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(player))?;

        Ok(row.get("balance"))
    }

    async fn try_debit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        // Check and decrement in one statement so two concurrent rounds
        // can never both spend the same funds.
        let row = with_default_timeout(
            sqlx::query(
                "UPDATE wallets
                 SET balance = balance - $1, updated_at = NOW()
                 WHERE user_id = $2 AND balance >= $1
                 RETURNING balance",
            )
            .bind(amount)
            .bind(player)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        match row {
            Some(row) => Ok(row.get("balance")),
            None => Err(self.rejection_reason(player, amount).await),
        }
    }

    async fn credit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let row = with_default_timeout(
            sqlx::query(
                "UPDATE wallets
                 SET balance = balance + $1, updated_at = NOW()
                 WHERE user_id = $2 AND balance <= $3 - $1
                 RETURNING balance",
            )
            .bind(amount)
            .bind(player)
            .bind(i64::MAX)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        match row {
            Some(row) => Ok(row.get("balance")),
            None => match self.get_balance(player).await {
                Ok(_) => Err(LedgerError::BalanceOverflow),
                Err(e) => Err(e),
            },
        }
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

        // The marker row and the credit commit together. A replay finds the
        // marker and only reads the balance.
        let settle = async {
            let mut tx = self.pool.begin().await?;

            let marked = sqlx::query(
                "INSERT INTO settled_rounds (round_id, user_id, amount)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (round_id) DO NOTHING",
            )
            .bind(round)
            .bind(player)
            .bind(amount)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let row = if marked == 1 {
                sqlx::query(
                    "UPDATE wallets
                     SET balance = balance + $1, updated_at = NOW()
                     WHERE user_id = $2 AND balance <= $3 - $1
                     RETURNING balance",
                )
                .bind(amount)
                .bind(player)
                .bind(i64::MAX)
                .fetch_optional(&mut *tx)
                .await?
            } else {
                sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
                    .bind(player)
                    .fetch_optional(&mut *tx)
                    .await?
            };

            let balance: Option<Balance> = row.map(|row| row.get("balance"));
            if balance.is_some() {
                tx.commit().await?;
            }
            Ok::<_, sqlx::Error>(balance)
        };

        match with_default_timeout(settle).await? {
            Some(balance) => Ok(balance),
            None => match self.get_balance(player).await {
                Ok(_) => Err(LedgerError::BalanceOverflow),
                Err(e) => Err(e),
            },
        }
    }

    async fn adjust(&self, player: PlayerId, delta: i64) -> LedgerResult<Balance> {
        let row = with_default_timeout(
            sqlx::query(
                "UPDATE wallets
                 SET balance = GREATEST(balance + $1, 0), updated_at = NOW()
                 WHERE user_id = $2
                 RETURNING balance",
            )
            .bind(delta)
            .bind(player)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(LedgerError::AccountNotFound(player))?;

        Ok(row.get("balance"))
    }

    async fn open_account(&self, player: PlayerId, initial: Balance) -> LedgerResult<Balance> {
        if initial < 0 {
            return Err(LedgerError::InvalidAmount(initial));
        }

        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = with_default_timeout(
            sqlx::query(
                "INSERT INTO wallets (user_id, balance, updated_at)
                 VALUES ($1, $2, NOW())
                 ON CONFLICT (user_id)
                 DO UPDATE SET user_id = EXCLUDED.user_id
                 RETURNING balance",
            )
            .bind(player)
            .bind(initial)
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        Ok(row.get("balance"))
    }
}
