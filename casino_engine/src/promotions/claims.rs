//! Claim bookkeeping: when each player last took each promotion.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use sqlx::{PgPool, Row};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

use super::PromotionKind;
use crate::{
    db::timeouts::with_default_timeout,
    ledger::{LedgerResult, PlayerId},
};

/// Result of a claim attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClaimDecision {
    /// The claim was recorded at the requested time.
    Granted,
    /// The previous claim is still inside the cooldown.
    CoolingDown { next_claim_at: DateTime<Utc> },
}

fn window(cooldown: Duration) -> TimeDelta {
    TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX)
}

fn next_claim(last: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    last.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Record a claim at `now` unless the previous claim of `kind` is less
    /// than `cooldown` old. Check and record are one atomic step.
    async fn try_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> LedgerResult<ClaimDecision>;

    /// Time of the last recorded claim, if any.
    async fn last_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
    ) -> LedgerResult<Option<DateTime<Utc>>>;
}

/// Claim times held in process memory.
#[derive(Clone, Default)]
pub struct MemoryClaimStore {
    claims: Arc<RwLock<HashMap<(PlayerId, PromotionKind), DateTime<Utc>>>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn try_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> LedgerResult<ClaimDecision> {
        let window = window(cooldown);
        let mut claims = self.claims.write().await;

        if let Some(&last) = claims.get(&(player, kind)) {
            let next_claim_at = next_claim(last, window);
            if now < next_claim_at {
                return Ok(ClaimDecision::CoolingDown { next_claim_at });
            }
        }
        claims.insert((player, kind), now);
        Ok(ClaimDecision::Granted)
    }

    async fn last_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
    ) -> LedgerResult<Option<DateTime<Utc>>> {
        Ok(self.claims.read().await.get(&(player, kind)).copied())
    }
}

/// Claim times in the `promotion_claims` table
#[derive(Clone)]
pub struct PgClaimStore {
    pool: Arc<PgPool>,
}

impl PgClaimStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimStore for PgClaimStore {
    async fn try_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> LedgerResult<ClaimDecision> {
        let window = window(cooldown);
        let expired_before = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        // The conditional upsert only touches a row whose claim has expired,
        // so concurrent claims race on a single statement.
        let row = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO promotion_claims (user_id, kind, claimed_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, kind)
                DO UPDATE SET claimed_at = EXCLUDED.claimed_at
                WHERE promotion_claims.claimed_at <= $4
                RETURNING claimed_at
                "#,
            )
            .bind(player)
            .bind(kind.as_str())
            .bind(now.naive_utc())
            .bind(expired_before.naive_utc())
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        if row.is_some() {
            return Ok(ClaimDecision::Granted);
        }

        let last = self.last_claim(player, kind).await?.unwrap_or(now);
        Ok(ClaimDecision::CoolingDown {
            next_claim_at: next_claim(last, window),
        })
    }

    async fn last_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
    ) -> LedgerResult<Option<DateTime<Utc>>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT claimed_at FROM promotion_claims WHERE user_id = $1 AND kind = $2",
            )
            .bind(player)
            .bind(kind.as_str())
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.map(|row| row.get::<NaiveDateTime, _>("claimed_at").and_utc()))
    }
}
