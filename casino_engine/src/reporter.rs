//! Round history: records that a round was played and lists a player's
//! most recent games.
//!
//! Reporting is a side effect only. The engine logs a failed report and
//! keeps the already-committed payout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    db::timeouts::{TimeoutError, with_default_timeout},
    game::GameKind,
    ledger::PlayerId,
};

/// Reporter errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage did not answer in time
    #[error("Report timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TimeoutError> for ReportError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(after) => ReportError::Timeout(after),
            TimeoutError::Database(e) => ReportError::Database(e),
        }
    }
}

/// Result type for reporter operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Latest play of one game.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecentGame {
    pub game: GameKind,
    pub played_at: DateTime<Utc>,
}

#[async_trait]
pub trait RoundReporter: Send + Sync {
    /// Record that `player` finished a round of `game` at `played_at`.
    async fn record_round(
        &self,
        player: PlayerId,
        game: GameKind,
        played_at: DateTime<Utc>,
    ) -> ReportResult<()>;

    /// The latest play of each game, newest first, at most `limit` entries.
    async fn recent_games(&self, player: PlayerId, limit: usize) -> ReportResult<Vec<RecentGame>>;
}

/// Reporter backed by the `game_plays` table
#[derive(Clone)]
pub struct PgRoundReporter {
    pool: Arc<PgPool>,
}

impl PgRoundReporter {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoundReporter for PgRoundReporter {
    async fn record_round(
        &self,
        player: PlayerId,
        game: GameKind,
        played_at: DateTime<Utc>,
    ) -> ReportResult<()> {
        with_default_timeout(
            sqlx::query("INSERT INTO game_plays (user_id, game, played_at) VALUES ($1, $2, $3)")
                .bind(player)
                .bind(game.as_str())
                .bind(played_at.naive_utc())
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }

    async fn recent_games(&self, player: PlayerId, limit: usize) -> ReportResult<Vec<RecentGame>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT game, MAX(played_at) AS played_at
                 FROM game_plays
                 WHERE user_id = $1
                 GROUP BY game
                 ORDER BY played_at DESC
                 LIMIT $2",
            )
            .bind(player)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let name: String = row.get("game");
                match name.parse::<GameKind>() {
                    Ok(game) => Some(RecentGame {
                        game,
                        played_at: row.get::<chrono::NaiveDateTime, _>("played_at").and_utc(),
                    }),
                    Err(_) => {
                        log::debug!("Skipping history row for unknown game {name:?}");
                        None
                    }
                }
            })
            .collect())
    }
}

/// Reporter keeping history in memory.
#[derive(Clone, Default)]
pub struct MemoryReporter {
    plays: Arc<RwLock<Vec<(PlayerId, GameKind, DateTime<Utc>)>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rounds recorded for `player`.
    pub async fn rounds_for(&self, player: PlayerId) -> usize {
        self.plays
            .read()
            .await
            .iter()
            .filter(|(p, _, _)| *p == player)
            .count()
    }
}

#[async_trait]
impl RoundReporter for MemoryReporter {
    async fn record_round(
        &self,
        player: PlayerId,
        game: GameKind,
        played_at: DateTime<Utc>,
    ) -> ReportResult<()> {
        self.plays.write().await.push((player, game, played_at));
        Ok(())
    }

    async fn recent_games(&self, player: PlayerId, limit: usize) -> ReportResult<Vec<RecentGame>> {
        let plays = self.plays.read().await;
        let mut latest: HashMap<GameKind, DateTime<Utc>> = HashMap::new();
        for &(_, game, at) in plays.iter().filter(|(p, _, _)| *p == player) {
            let entry = latest.entry(game).or_insert(at);
            if at > *entry {
                *entry = at;
            }
        }

        let mut recent: Vec<RecentGame> = latest
            .into_iter()
            .map(|(game, played_at)| RecentGame { game, played_at })
            .collect();
        recent.sort_by(|a, b| b.played_at.cmp(&a.played_at));
        recent.truncate(limit);
        Ok(recent)
    }
}
