//! Deadlines for ledger and reporter queries.
//!
//! A hung statement must surface as a persistence failure instead of
//! stalling the round that issued it.

use std::{future::Future, time::Duration};
use tokio::time::timeout;

/// Default deadline for a single balance or history query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a query future under `duration`
///
/// # Example
///
/// ```no_run
/// use casino_engine::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
///         .bind(1_i64)
///         .fetch_one(pool),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Run a query future under [`DEFAULT_QUERY_TIMEOUT`]
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
