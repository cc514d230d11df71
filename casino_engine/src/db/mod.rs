//! PostgreSQL connection pooling for the ledger and round reporter.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

pub mod config;
pub mod timeouts;

pub use config::DatabaseConfig;
use timeouts::{TimeoutResult, with_default_timeout};

/// Creates the ledger, history and promotion tables when missing.
const SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Shared pool handed to [`crate::PgLedger`] and [`crate::PgRoundReporter`].
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Open a pool sized by `config`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use casino_engine::{PgLedger, PgRoundReporter};
    /// use casino_engine::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    ///     let ledger = PgLedger::new(db.shared_pool());
    ///     let reporter = PgRoundReporter::new(db.shared_pool());
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Database pool ready ({}-{} connections)",
            config.min_connections,
            config.max_connections
        );
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// [`Database::new`] followed by [`Database::ensure_schema`].
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let db = Self::new(config).await?;
        db.ensure_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Pool handle for the ledger and reporter constructors.
    pub fn shared_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Idempotent; safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(self.pool()).await?;
        Ok(())
    }

    /// Round-trip a trivial query within the default query timeout.
    pub async fn health_check(&self) -> TimeoutResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(self.pool())).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
