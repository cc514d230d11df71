//! Database configuration module.
//!
//! Pool sizing and timeouts for the PostgreSQL ledger and reporter.

use sqlx::postgres::PgConnectOptions;

use crate::config::{ConfigError, parse_env_or};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` if `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "e.g. postgres://casino@localhost/casino".to_string(),
            })?;

        let config = Self::from_url(database_url);
        config.validate()?;
        Ok(config)
    }

    /// Pool settings from the environment with an explicit URL
    pub fn from_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 2),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT", 10),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", 1800),
        }
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/casino` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/casino".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Connection target without the password, for logs.
    pub fn redacted_url(&self) -> String {
        match self.database_url.parse::<PgConnectOptions>() {
            Ok(options) => format!(
                "postgres://{}@{}:{}/{}",
                options.get_username(),
                options.get_host(),
                options.get_port(),
                options.get_database().unwrap_or_default()
            ),
            Err(_) => "<unparsable database URL>".to_string(),
        }
    }

    /// Check pool bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Must not exceed max connections ({})",
                    self.max_connections
                ),
            });
        }

        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
