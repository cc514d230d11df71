//! Engine tuning loaded from the environment.

use std::time::Duration;

use crate::{
    config::{ConfigError, parse_env_or},
    promotions::DEFAULT_COOLDOWN,
};

/// Game odds, jackpot pools and settlement retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Chance that a basic spin lands the same symbol on every reel
    pub slot_all_same_chance: f64,

    /// Chance that a winning progressive spin also takes the pool
    pub progressive_jackpot_chance: f64,

    /// Progressive slot pool after a reset
    pub progressive_jackpot_base: i64,

    /// Keno pool after a reset
    pub keno_jackpot_base: i64,

    /// Share of each wager fed to its game's pool, in basis points
    pub jackpot_contribution_bps: i64,

    /// Total credit attempts before a win is escalated as unsettled
    pub credit_retry_attempts: u32,

    /// Backoff before the first credit retry; doubles on each retry
    pub credit_retry_backoff: Duration,

    /// Window between two claims of the same promotion
    pub promotion_cooldown: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_all_same_chance: 0.08,
            progressive_jackpot_chance: 0.001,
            progressive_jackpot_base: 500_000,
            keno_jackpot_base: 50_000,
            jackpot_contribution_bps: 100,
            credit_retry_attempts: 3,
            credit_retry_backoff: Duration::from_millis(50),
            promotion_cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Missing or unparsable values fall back to [`EngineConfig::default`]:
    /// - `SLOT_ALL_SAME_CHANCE` (0.08)
    /// - `PROGRESSIVE_JACKPOT_CHANCE` (0.001)
    /// - `PROGRESSIVE_JACKPOT_BASE` (500000)
    /// - `KENO_JACKPOT_BASE` (50000)
    /// - `JACKPOT_CONTRIBUTION_BPS` (100)
    /// - `CREDIT_RETRY_ATTEMPTS` (3)
    /// - `CREDIT_RETRY_BACKOFF_MS` (50)
    /// - `PROMOTION_COOLDOWN_SECS` (86400)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a parsed value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            slot_all_same_chance: parse_env_or("SLOT_ALL_SAME_CHANCE", defaults.slot_all_same_chance),
            progressive_jackpot_chance: parse_env_or(
                "PROGRESSIVE_JACKPOT_CHANCE",
                defaults.progressive_jackpot_chance,
            ),
            progressive_jackpot_base: parse_env_or(
                "PROGRESSIVE_JACKPOT_BASE",
                defaults.progressive_jackpot_base,
            ),
            keno_jackpot_base: parse_env_or("KENO_JACKPOT_BASE", defaults.keno_jackpot_base),
            jackpot_contribution_bps: parse_env_or(
                "JACKPOT_CONTRIBUTION_BPS",
                defaults.jackpot_contribution_bps,
            ),
            credit_retry_attempts: parse_env_or(
                "CREDIT_RETRY_ATTEMPTS",
                defaults.credit_retry_attempts,
            ),
            credit_retry_backoff: Duration::from_millis(parse_env_or(
                "CREDIT_RETRY_BACKOFF_MS",
                defaults.credit_retry_backoff.as_millis() as u64,
            )),
            promotion_cooldown: Duration::from_secs(parse_env_or(
                "PROMOTION_COOLDOWN_SECS",
                defaults.promotion_cooldown.as_secs(),
            )),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (var, chance) in [
            ("SLOT_ALL_SAME_CHANCE", self.slot_all_same_chance),
            ("PROGRESSIVE_JACKPOT_CHANCE", self.progressive_jackpot_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must be between 0 and 1, got {chance}"),
                });
            }
        }

        for (var, base) in [
            ("PROGRESSIVE_JACKPOT_BASE", self.progressive_jackpot_base),
            ("KENO_JACKPOT_BASE", self.keno_jackpot_base),
        ] {
            if base < 0 {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must not be negative".to_string(),
                });
            }
        }

        if !(0..=10_000).contains(&self.jackpot_contribution_bps) {
            return Err(ConfigError::Invalid {
                var: "JACKPOT_CONTRIBUTION_BPS".to_string(),
                reason: "Must be between 0 and 10000".to_string(),
            });
        }

        if self.credit_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "CREDIT_RETRY_ATTEMPTS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
