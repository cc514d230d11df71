//! Free-currency promotions: the daily cash bonus, the daily coin drop and
//! the prize wheel.
//!
//! Each promotion can be claimed once per cooldown window. The claim is
//! recorded in a [`ClaimStore`] before the amount is credited, so two
//! concurrent claims can never both pay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use uuid::Uuid;

pub mod claims;

pub use claims::{ClaimDecision, ClaimStore, MemoryClaimStore, PgClaimStore};

use crate::{game::GameError, ledger::Balance, rng::RandomSource};

/// Daily cash bonus
pub const DAILY_CASH: i64 = 100;

/// Daily free coins
pub const DAILY_COINS: i64 = 1_500;

/// Prize wheel sectors, clockwise from the pointer's rest position.
pub const WHEEL_SECTORS: [i64; 8] = [50, 100, 200, 75, 150, 125, 300, 100];

/// Window between two claims of the same promotion
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PromotionKind {
    DailyCash,
    DailyCoins,
    PrizeWheel,
}

impl PromotionKind {
    /// Key stored in the claims table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyCash => "daily_cash",
            Self::DailyCoins => "daily_coins",
            Self::PrizeWheel => "prize_wheel",
        }
    }
}

impl fmt::Display for PromotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromotionKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_cash" => Ok(Self::DailyCash),
            "daily_coins" => Ok(Self::DailyCoins),
            "prize_wheel" => Ok(Self::PrizeWheel),
            other => Err(GameError::InvalidSelection(format!(
                "unknown promotion: {other}"
            ))),
        }
    }
}

/// Where the wheel stopped.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WheelSpin {
    pub sector: usize,
    pub prize: i64,
}

/// Spin the prize wheel. Every sector is equally likely.
pub fn spin_wheel(rng: &mut dyn RandomSource) -> WheelSpin {
    let sector = rng.draw_int(WHEEL_SECTORS.len()) % WHEEL_SECTORS.len();
    WheelSpin {
        sector,
        prize: WHEEL_SECTORS[sector],
    }
}

/// A credited promotion.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PromotionAward {
    pub claim_id: Uuid,
    pub kind: PromotionKind,
    pub amount: i64,
    /// Set for the prize wheel only.
    pub wheel: Option<WheelSpin>,
    pub new_balance: Balance,
    pub next_claim_at: DateTime<Utc>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedSource;

    #[test]
    fn test_wheel_sector_lookup() {
        let mut rng = ScriptedSource::new().with_ints([0, 2, 6, 7]);
        let prizes: Vec<i64> = (0..4).map(|_| spin_wheel(&mut rng).prize).collect();
        assert_eq!(prizes, vec![50, 200, 300, 100]);
    }

    #[test]
    fn test_wheel_sector_stays_on_the_wheel() {
        let mut rng = ScriptedSource::new().with_ints([15]);
        let spin = spin_wheel(&mut rng);
        assert_eq!(spin.sector, 7);
        assert_eq!(spin.prize, 100);
    }

    #[test]
    fn test_kind_round_trips_through_its_key() {
        for kind in [
            PromotionKind::DailyCash,
            PromotionKind::DailyCoins,
            PromotionKind::PrizeWheel,
        ] {
            assert_eq!(kind.as_str().parse::<PromotionKind>().unwrap(), kind);
        }
        assert!(matches!(
            "lottery".parse::<PromotionKind>(),
            Err(GameError::InvalidSelection(_))
        ));
    }
}
