//! Game resolution logic.
//!
//! Each submodule resolves one game against a [`RandomSource`](crate::rng::RandomSource)
//! without touching balances. The [`engine`](crate::engine) wraps them in the
//! debit/credit pipeline:
//! - Slots: basic 3-reel and progressive 5-reel
//! - Table cards: blackjack (multi-step) and baccarat
//! - Wheel and draw games: roulette, keno, hi-lo

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub mod baccarat;
pub mod blackjack;
pub mod entities;
pub mod errors;
pub mod hilo;
pub mod jackpot;
pub mod keno;
pub mod roulette;
pub mod slots;

pub use errors::{GameError, GameResult};

use crate::ledger::Balance;

/// Games recorded in the round history.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum GameKind {
    Slots,
    ProgressiveSlots,
    Blackjack,
    Baccarat,
    Roulette,
    Keno,
    HiLo,
}

impl GameKind {
    pub const ALL: [GameKind; 7] = [
        GameKind::Slots,
        GameKind::ProgressiveSlots,
        GameKind::Blackjack,
        GameKind::Baccarat,
        GameKind::Roulette,
        GameKind::Keno,
        GameKind::HiLo,
    ];

    /// Name stored in the history table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slots => "Slots",
            Self::ProgressiveSlots => "Progressive Slots",
            Self::Blackjack => "Blackjack",
            Self::Baccarat => "Baccarat",
            Self::Roulette => "Roulette",
            Self::Keno => "Keno",
            Self::HiLo => "Hi-Lo",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "slots" | "slot" => Ok(Self::Slots),
            "progressiveslots" | "progressive" => Ok(Self::ProgressiveSlots),
            "blackjack" => Ok(Self::Blackjack),
            "baccarat" => Ok(Self::Baccarat),
            "roulette" => Ok(Self::Roulette),
            "keno" => Ok(Self::Keno),
            "hilo" => Ok(Self::HiLo),
            _ => Err(GameError::InvalidSelection(format!("unknown game: {s}"))),
        }
    }
}

/// Display-only size class of a win.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum WinTier {
    #[default]
    None,
    Normal,
    Big,
    Mega,
    Jackpot,
}

/// Outcome of one settled round.
///
/// `returned` is the gross amount credited back (stake included when it is
/// returned). `payout` is the signed net result, `returned - wager`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoundResult<O> {
    pub round_id: uuid::Uuid,
    pub game: GameKind,
    pub outcome: O,
    pub wager: i64,
    pub returned: i64,
    pub payout: i64,
    pub new_balance: Balance,
    pub win_tier: WinTier,
    pub message: String,
}

impl<O> RoundResult<O> {
    pub fn is_win(&self) -> bool {
        self.payout > 0
    }
}
