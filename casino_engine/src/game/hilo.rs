//! Hi-lo against a single house-wide card.
//!
//! Every round compares a fresh card (drawn with replacement) with the
//! current card, then makes the fresh card current. Win streaks are tracked
//! per player and raise the higher/lower payout up to a 5x cap.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr};

use super::{entities::Card, errors::GameError};
use crate::{ledger::PlayerId, rng::RandomSource};

/// Streaks past this no longer raise the multiplier (1 + 0.1 * 40 = 5).
pub const STREAK_CAP: u32 = 40;
/// A correct tie pays this multiple of the wager.
pub const TIE_MULTIPLIER: i64 = 10;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Guess {
    Higher,
    Lower,
    Tie,
}

impl FromStr for Guess {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "higher" => Ok(Self::Higher),
            "lower" => Ok(Self::Lower),
            "tie" => Ok(Self::Tie),
            _ => Err(GameError::InvalidSelection(format!("invalid guess: {s}"))),
        }
    }
}

impl Guess {
    pub fn is_correct(self, current: u8, next: u8) -> bool {
        match self {
            Self::Higher => next > current,
            Self::Lower => next < current,
            Self::Tie => next == current,
        }
    }
}

/// Net payout of a correct guess, excluding the returned stake.
///
/// For higher/lower, `k` ranks out of 12 satisfy the guess. When
/// `0 < k < 6` the base odds are `(12 - k) / k`, otherwise even money. The
/// streak multiplier is `(10 + min(streak, 40)) / 10`. Everything is kept in
/// integers and floored once at the end.
pub fn winning_payout(wager: i64, current: u8, guess: Guess, streak: u32) -> i64 {
    let k = match guess {
        Guess::Tie => return wager.saturating_mul(TIE_MULTIPLIER),
        Guess::Higher => 13 - i128::from(current),
        Guess::Lower => i128::from(current) - 1,
    };
    let wager = i128::from(wager);
    let boost = 10 + i128::from(streak.min(STREAK_CAP));

    let payout = if k > 0 && k < 6 {
        wager * (12 - k) * boost / (k * 10)
    } else {
        wager * boost / 10
    };
    payout.clamp(0, i128::from(i64::MAX)) as i64
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HiLoOutcome {
    pub card_from: Card,
    pub card_to: Card,
    pub guess: Guess,
    pub won: bool,
    /// Streak after this round.
    pub streak: u32,
}

/// Current card plus per-player streaks, guarded together by the engine.
#[derive(Clone, Debug)]
pub struct HiLoTable {
    current: Card,
    streaks: HashMap<PlayerId, u32>,
}

impl HiLoTable {
    pub fn new(rng: &mut dyn RandomSource) -> Self {
        Self::with_card(Card::random(rng))
    }

    pub fn with_card(current: Card) -> Self {
        Self {
            current,
            streaks: HashMap::new(),
        }
    }

    pub fn current(&self) -> Card {
        self.current
    }

    pub fn streak(&self, player: PlayerId) -> u32 {
        self.streaks.get(&player).copied().unwrap_or(0)
    }

    /// Draw the next card, settle `guess` and advance the table.
    ///
    /// Returns the outcome and the gross return (stake plus payout on a
    /// win, 0 on a loss).
    pub fn play(
        &mut self,
        player: PlayerId,
        guess: Guess,
        wager: i64,
        rng: &mut dyn RandomSource,
    ) -> (HiLoOutcome, i64) {
        let card_from = self.current;
        let card_to = Card::random(rng);
        let streak = self.streak(player);

        let won = guess.is_correct(card_from.rank(), card_to.rank());
        let (returned, new_streak) = if won {
            let payout = winning_payout(wager, card_from.rank(), guess, streak);
            (wager.saturating_add(payout), streak.saturating_add(1))
        } else {
            (0, 0)
        };

        if new_streak == 0 {
            self.streaks.remove(&player);
        } else {
            self.streaks.insert(player, new_streak);
        }
        self.current = card_to;

        (
            HiLoOutcome {
                card_from,
                card_to,
                guess,
                won,
                streak: new_streak,
            },
            returned,
        )
    }
}
