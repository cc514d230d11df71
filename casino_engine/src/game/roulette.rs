//! Single-zero roulette.

use serde::{Deserialize, Serialize};

use super::{
    entities::{Color, POCKETS, pocket_color},
    errors::{GameError, GameResult},
};
use crate::rng::RandomSource;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Even,
    Odd,
}

/// One bet per spin, each kind carrying its own typed value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RouletteBet {
    Straight(u8),
    Color(Color),
    Parity(Parity),
    Dozen(u8),
    Column(u8),
}

impl RouletteBet {
    /// Build and validate a bet from loosely typed `(kind, value)` strings.
    ///
    /// Kinds: `number`/`straight`, `color`, `parity`, `dozen`, `column`.
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidSelection` - Unknown kind or out-of-range value
    pub fn from_kind_value(kind: &str, value: &str) -> GameResult<Self> {
        let value = value.trim().to_ascii_lowercase();
        let invalid = || GameError::InvalidSelection(format!("invalid {kind} bet: {value}"));
        let number = || value.parse::<u8>().map_err(|_| invalid());

        let bet = match kind.trim().to_ascii_lowercase().as_str() {
            "number" | "straight" => Self::Straight(number()?),
            "color" | "colour" => match value.as_str() {
                "red" => Self::Color(Color::Red),
                "black" => Self::Color(Color::Black),
                _ => return Err(invalid()),
            },
            "parity" => match value.as_str() {
                "even" => Self::Parity(Parity::Even),
                "odd" => Self::Parity(Parity::Odd),
                _ => return Err(invalid()),
            },
            "dozen" => Self::Dozen(number()?),
            "column" => Self::Column(number()?),
            _ => {
                return Err(GameError::InvalidSelection(format!(
                    "unknown bet kind: {kind}"
                )));
            }
        };
        bet.validate()?;
        Ok(bet)
    }

    /// Reject values that cannot win on this wheel.
    pub fn validate(&self) -> GameResult<()> {
        let ok = match *self {
            Self::Straight(n) => n <= 36,
            Self::Color(c) => c != Color::Green,
            Self::Parity(_) => true,
            Self::Dozen(d) | Self::Column(d) => (1..=3).contains(&d),
        };
        if ok {
            Ok(())
        } else {
            Err(GameError::InvalidSelection(format!(
                "bet value out of range: {self:?}"
            )))
        }
    }

    /// Payout multiplier on the stake.
    pub fn multiplier(&self) -> i64 {
        match self {
            Self::Straight(_) => 35,
            Self::Color(_) | Self::Parity(_) => 1,
            Self::Dozen(_) | Self::Column(_) => 2,
        }
    }

    pub fn wins(&self, pocket: u8) -> bool {
        match *self {
            Self::Straight(n) => pocket == n,
            Self::Color(c) => pocket_color(pocket) == Some(c),
            Self::Parity(p) => {
                pocket != 0
                    && match p {
                        Parity::Even => pocket % 2 == 0,
                        Parity::Odd => pocket % 2 == 1,
                    }
            }
            Self::Dozen(d) => pocket != 0 && (pocket - 1) / 12 + 1 == d,
            Self::Column(c) => pocket != 0 && (pocket - 1) % 3 + 1 == c,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RouletteOutcome {
    pub bet: RouletteBet,
    pub pocket: u8,
    pub color: Color,
    /// Net win on the stake, excluding its return.
    pub winnings: i64,
}

/// Pick a pocket uniformly from the wheel.
pub fn spin_wheel(rng: &mut dyn RandomSource) -> u8 {
    POCKETS[rng.draw_int(POCKETS.len())]
}

/// Settle `bet` against `pocket`. Returns the outcome and the gross return.
pub fn settle(bet: RouletteBet, stake: i64, pocket: u8) -> (RouletteOutcome, i64) {
    let winnings = if bet.wins(pocket) {
        stake.saturating_mul(bet.multiplier())
    } else {
        0
    };
    let returned = if winnings > 0 {
        stake.saturating_add(winnings)
    } else {
        0
    };
    (
        RouletteOutcome {
            bet,
            pocket,
            color: pocket_color(pocket).unwrap_or(Color::Green),
            winnings,
        },
        returned,
    )
}
