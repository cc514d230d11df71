//! Punto banco with the standard third-card tableau.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{
    entities::{Card, Deck},
    errors::{GameError, GameResult},
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaccaratSide {
    Player,
    Banker,
    Tie,
}

impl fmt::Display for BaccaratSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Player => "Player",
            Self::Banker => "Banker",
            Self::Tie => "Tie",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for BaccaratSide {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(Self::Player),
            "banker" => Ok(Self::Banker),
            "tie" => Ok(Self::Tie),
            _ => Err(GameError::InvalidSelection(format!(
                "unknown baccarat bet: {s}"
            ))),
        }
    }
}

impl BaccaratSide {
    /// Gross return of a winning bet on this side.
    pub fn winning_return(self, wager: i64) -> i64 {
        match self {
            Self::Player => wager.saturating_mul(2),
            // 5% commission on banker wins.
            Self::Banker => wager.saturating_mul(195) / 100,
            Self::Tie => wager.saturating_mul(9),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BaccaratOutcome {
    pub bet: BaccaratSide,
    pub player_cards: Vec<Card>,
    pub banker_cards: Vec<Card>,
    pub player_total: u32,
    pub banker_total: u32,
    pub natural: bool,
    pub winner: BaccaratSide,
}

/// Hand total: sum of card values mod 10.
pub fn hand_total(cards: &[Card]) -> u32 {
    cards.iter().map(Card::baccarat_value).sum::<u32>() % 10
}

pub fn is_natural(total: u32) -> bool {
    total >= 8
}

/// Whether the banker draws, given the player's third card value if one was drawn.
pub fn banker_draws(banker_total: u32, player_third: Option<u32>) -> bool {
    let Some(p) = player_third else {
        return banker_total <= 5;
    };
    match banker_total {
        0..=2 => true,
        3 => p != 8,
        4 => (2..=7).contains(&p),
        5 => (4..=7).contains(&p),
        6 => (6..=7).contains(&p),
        _ => false,
    }
}

/// Play one coup from `deck`.
///
/// Returns the table and the gross amount owed to the bettor.
///
/// # Errors
///
/// * `GameError::InternalInconsistency` - The deck ran out mid-coup
pub fn play(bet: BaccaratSide, wager: i64, deck: &mut Deck) -> GameResult<(BaccaratOutcome, i64)> {
    let mut draw = || {
        deck.deal_card().ok_or_else(|| {
            GameError::InternalInconsistency("baccarat deck exhausted".to_string())
        })
    };

    let mut player_cards = vec![draw()?, draw()?];
    let mut banker_cards = vec![draw()?, draw()?];

    let natural = is_natural(hand_total(&player_cards)) || is_natural(hand_total(&banker_cards));
    if !natural {
        let mut player_third = None;
        if hand_total(&player_cards) <= 5 {
            let card = draw()?;
            player_third = Some(card.baccarat_value());
            player_cards.push(card);
        }
        if banker_draws(hand_total(&banker_cards), player_third) {
            banker_cards.push(draw()?);
        }
    }

    let player_total = hand_total(&player_cards);
    let banker_total = hand_total(&banker_cards);
    let winner = match player_total.cmp(&banker_total) {
        std::cmp::Ordering::Greater => BaccaratSide::Player,
        std::cmp::Ordering::Less => BaccaratSide::Banker,
        std::cmp::Ordering::Equal => BaccaratSide::Tie,
    };

    let returned = if winner == bet {
        bet.winning_return(wager)
    } else {
        0
    };

    Ok((
        BaccaratOutcome {
            bet,
            player_cards,
            banker_cards,
            player_total,
            banker_total,
            natural,
            winner,
        },
        returned,
    ))
}
