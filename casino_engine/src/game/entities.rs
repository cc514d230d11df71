use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rng::{RandomSource, shuffle};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];

    pub fn is_red(self) -> bool {
        matches!(self, Suit::Diamond | Suit::Heart)
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card ranks.
pub type Value = u8;

/// A card is a tuple of a rank (ace=1u8 ... king=13u8) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    pub fn rank(&self) -> Value {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }

    /// Blackjack value before ace demotion: aces count 11, faces 10.
    pub fn blackjack_value(&self) -> u32 {
        match self.0 {
            1 => 11,
            v if v >= 10 => 10,
            v => u32::from(v),
        }
    }

    /// Baccarat value: aces count 1, tens and faces count 0.
    pub fn baccarat_value(&self) -> u32 {
        match self.0 {
            v if v >= 10 => 0,
            v => u32::from(v),
        }
    }

    /// Draw a card with replacement (rank and suit independently uniform).
    pub fn random(rng: &mut dyn RandomSource) -> Self {
        let rank = rng.draw_int(13) as Value + 1;
        let suit = Suit::ALL[rng.draw_int(Suit::ALL.len())];
        Self(rank, suit)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            1 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// A single-round deck, consumed front to back.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    deck_idx: usize,
}

impl Deck {
    /// Fresh 52-card deck shuffled with `rng`.
    pub fn shuffled(rng: &mut dyn RandomSource) -> Self {
        let mut deck = Self::default();
        shuffle(&mut deck.cards, rng);
        deck
    }

    /// Deck dealing `cards` in the given order.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self { cards, deck_idx: 0 }
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied()?;
        self.deck_idx += 1;
        Some(card)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.deck_idx
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(52);
        for value in 1u8..14u8 {
            for suit in Suit::ALL {
                cards.push(Card(value, suit));
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Green => "green",
            Self::Red => "red",
            Self::Black => "black",
        };
        write!(f, "{repr}")
    }
}

/// European single-zero wheel in physical order.
pub const POCKETS: [u8; 37] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Colour of a roulette pocket. Numbers above 36 are not on the wheel.
pub fn pocket_color(number: u8) -> Option<Color> {
    match number {
        0 => Some(Color::Green),
        n if n > 36 => None,
        n if RED_NUMBERS.contains(&n) => Some(Color::Red),
        _ => Some(Color::Black),
    }
}

/// Keno numbers run 1..=KENO_POOL_SIZE.
pub const KENO_POOL_SIZE: u8 = 80;
pub const KENO_DRAW_SIZE: usize = 20;
pub const KENO_MAX_PICKS: usize = 10;

/// Keno multipliers, row = picks - 1, column = hits.
pub const KENO_PAYOUTS: [&[i64]; KENO_MAX_PICKS] = [
    &[0, 3],
    &[0, 2, 12],
    &[0, 1, 3, 46],
    &[0, 1, 2, 5, 91],
    &[0, 0, 2, 4, 21, 387],
    &[0, 0, 1, 3, 7, 40, 1500],
    &[0, 0, 1, 2, 4, 20, 100, 7500],
    &[0, 0, 0, 2, 3, 9, 44, 335, 25000],
    &[0, 0, 0, 1, 2, 5, 25, 142, 1000, 40000],
    &[0, 0, 0, 0, 2, 4, 17, 70, 400, 1800, 100_000],
];

/// Multiplier for `picks` selected numbers with `hits` matches.
///
/// Anything outside the table pays 0.
pub fn keno_multiplier(picks: usize, hits: usize) -> i64 {
    picks
        .checked_sub(1)
        .and_then(|row| KENO_PAYOUTS.get(row))
        .and_then(|row| row.get(hits))
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{GameRng, ScriptedSource};
    use std::collections::HashSet;

    #[test]
    fn test_default_deck_has_52_unique_cards() {
        let mut deck = Deck::default();
        let mut seen = HashSet::new();
        while let Some(card) = deck.deal_card() {
            assert!((1..=13).contains(&card.rank()));
            seen.insert(card);
        }
        assert_eq!(seen.len(), 52);
        assert_eq!(deck.remaining(), 0);
        assert!(deck.deal_card().is_none());
    }

    #[test]
    fn test_shuffled_deck_is_permutation() {
        let mut rng = GameRng::seeded(99);
        let mut deck = Deck::shuffled(&mut rng);
        let mut cards = Vec::new();
        while let Some(card) = deck.deal_card() {
            cards.push(card);
        }
        cards.sort();
        let mut fresh = Deck::default();
        let mut expected = Vec::new();
        while let Some(card) = fresh.deal_card() {
            expected.push(card);
        }
        expected.sort();
        assert_eq!(cards, expected);
    }

    #[test]
    fn test_stacked_deck_deals_in_order() {
        let mut deck = Deck::stacked(vec![Card(1, Suit::Heart), Card(13, Suit::Club)]);
        assert_eq!(deck.remaining(), 2);
        assert_eq!(deck.deal_card(), Some(Card(1, Suit::Heart)));
        assert_eq!(deck.deal_card(), Some(Card(13, Suit::Club)));
        assert_eq!(deck.deal_card(), None);
    }

    #[test]
    fn test_card_values() {
        assert_eq!(Card(1, Suit::Spade).blackjack_value(), 11);
        assert_eq!(Card(13, Suit::Spade).blackjack_value(), 10);
        assert_eq!(Card(7, Suit::Spade).blackjack_value(), 7);
        assert_eq!(Card(1, Suit::Spade).baccarat_value(), 1);
        assert_eq!(Card(10, Suit::Spade).baccarat_value(), 0);
        assert_eq!(Card(12, Suit::Spade).baccarat_value(), 0);
        assert_eq!(Card(9, Suit::Spade).baccarat_value(), 9);
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card(1, Suit::Heart).to_string(), " A/♥");
        assert_eq!(Card(10, Suit::Club).to_string(), "10/♣");
    }

    #[test]
    fn test_random_card_uses_scripted_rank() {
        let mut rng = ScriptedSource::new().with_ints([6, 3]);
        assert_eq!(Card::random(&mut rng), Card(7, Suit::Heart));
    }

    #[test]
    fn test_wheel_has_every_number_once() {
        let unique: HashSet<u8> = POCKETS.iter().copied().collect();
        assert_eq!(unique.len(), 37);
        assert!(unique.iter().all(|&n| n <= 36));
    }

    #[test]
    fn test_pocket_colors() {
        assert_eq!(pocket_color(0), Some(Color::Green));
        assert_eq!(pocket_color(1), Some(Color::Red));
        assert_eq!(pocket_color(2), Some(Color::Black));
        assert_eq!(pocket_color(36), Some(Color::Red));
        assert_eq!(pocket_color(37), None);
        let reds = (1..=36)
            .filter(|&n| pocket_color(n) == Some(Color::Red))
            .count();
        assert_eq!(reds, 18);
    }

    #[test]
    fn test_keno_table_shape() {
        for (row, payouts) in KENO_PAYOUTS.iter().enumerate() {
            assert_eq!(payouts.len(), row + 2);
        }
        assert_eq!(keno_multiplier(10, 10), 100_000);
        assert_eq!(keno_multiplier(1, 1), 3);
        assert_eq!(keno_multiplier(1, 2), 0);
        assert_eq!(keno_multiplier(0, 0), 0);
        assert_eq!(keno_multiplier(11, 0), 0);
    }
}
