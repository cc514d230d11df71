//! Single-deck blackjack against a dealer who stands on all 17s.
//!
//! A hand moves `Dealing -> PlayerTurn -> DealerTurn -> Resolved`. Naturals
//! resolve at the deal; otherwise the hand waits for `hit`/`stand` calls.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    entities::{Card, Deck},
    errors::{GameError, GameResult},
};
use crate::ledger::Balance;

/// Dealer draws while below this score.
pub const DEALER_STANDS_AT: u32 = 17;
pub const BLACKJACK: u32 = 21;

/// Score a hand, demoting aces from 11 to 1 while it would bust.
pub fn hand_score(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(Card::blackjack_value).sum();
    let mut soft_aces = cards.iter().filter(|c| c.rank() == 1).count();
    while total > BLACKJACK && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total
}

/// Exactly two cards totaling 21.
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_score(cards) == BLACKJACK
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Phase {
    Dealing,
    PlayerTurn,
    DealerTurn,
    Resolved,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Resolution {
    PlayerBlackjack,
    BothBlackjack,
    DealerBlackjack,
    PlayerBust,
    DealerBust,
    PlayerWins,
    DealerWins,
    Push,
}

impl Resolution {
    /// Gross amount credited back for a hand staked at `wager`.
    pub fn returned(self, wager: i64) -> i64 {
        match self {
            Self::PlayerBlackjack => wager.saturating_add(wager.saturating_mul(3) / 2),
            Self::BothBlackjack | Self::Push => wager,
            Self::DealerBust | Self::PlayerWins => wager.saturating_mul(2),
            Self::DealerBlackjack | Self::PlayerBust | Self::DealerWins => 0,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::PlayerBlackjack => "BLACKJACK! You win!",
            Self::BothBlackjack => "Both Blackjack! Push!",
            Self::DealerBlackjack => "Dealer Blackjack! You lose.",
            Self::PlayerBust => "BUST! You lose.",
            Self::DealerBust => "Dealer busts! You win!",
            Self::PlayerWins => "You win!",
            Self::DealerWins => "Dealer wins.",
            Self::Push => "Push!",
        }
    }
}

/// What the player may see of a hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BlackjackView {
    pub round_id: Uuid,
    pub player_cards: Vec<Card>,
    /// Only the up card while the player is still acting.
    pub dealer_cards: Vec<Card>,
    pub player_score: u32,
    pub dealer_score: u32,
    pub wager: i64,
    pub balance_snapshot: Balance,
    pub phase: Phase,
    pub cards_remaining: usize,
}

/// Final table of a resolved hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BlackjackOutcome {
    pub player_cards: Vec<Card>,
    pub dealer_cards: Vec<Card>,
    pub player_score: u32,
    pub dealer_score: u32,
    pub resolution: Resolution,
}

/// One in-flight hand. Owns its deck for the whole round.
#[derive(Clone, Debug)]
pub struct BlackjackHand {
    round_id: Uuid,
    wager: i64,
    balance_snapshot: Balance,
    player_cards: Vec<Card>,
    dealer_cards: Vec<Card>,
    deck: Deck,
    phase: Phase,
    resolution: Option<Resolution>,
}

impl BlackjackHand {
    /// Deal player, dealer, player, dealer and settle any naturals.
    ///
    /// # Arguments
    ///
    /// * `round_id` - Identifier carried through every step of the hand
    /// * `wager` - Stake already debited
    /// * `balance_snapshot` - Balance right after the debit
    /// * `deck` - Deck owned by this hand
    ///
    /// # Errors
    ///
    /// * `GameError::InternalInconsistency` - The deck can't cover the deal
    pub fn deal(
        round_id: Uuid,
        wager: i64,
        balance_snapshot: Balance,
        mut deck: Deck,
    ) -> GameResult<Self> {
        let mut dealt = [None; 4];
        for slot in &mut dealt {
            *slot = deck.deal_card();
        }
        let [Some(p1), Some(d1), Some(p2), Some(d2)] = dealt else {
            return Err(GameError::InternalInconsistency(
                "deck exhausted during the deal".to_string(),
            ));
        };

        let mut hand = Self {
            round_id,
            wager,
            balance_snapshot,
            player_cards: vec![p1, p2],
            dealer_cards: vec![d1, d2],
            deck,
            phase: Phase::Dealing,
            resolution: None,
        };

        let player_natural = is_blackjack(&hand.player_cards);
        let dealer_natural = is_blackjack(&hand.dealer_cards);
        hand.resolution = match (player_natural, dealer_natural) {
            (true, true) => Some(Resolution::BothBlackjack),
            (true, false) => Some(Resolution::PlayerBlackjack),
            (false, true) => Some(Resolution::DealerBlackjack),
            (false, false) => None,
        };
        hand.phase = if hand.resolution.is_some() {
            Phase::Resolved
        } else {
            Phase::PlayerTurn
        };

        Ok(hand)
    }

    pub fn round_id(&self) -> Uuid {
        self.round_id
    }

    pub fn wager(&self) -> i64 {
        self.wager
    }

    /// Balance right after the wager was debited.
    pub fn balance_snapshot(&self) -> Balance {
        self.balance_snapshot
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn player_cards(&self) -> &[Card] {
        &self.player_cards
    }

    pub fn dealer_cards(&self) -> &[Card] {
        &self.dealer_cards
    }

    /// Draw one card for the player.
    ///
    /// Returns the resolution when the hit busts the player or reaches 21,
    /// which hands play to the dealer.
    ///
    /// # Errors
    ///
    /// * `GameError::NoActiveRound` - The hand already resolved
    /// * `GameError::InternalInconsistency` - The deck is exhausted
    pub fn hit(&mut self) -> GameResult<Option<Resolution>> {
        self.ensure_player_turn()?;

        let card = self.deck.deal_card().ok_or_else(|| {
            GameError::InternalInconsistency("deck exhausted on hit".to_string())
        })?;
        self.player_cards.push(card);

        let score = hand_score(&self.player_cards);
        if score > BLACKJACK {
            return Ok(Some(self.resolve(Resolution::PlayerBust)));
        }
        if score == BLACKJACK {
            return Ok(Some(self.play_dealer()));
        }
        Ok(None)
    }

    /// End the player's turn and let the dealer draw.
    ///
    /// # Errors
    ///
    /// * `GameError::NoActiveRound` - The hand already resolved
    pub fn stand(&mut self) -> GameResult<Resolution> {
        self.ensure_player_turn()?;
        Ok(self.play_dealer())
    }

    fn ensure_player_turn(&self) -> GameResult<()> {
        if self.phase == Phase::PlayerTurn {
            Ok(())
        } else {
            Err(GameError::NoActiveRound)
        }
    }

    fn play_dealer(&mut self) -> Resolution {
        self.phase = Phase::DealerTurn;
        while hand_score(&self.dealer_cards) < DEALER_STANDS_AT {
            match self.deck.deal_card() {
                Some(card) => self.dealer_cards.push(card),
                None => break,
            }
        }

        let player = hand_score(&self.player_cards);
        let dealer = hand_score(&self.dealer_cards);
        let resolution = if dealer > BLACKJACK {
            Resolution::DealerBust
        } else if player > dealer {
            Resolution::PlayerWins
        } else if player == dealer {
            Resolution::Push
        } else {
            Resolution::DealerWins
        };
        self.resolve(resolution)
    }

    fn resolve(&mut self, resolution: Resolution) -> Resolution {
        self.phase = Phase::Resolved;
        self.resolution = Some(resolution);
        resolution
    }

    pub fn view(&self) -> BlackjackView {
        let dealer_cards = if self.phase == Phase::Resolved {
            self.dealer_cards.clone()
        } else {
            self.dealer_cards.iter().take(1).copied().collect()
        };
        BlackjackView {
            round_id: self.round_id,
            player_cards: self.player_cards.clone(),
            dealer_score: hand_score(&dealer_cards),
            dealer_cards,
            player_score: hand_score(&self.player_cards),
            wager: self.wager,
            balance_snapshot: self.balance_snapshot,
            phase: self.phase,
            cards_remaining: self.deck.remaining(),
        }
    }

    /// Final table, once resolved.
    pub fn outcome(&self) -> Option<BlackjackOutcome> {
        Some(BlackjackOutcome {
            player_cards: self.player_cards.clone(),
            dealer_cards: self.dealer_cards.clone(),
            player_score: hand_score(&self.player_cards),
            dealer_score: hand_score(&self.dealer_cards),
            resolution: self.resolution?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;

    fn c(rank: u8) -> Card {
        Card(rank, Suit::Spade)
    }

    /// Stack a deck so the deal lands `player` and `dealer` two-card hands,
    /// followed by `rest`.
    fn stacked(player: [u8; 2], dealer: [u8; 2], rest: &[u8]) -> Deck {
        let mut cards = vec![c(player[0]), c(dealer[0]), c(player[1]), c(dealer[1])];
        cards.extend(rest.iter().map(|&r| c(r)));
        Deck::stacked(cards)
    }

    fn deal(deck: Deck) -> BlackjackHand {
        BlackjackHand::deal(Uuid::new_v4(), 100, 900, deck).unwrap()
    }

    #[test]
    fn test_hand_score_demotes_aces() {
        assert_eq!(hand_score(&[c(1), c(13)]), 21);
        assert_eq!(hand_score(&[c(1), c(1)]), 12);
        assert_eq!(hand_score(&[c(1), c(1), c(1)]), 13);
        assert_eq!(hand_score(&[c(1), c(9), c(5)]), 15);
        assert_eq!(hand_score(&[c(10), c(12), c(5)]), 25);
    }

    #[test]
    fn test_is_blackjack_requires_two_cards() {
        assert!(is_blackjack(&[c(1), c(11)]));
        assert!(!is_blackjack(&[c(7), c(7), c(7)]));
        assert!(!is_blackjack(&[c(10), c(10)]));
    }

    #[test]
    fn test_deal_order_alternates() {
        let hand = deal(stacked([2, 3], [4, 5], &[]));
        assert_eq!(hand.player_cards(), &[c(2), c(3)]);
        assert_eq!(hand.dealer_cards(), &[c(4), c(5)]);
        assert_eq!(hand.phase(), Phase::PlayerTurn);
    }

    #[test]
    fn test_player_natural_pays_three_to_two() {
        let hand = deal(stacked([1, 13], [9, 8], &[]));
        assert_eq!(hand.resolution(), Some(Resolution::PlayerBlackjack));
        assert_eq!(Resolution::PlayerBlackjack.returned(100), 250);
        assert_eq!(Resolution::PlayerBlackjack.returned(5), 12);
    }

    #[test]
    fn test_both_naturals_push() {
        let hand = deal(stacked([1, 13], [1, 12], &[]));
        assert_eq!(hand.resolution(), Some(Resolution::BothBlackjack));
        assert_eq!(Resolution::BothBlackjack.returned(100), 100);
    }

    #[test]
    fn test_dealer_natural_ends_hand() {
        let mut hand = deal(stacked([10, 9], [1, 10], &[2]));
        assert_eq!(hand.resolution(), Some(Resolution::DealerBlackjack));
        assert!(matches!(hand.hit(), Err(GameError::NoActiveRound)));
    }

    #[test]
    fn test_hit_to_bust() {
        let mut hand = deal(stacked([10, 6], [10, 7], &[9]));
        assert_eq!(hand.hit().unwrap(), Some(Resolution::PlayerBust));
        assert_eq!(hand.phase(), Phase::Resolved);
        assert_eq!(Resolution::PlayerBust.returned(100), 0);
    }

    #[test]
    fn test_hit_to_21_plays_dealer() {
        // Dealer 16 draws a 10 and busts.
        let mut hand = deal(stacked([10, 6], [10, 6], &[5, 10]));
        assert_eq!(hand.hit().unwrap(), Some(Resolution::DealerBust));
        assert_eq!(hand.dealer_cards().len(), 3);
    }

    #[test]
    fn test_hit_keeps_turn_below_21() {
        let mut hand = deal(stacked([2, 3], [10, 7], &[4]));
        assert_eq!(hand.hit().unwrap(), None);
        assert_eq!(hand.phase(), Phase::PlayerTurn);
        assert_eq!(hand.view().player_score, 9);
    }

    #[test]
    fn test_stand_dealer_draws_to_17() {
        let mut hand = deal(stacked([10, 8], [2, 3], &[4, 2, 6, 9]));
        // Dealer: 5 -> 9 -> 11 -> 17, stops before the 9.
        assert_eq!(hand.stand().unwrap(), Resolution::PlayerWins);
        assert_eq!(hand.dealer_cards().len(), 5);
        assert_eq!(hand_score(hand.dealer_cards()), 17);
        assert_eq!(Resolution::PlayerWins.returned(100), 200);
    }

    #[test]
    fn test_stand_push_and_loss() {
        let mut hand = deal(stacked([10, 8], [10, 8], &[]));
        assert_eq!(hand.stand().unwrap(), Resolution::Push);

        let mut hand = deal(stacked([10, 7], [10, 9], &[]));
        assert_eq!(hand.stand().unwrap(), Resolution::DealerWins);
    }

    #[test]
    fn test_dealer_stops_on_empty_deck() {
        let mut hand = deal(stacked([10, 8], [2, 3], &[]));
        assert_eq!(hand.stand().unwrap(), Resolution::PlayerWins);
        assert_eq!(hand.dealer_cards().len(), 2);
    }

    #[test]
    fn test_hit_on_empty_deck_is_inconsistent() {
        let mut hand = deal(stacked([2, 3], [10, 7], &[]));
        assert!(matches!(hand.hit(), Err(GameError::InternalInconsistency(_))));
    }

    #[test]
    fn test_short_deck_fails_deal() {
        let deck = Deck::stacked(vec![c(2), c(3), c(4)]);
        assert!(matches!(
            BlackjackHand::deal(Uuid::new_v4(), 10, 0, deck),
            Err(GameError::InternalInconsistency(_))
        ));
    }

    #[test]
    fn test_view_hides_hole_card_until_resolved() {
        let mut hand = deal(stacked([10, 7], [9, 9], &[]));
        let view = hand.view();
        assert_eq!(view.dealer_cards, vec![c(9)]);
        assert_eq!(view.dealer_score, 9);
        assert!(hand.outcome().is_none());

        hand.stand().unwrap();
        assert_eq!(hand.view().dealer_cards.len(), 2);
        let outcome = hand.outcome().unwrap();
        assert_eq!(outcome.resolution, Resolution::DealerWins);
        assert_eq!(outcome.dealer_score, 18);
    }
}
