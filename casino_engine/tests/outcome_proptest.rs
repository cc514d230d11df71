//! Property-based tests for game resolution and balance safety.
//!
//! These check scoring, payout and settlement rules over randomly
//! generated hands, decks and play sequences.

use casino_engine::{
    EngineConfig, GameEngine, GameRng, Ledger, MemoryLedger, MemoryReporter,
    game::{
        baccarat::{self, BaccaratSide},
        blackjack::{hand_score, is_blackjack},
        entities::{Card, Deck, Suit},
        hilo::{Guess, STREAK_CAP, winning_payout},
        roulette::RouletteBet,
        slots::{SlotMachine, SymbolTable},
    },
};
use proptest::prelude::*;
use std::sync::Arc;

// Strategy to generate a valid card (values 1-13, aces are value 1)
fn card_strategy() -> impl Strategy<Value = Card> {
    (1u8..=13, 0u8..=3).prop_map(|(value, suit_idx)| {
        let suit = match suit_idx {
            0 => Suit::Club,
            1 => Suit::Diamond,
            2 => Suit::Heart,
            _ => Suit::Spade,
        };
        Card(value, suit)
    })
}

fn full_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    for value in 1u8..=13 {
        for suit in Suit::ALL {
            cards.push(Card(value, suit));
        }
    }
    cards
}

// Strategy to generate a shuffled 52-card deck
fn shuffled_deck_strategy() -> impl Strategy<Value = Vec<Card>> {
    Just(full_deck()).prop_shuffle()
}

fn guess_strategy() -> impl Strategy<Value = Guess> {
    prop_oneof![Just(Guess::Higher), Just(Guess::Lower), Just(Guess::Tie)]
}

// Total with every ace counted as 1
fn hard_total(cards: &[Card]) -> u32 {
    cards
        .iter()
        .map(|c| if c.rank() == 1 { 1 } else { c.blackjack_value() })
        .sum()
}

proptest! {
    #[test]
    fn test_hand_score_promotes_one_ace_when_safe(
        cards in prop::collection::vec(card_strategy(), 1..=8)
    ) {
        let hard = hard_total(&cards);
        let has_ace = cards.iter().any(|c| c.rank() == 1);
        let score = hand_score(&cards);

        if has_ace && hard + 10 <= 21 {
            prop_assert_eq!(score, hard + 10);
        } else {
            prop_assert_eq!(score, hard);
        }
    }

    #[test]
    fn test_hand_score_only_busts_when_hard_total_busts(
        cards in prop::collection::vec(card_strategy(), 1..=8)
    ) {
        let score = hand_score(&cards);
        prop_assert_eq!(score > 21, hard_total(&cards) > 21);
    }

    #[test]
    fn test_blackjack_is_two_card_twenty_one(
        cards in prop::collection::vec(card_strategy(), 1..=5)
    ) {
        prop_assert_eq!(
            is_blackjack(&cards),
            cards.len() == 2 && hand_score(&cards) == 21
        );
    }

    #[test]
    fn test_baccarat_naturals_draw_no_third_card(
        deck in shuffled_deck_strategy(),
        wager in 1i64..10_000,
    ) {
        let opening_player = baccarat::hand_total(&[deck[0], deck[1]]);
        let opening_banker = baccarat::hand_total(&[deck[2], deck[3]]);
        let mut stacked = Deck::stacked(deck);

        let (outcome, returned) =
            baccarat::play(BaccaratSide::Player, wager, &mut stacked).unwrap();

        if opening_player >= 8 || opening_banker >= 8 {
            prop_assert!(outcome.natural);
            prop_assert_eq!(outcome.player_cards.len(), 2);
            prop_assert_eq!(outcome.banker_cards.len(), 2);
        }
        prop_assert!(outcome.player_total <= 9 && outcome.banker_total <= 9);
        prop_assert!(outcome.player_cards.len() <= 3 && outcome.banker_cards.len() <= 3);

        if outcome.winner == BaccaratSide::Player {
            prop_assert_eq!(returned, wager * 2);
        } else {
            prop_assert_eq!(returned, 0);
        }
    }

    #[test]
    fn test_hilo_streak_boost_is_capped(
        wager in 1i64..1_000_000,
        current in 1u8..=13,
        guess in guess_strategy(),
        streak in STREAK_CAP..10_000,
    ) {
        prop_assert_eq!(
            winning_payout(wager, current, guess, streak),
            winning_payout(wager, current, guess, STREAK_CAP)
        );
    }

    #[test]
    fn test_hilo_even_money_at_most_five_times(
        wager in 1i64..1_000_000,
        current in 1u8..=6,
        streak in 0u32..10_000,
    ) {
        // Seven or more ranks above the card means even-money odds.
        let payout = winning_payout(wager, current, Guess::Higher, streak);
        prop_assert!(payout >= wager);
        prop_assert!(payout <= wager * 5);
    }

    #[test]
    fn test_slot_returns_are_never_negative(seed in any::<u64>(), wager in 1i64..10_000) {
        let machine = SlotMachine::basic(0.08);
        let mut rng = GameRng::seeded(seed);
        let spin = machine.spin(wager, &mut rng, None);

        prop_assert!(spin.returned >= 0);
        prop_assert_eq!(spin.outcome.reels.len(), machine.reels());
        if spin.outcome.matches.is_empty() {
            prop_assert_eq!(spin.returned, 0);
        }
    }

    #[test]
    fn test_symbol_lookup_stays_in_table(draw in 0.0f64..1.0) {
        for table in [SymbolTable::basic(), SymbolTable::progressive()] {
            prop_assert!(table.index_for(draw) < table.symbols().len());
        }
    }
}

#[test]
fn test_builtin_symbol_tables_sum_to_one() {
    for table in [SymbolTable::basic(), SymbolTable::progressive()] {
        assert!((table.total_rarity() - 1.0).abs() < 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_random_play_never_overdraws(
        seed in any::<u64>(),
        wagers in prop::collection::vec(1i64..400, 1..40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let ledger = MemoryLedger::with_accounts([(1, 1_000)]);
            let engine = GameEngine::new(
                Arc::new(ledger.clone()),
                Arc::new(MemoryReporter::new()),
                Box::new(GameRng::seeded(seed)),
                EngineConfig::default(),
            );

            let mut expected = 1_000;
            for (i, &wager) in wagers.iter().enumerate() {
                let returned = match i % 4 {
                    0 => engine.spin_slot(1, wager).await.map(|r| r.returned),
                    1 => engine
                        .spin_roulette(1, RouletteBet::Straight(7), wager)
                        .await
                        .map(|r| r.returned),
                    2 => engine
                        .play_baccarat(1, BaccaratSide::Tie, wager)
                        .await
                        .map(|r| r.returned),
                    _ => engine
                        .play_hilo(1, Guess::Higher, wager)
                        .await
                        .map(|r| r.returned),
                };

                match returned {
                    Ok(returned) => expected += returned - wager,
                    Err(e) => assert!(e.is_validation(), "unexpected error: {e}"),
                }

                let balance = ledger.get_balance(1).await.unwrap();
                assert!(balance >= 0);
                assert_eq!(balance, expected);
            }
        });
    }
}
