//! Game engine: runs every round through the same pipeline.
//!
//! 1. Validate the game parameters and the wager against the balance
//! 2. Debit the wager atomically
//! 3. Draw and resolve while holding the randomness lock (no awaits)
//! 4. Credit the gross return, retrying transient storage failures
//! 5. Record the round with the reporter; failures are only logged
//!
//! Promotions skip the wager: a claim is recorded against its cooldown, then
//! the prize is credited through the same settlement path.
//!
//! Cross-round state (jackpot pools, the hi-lo table, in-flight blackjack
//! hands) lives here behind `std::sync::Mutex`es that are never held across
//! an `.await`.
//!
//! ## Example
//!
//! ```
//! use casino_engine::engine::{EngineConfig, GameEngine};
//! use casino_engine::ledger::{Ledger, MemoryLedger};
//! use casino_engine::reporter::MemoryReporter;
//! use casino_engine::rng::GameRng;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = GameEngine::new(
//!         Arc::new(MemoryLedger::new()),
//!         Arc::new(MemoryReporter::new()),
//!         Box::new(GameRng::seeded(7)),
//!         EngineConfig::default(),
//!     );
//!
//!     engine.open_account(1, 1_000).await?;
//!     let round = engine.spin_slot(1, 10).await?;
//!     assert_eq!(round.new_balance, 1_000 - 10 + round.returned);
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use uuid::Uuid;

pub mod config;
mod settlement;

pub use config::EngineConfig;

use crate::{
    game::{
        GameError, GameKind, GameResult, RoundResult, WinTier,
        baccarat::{self, BaccaratOutcome, BaccaratSide},
        blackjack::{BlackjackHand, BlackjackOutcome, BlackjackView, Resolution},
        entities::{Card, Deck},
        hilo::{Guess, HiLoOutcome, HiLoTable},
        jackpot::JackpotPool,
        keno::{self, KenoOutcome, KenoTicket},
        roulette::{self, RouletteBet, RouletteOutcome},
        slots::{SlotMachine, SlotOutcome},
    },
    ledger::{Balance, Ledger, PlayerId},
    promotions::{
        self, ClaimDecision, ClaimStore, DAILY_CASH, DAILY_COINS, MemoryClaimStore,
        PromotionAward, PromotionKind,
    },
    reporter::{RecentGame, ReportResult, RoundReporter},
    rng::RandomSource,
};

/// Lock a mutex, recovering the data if a previous holder panicked.
fn guard<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tier for games without their own thresholds.
fn plain_tier(wager: i64, returned: i64) -> WinTier {
    if returned > wager {
        WinTier::Normal
    } else {
        WinTier::None
    }
}

/// Per-player blackjack slot. `Dealing` reserves the seat while the wager
/// is being debited.
#[derive(Debug)]
enum Seat {
    Dealing,
    Playing(BlackjackHand),
}

/// A `Seat::Dealing` reservation. Dropping it frees the seat, so a start
/// that errors out or is abandoned mid-debit never strands the player.
struct DealingSeat<'a> {
    seats: &'a Mutex<HashMap<PlayerId, Seat>>,
    player: PlayerId,
}

impl DealingSeat<'_> {
    /// Turn the reservation into a live hand.
    fn occupy(self, hand: BlackjackHand) {
        guard(self.seats).insert(self.player, Seat::Playing(hand));
    }
}

impl Drop for DealingSeat<'_> {
    fn drop(&mut self) {
        let mut seats = guard(self.seats);
        if matches!(seats.get(&self.player), Some(Seat::Dealing)) {
            seats.remove(&self.player);
        }
    }
}

/// Result of a blackjack action.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum BlackjackTurn {
    /// The player must hit or stand.
    InProgress(BlackjackView),
    /// The hand resolved and was settled.
    Finished(RoundResult<BlackjackOutcome>),
}

/// Everything a round needs to be settled once resolved.
struct Resolved<O> {
    round_id: Uuid,
    game: GameKind,
    outcome: O,
    wager: i64,
    returned: i64,
    tier: WinTier,
    message: String,
}

pub struct GameEngine {
    ledger: Arc<dyn Ledger>,
    reporter: Arc<dyn RoundReporter>,
    rng: Mutex<Box<dyn RandomSource>>,
    config: EngineConfig,
    basic_slots: SlotMachine,
    progressive_slots: SlotMachine,
    progressive_pool: Mutex<JackpotPool>,
    keno_pool: Mutex<JackpotPool>,
    hilo: Mutex<HiLoTable>,
    blackjack: Mutex<HashMap<PlayerId, Seat>>,
    claims: Arc<dyn ClaimStore>,
}

impl GameEngine {
    /// Create an engine
    ///
    /// The hi-lo table's first card is drawn from `rng`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Sole writer of balances
    /// * `reporter` - Sink for round history
    /// * `rng` - Randomness for every game
    /// * `config` - Odds, pools and settlement policy
    pub fn new(
        ledger: Arc<dyn Ledger>,
        reporter: Arc<dyn RoundReporter>,
        mut rng: Box<dyn RandomSource>,
        config: EngineConfig,
    ) -> Self {
        let hilo = HiLoTable::new(rng.as_mut());
        Self {
            ledger,
            reporter,
            basic_slots: SlotMachine::basic(config.slot_all_same_chance),
            progressive_slots: SlotMachine::progressive(config.progressive_jackpot_chance),
            progressive_pool: Mutex::new(JackpotPool::new(
                config.progressive_jackpot_base,
                config.jackpot_contribution_bps,
            )),
            keno_pool: Mutex::new(JackpotPool::new(
                config.keno_jackpot_base,
                config.jackpot_contribution_bps,
            )),
            hilo: Mutex::new(hilo),
            blackjack: Mutex::new(HashMap::new()),
            claims: Arc::new(MemoryClaimStore::new()),
            rng: Mutex::new(rng),
            config,
        }
    }

    /// Replace the hi-lo table's current card.
    #[must_use]
    pub fn with_hilo_card(self, card: Card) -> Self {
        *guard(&self.hilo) = HiLoTable::with_card(card);
        self
    }

    /// Keep promotion claims in `claims` instead of process memory.
    #[must_use]
    pub fn with_claim_store(mut self, claims: Arc<dyn ClaimStore>) -> Self {
        self.claims = claims;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn balance(&self, player: PlayerId) -> GameResult<Balance> {
        Ok(self.ledger.get_balance(player).await?)
    }

    /// Create a player's balance if missing. Returns the balance held.
    pub async fn open_account(&self, player: PlayerId, initial: Balance) -> GameResult<Balance> {
        Ok(self.ledger.open_account(player, initial).await?)
    }

    pub async fn recent_games(
        &self,
        player: PlayerId,
        limit: usize,
    ) -> ReportResult<Vec<RecentGame>> {
        self.reporter.recent_games(player, limit).await
    }

    pub fn progressive_jackpot(&self) -> i64 {
        guard(&self.progressive_pool).current()
    }

    pub fn keno_jackpot(&self) -> i64 {
        guard(&self.keno_pool).current()
    }

    pub fn hilo_current_card(&self) -> Card {
        guard(&self.hilo).current()
    }

    pub fn hilo_streak(&self, player: PlayerId) -> u32 {
        guard(&self.hilo).streak(player)
    }

    /// Spin the basic 3-reel slot
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidWager` - Wager is not positive or exceeds the balance
    /// * `GameError::InsufficientFunds` - Balance dropped below the wager before the debit
    /// * `GameError::Persistence` - The ledger failed before the round started
    /// * `GameError::UnsettledCredit` - A win could not be credited
    pub async fn spin_slot(&self, player: PlayerId, wager: i64) -> GameResult<RoundResult<SlotOutcome>> {
        self.place_wager(player, wager).await?;

        let spin = {
            let mut rng = guard(&self.rng);
            self.basic_slots.spin(wager, &mut **rng, None)
        };

        self.settle(
            player,
            Resolved {
                round_id: Uuid::new_v4(),
                game: GameKind::Slots,
                message: spin.message(),
                wager,
                returned: spin.returned,
                tier: spin.tier,
                outcome: spin.outcome,
            },
        )
        .await
    }

    /// Spin the progressive 5-reel slot. Every spin feeds the pool.
    ///
    /// # Errors
    ///
    /// Same as [`GameEngine::spin_slot`].
    pub async fn spin_progressive(
        &self,
        player: PlayerId,
        wager: i64,
    ) -> GameResult<RoundResult<SlotOutcome>> {
        self.place_wager(player, wager).await?;

        let spin = {
            let mut rng = guard(&self.rng);
            let mut pool = guard(&self.progressive_pool);
            self.progressive_slots
                .spin(wager, &mut **rng, Some(&mut *pool))
        };
        if spin.outcome.jackpot_award > 0 {
            log::info!(
                "Player {player} won the progressive jackpot of {}",
                spin.outcome.jackpot_award
            );
        }

        self.settle(
            player,
            Resolved {
                round_id: Uuid::new_v4(),
                game: GameKind::ProgressiveSlots,
                message: spin.message(),
                wager,
                returned: spin.returned,
                tier: spin.tier,
                outcome: spin.outcome,
            },
        )
        .await
    }

    /// Deal a blackjack hand
    ///
    /// Naturals settle immediately. Otherwise the hand stays in flight
    /// until [`GameEngine::hit`] or [`GameEngine::stand`] resolves it.
    ///
    /// # Errors
    ///
    /// * `GameError::RoundInProgress` - The player already has a hand in flight
    /// * plus every error of [`GameEngine::spin_slot`]
    pub async fn start_blackjack(&self, player: PlayerId, wager: i64) -> GameResult<BlackjackTurn> {
        validate_wager_amount(wager)?;
        let seat = self.reserve_seat(player)?;

        let balance_after_debit = self.place_wager(player, wager).await?;

        let dealt = {
            let mut rng = guard(&self.rng);
            let deck = Deck::shuffled(&mut **rng);
            BlackjackHand::deal(Uuid::new_v4(), wager, balance_after_debit, deck)
        };
        let hand = dealt.inspect_err(|e| {
            log::error!("Blackjack deal for player {player} aborted: {e}");
        })?;

        if hand.resolution().is_some() {
            drop(seat);
            return Ok(BlackjackTurn::Finished(self.settle_blackjack(player, hand).await?));
        }

        let view = hand.view();
        seat.occupy(hand);
        Ok(BlackjackTurn::InProgress(view))
    }

    /// Draw a card for the player's in-flight hand
    ///
    /// # Errors
    ///
    /// * `GameError::NoActiveRound` - No hand is waiting for the player
    /// * `GameError::InternalInconsistency` - The deck ran out; the hand is
    ///   discarded without any payout
    pub async fn hit(&self, player: PlayerId) -> GameResult<BlackjackTurn> {
        self.act(player, |hand| hand.hit().map(|r| r.is_some())).await
    }

    /// End the player's turn and resolve the hand
    ///
    /// # Errors
    ///
    /// * `GameError::NoActiveRound` - No hand is waiting for the player
    pub async fn stand(&self, player: PlayerId) -> GameResult<BlackjackTurn> {
        self.act(player, |hand| hand.stand().map(|_| true)).await
    }

    /// Apply `action` to the in-flight hand. `action` reports whether the
    /// hand resolved.
    async fn act<F>(&self, player: PlayerId, action: F) -> GameResult<BlackjackTurn>
    where
        F: FnOnce(&mut BlackjackHand) -> GameResult<bool>,
    {
        let finished = {
            let mut seats = guard(&self.blackjack);
            let Some(Seat::Playing(hand)) = seats.get_mut(&player) else {
                return Err(GameError::NoActiveRound);
            };

            match action(hand) {
                Ok(false) => return Ok(BlackjackTurn::InProgress(hand.view())),
                Ok(true) => match seats.remove(&player) {
                    Some(Seat::Playing(hand)) => hand,
                    _ => return Err(GameError::NoActiveRound),
                },
                Err(e @ GameError::InternalInconsistency(_)) => {
                    seats.remove(&player);
                    log::error!("Discarding blackjack hand for player {player}: {e}");
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        };

        Ok(BlackjackTurn::Finished(
            self.settle_blackjack(player, finished).await?,
        ))
    }

    /// Hold the player's seat while the wager is debited and the hand dealt.
    fn reserve_seat(&self, player: PlayerId) -> GameResult<DealingSeat<'_>> {
        let mut seats = guard(&self.blackjack);
        if seats.contains_key(&player) {
            return Err(GameError::RoundInProgress);
        }
        seats.insert(player, Seat::Dealing);
        Ok(DealingSeat {
            seats: &self.blackjack,
            player,
        })
    }

    async fn settle_blackjack(
        &self,
        player: PlayerId,
        hand: BlackjackHand,
    ) -> GameResult<RoundResult<BlackjackOutcome>> {
        let outcome = hand.outcome().ok_or_else(|| {
            GameError::InternalInconsistency("settling an unresolved hand".to_string())
        })?;
        let wager = hand.wager();
        let returned = outcome.resolution.returned(wager);
        let tier = match outcome.resolution {
            Resolution::PlayerBlackjack => WinTier::Big,
            _ => plain_tier(wager, returned),
        };

        self.settle(
            player,
            Resolved {
                round_id: hand.round_id(),
                game: GameKind::Blackjack,
                message: outcome.resolution.message().to_string(),
                outcome,
                wager,
                returned,
                tier,
            },
        )
        .await
    }

    /// Play one baccarat coup from a fresh deck
    ///
    /// # Errors
    ///
    /// Same as [`GameEngine::spin_slot`].
    pub async fn play_baccarat(
        &self,
        player: PlayerId,
        bet: BaccaratSide,
        wager: i64,
    ) -> GameResult<RoundResult<BaccaratOutcome>> {
        self.place_wager(player, wager).await?;

        let played = {
            let mut rng = guard(&self.rng);
            let mut deck = Deck::shuffled(&mut **rng);
            baccarat::play(bet, wager, &mut deck)
        };
        let (outcome, returned) = played.inspect_err(|e| {
            log::error!("Baccarat coup for player {player} aborted: {e}");
        })?;

        let message = match outcome.winner {
            BaccaratSide::Tie => "Tie!".to_string(),
            side => format!("{side} wins!"),
        };
        self.settle(
            player,
            Resolved {
                round_id: Uuid::new_v4(),
                game: GameKind::Baccarat,
                outcome,
                wager,
                returned,
                tier: plain_tier(wager, returned),
                message,
            },
        )
        .await
    }

    /// Spin the wheel for one bet
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidSelection` - The bet value is off the wheel
    /// * plus every error of [`GameEngine::spin_slot`]
    pub async fn spin_roulette(
        &self,
        player: PlayerId,
        bet: RouletteBet,
        wager: i64,
    ) -> GameResult<RoundResult<RouletteOutcome>> {
        bet.validate()?;
        self.place_wager(player, wager).await?;

        let pocket = {
            let mut rng = guard(&self.rng);
            roulette::spin_wheel(&mut **rng)
        };
        let (outcome, returned) = roulette::settle(bet, wager, pocket);

        let message = if returned > 0 {
            format!("You won! Number {pocket}")
        } else {
            format!("You lost. Number {pocket}")
        };
        let tier = match bet {
            RouletteBet::Straight(_) if returned > 0 => WinTier::Big,
            _ => plain_tier(wager, returned),
        };
        self.settle(
            player,
            Resolved {
                round_id: Uuid::new_v4(),
                game: GameKind::Roulette,
                outcome,
                wager,
                returned,
                tier,
                message,
            },
        )
        .await
    }

    /// Play a keno ticket of 1-10 numbers
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidSelection` - The numbers don't form a valid ticket
    /// * plus every error of [`GameEngine::spin_slot`]
    pub async fn play_keno(
        &self,
        player: PlayerId,
        numbers: Vec<u8>,
        wager: i64,
    ) -> GameResult<RoundResult<KenoOutcome>> {
        let ticket = KenoTicket::new(numbers)?;
        self.place_wager(player, wager).await?;

        let (outcome, returned) = {
            let mut rng = guard(&self.rng);
            let mut pool = guard(&self.keno_pool);
            keno::play(&ticket, wager, &mut **rng, &mut pool)
        };

        let tier = if outcome.jackpot_award > 0 {
            log::info!(
                "Player {player} won the keno jackpot of {}",
                outcome.jackpot_award
            );
            WinTier::Jackpot
        } else {
            plain_tier(wager, returned)
        };
        let message = format!(
            "Keno round completed: {} of {} hit",
            outcome.hits,
            ticket.picks()
        );
        self.settle(
            player,
            Resolved {
                round_id: Uuid::new_v4(),
                game: GameKind::Keno,
                outcome,
                wager,
                returned,
                tier,
                message,
            },
        )
        .await
    }

    /// Guess the next card against the house-wide current card
    ///
    /// # Errors
    ///
    /// Same as [`GameEngine::spin_slot`].
    pub async fn play_hilo(
        &self,
        player: PlayerId,
        guess: Guess,
        wager: i64,
    ) -> GameResult<RoundResult<HiLoOutcome>> {
        self.place_wager(player, wager).await?;

        let (outcome, returned) = {
            let mut rng = guard(&self.rng);
            let mut table = guard(&self.hilo);
            table.play(player, guess, wager, &mut **rng)
        };

        // A called tie pays 10x and is the only big hi-lo win.
        let tier = match outcome.guess {
            Guess::Tie if outcome.won => WinTier::Big,
            _ => plain_tier(wager, returned),
        };
        let message = match tier {
            WinTier::Big => "BIG WIN!".to_string(),
            WinTier::None if outcome.card_to.rank() == outcome.card_from.rank() => {
                "Tie, you lose!".to_string()
            }
            WinTier::None => "Wrong guess!".to_string(),
            _ => "Winner!".to_string(),
        };
        self.settle(
            player,
            Resolved {
                round_id: Uuid::new_v4(),
                game: GameKind::HiLo,
                outcome,
                wager,
                returned,
                tier,
                message,
            },
        )
        .await
    }

    /// Claim the daily cash bonus
    ///
    /// # Errors
    ///
    /// * `GameError::CooldownActive` - Already claimed inside the cooldown
    /// * `GameError::Persistence` - Unknown player or a storage failure
    /// * `GameError::UnsettledCredit` - The claim was recorded but not credited
    pub async fn claim_daily_cash(&self, player: PlayerId) -> GameResult<PromotionAward> {
        self.claim_promotion(player, PromotionKind::DailyCash).await
    }

    /// Claim the daily free coins
    ///
    /// # Errors
    ///
    /// Same as [`GameEngine::claim_daily_cash`].
    pub async fn claim_daily_coins(&self, player: PlayerId) -> GameResult<PromotionAward> {
        self.claim_promotion(player, PromotionKind::DailyCoins).await
    }

    /// Spin the prize wheel and credit the sector it stops on
    ///
    /// # Errors
    ///
    /// Same as [`GameEngine::claim_daily_cash`].
    pub async fn spin_prize_wheel(&self, player: PlayerId) -> GameResult<PromotionAward> {
        self.claim_promotion(player, PromotionKind::PrizeWheel).await
    }

    /// Last time the player claimed `kind`.
    pub async fn last_promotion_claim(
        &self,
        player: PlayerId,
        kind: PromotionKind,
    ) -> GameResult<Option<DateTime<Utc>>> {
        Ok(self.claims.last_claim(player, kind).await?)
    }

    /// Record the claim, draw the prize and credit it.
    async fn claim_promotion(
        &self,
        player: PlayerId,
        kind: PromotionKind,
    ) -> GameResult<PromotionAward> {
        // An unknown player must not burn a claim.
        self.ledger.get_balance(player).await?;

        let now = Utc::now();
        let cooldown = self.config.promotion_cooldown;
        if let ClaimDecision::CoolingDown { next_claim_at } =
            self.claims.try_claim(player, kind, now, cooldown).await?
        {
            return Err(GameError::CooldownActive { next_claim_at });
        }

        let (amount, wheel) = match kind {
            PromotionKind::DailyCash => (DAILY_CASH, None),
            PromotionKind::DailyCoins => (DAILY_COINS, None),
            PromotionKind::PrizeWheel => {
                let spin = {
                    let mut rng = guard(&self.rng);
                    promotions::spin_wheel(&mut **rng)
                };
                (spin.prize, Some(spin))
            }
        };

        let claim_id = Uuid::new_v4();
        let new_balance = settlement::credit_with_retry(
            self.ledger.as_ref(),
            player,
            claim_id,
            amount,
            self.config.credit_retry_attempts,
            self.config.credit_retry_backoff,
        )
        .await?;
        log::info!("Player {player} claimed {kind} worth {amount}");

        let next_claim_at = chrono::TimeDelta::from_std(cooldown)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Ok(PromotionAward {
            claim_id,
            kind,
            amount,
            wheel,
            new_balance,
            next_claim_at,
            message: format!("You won {amount}!"),
        })
    }

    /// Validate the wager against the balance, then debit it.
    ///
    /// Returns the balance after the debit.
    async fn place_wager(&self, player: PlayerId, wager: i64) -> GameResult<Balance> {
        validate_wager_amount(wager)?;

        let balance = self.ledger.get_balance(player).await?;
        if wager > balance {
            return Err(GameError::InvalidWager(format!(
                "wager {wager} exceeds balance {balance}"
            )));
        }

        Ok(self.ledger.try_debit(player, wager).await?)
    }

    /// Credit the return, record the round and build the result.
    async fn settle<O>(&self, player: PlayerId, round: Resolved<O>) -> GameResult<RoundResult<O>> {
        // Read back on a loss: other rounds may have moved the balance since
        // this one was debited.
        let new_balance = if round.returned > 0 {
            settlement::credit_with_retry(
                self.ledger.as_ref(),
                player,
                round.round_id,
                round.returned,
                self.config.credit_retry_attempts,
                self.config.credit_retry_backoff,
            )
            .await?
        } else {
            self.ledger.get_balance(player).await?
        };

        if let Err(e) = self
            .reporter
            .record_round(player, round.game, Utc::now())
            .await
        {
            log::warn!("Failed to record {} round for player {player}: {e}", round.game);
        }

        log::debug!(
            "Settled {} round {} for player {player}: wager {}, returned {}",
            round.game,
            round.round_id,
            round.wager,
            round.returned
        );

        Ok(RoundResult {
            round_id: round.round_id,
            game: round.game,
            outcome: round.outcome,
            wager: round.wager,
            returned: round.returned,
            payout: round.returned.saturating_sub(round.wager),
            new_balance,
            win_tier: round.tier,
            message: round.message,
        })
    }
}

fn validate_wager_amount(wager: i64) -> GameResult<()> {
    if wager <= 0 {
        return Err(GameError::InvalidWager(format!(
            "wager must be positive, got {wager}"
        )));
    }
    Ok(())
}
