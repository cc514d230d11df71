//! # Casino Engine
//!
//! Outcome engine for chance-based casino mini-games played with virtual
//! currency: basic and progressive slots, blackjack, baccarat, roulette,
//! keno and hi-lo.
//!
//! For every round the engine validates the wager, debits it atomically,
//! draws outcomes from a swappable randomness source, resolves the game,
//! credits the gross return and records the round in the player's history.
//!
//! ## Core Modules
//!
//! - [`engine`]: the [`GameEngine`] pipeline and its configuration
//! - [`game`]: per-game resolution logic, cards, pools and round results
//! - [`ledger`]: atomic balance operations (PostgreSQL and in-memory)
//! - [`promotions`]: daily cash, daily coins and the prize wheel
//! - [`reporter`]: round history sinks
//! - [`rng`]: randomness sources (OS-seeded, seeded, scripted)
//! - [`db`]: connection pooling and query timeouts
//!
//! ## Example
//!
//! ```
//! use casino_engine::{EngineConfig, GameEngine, GameRng, MemoryLedger, MemoryReporter};
//! use casino_engine::game::roulette::RouletteBet;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = GameEngine::new(
//!     Arc::new(MemoryLedger::with_accounts([(1, 500)])),
//!     Arc::new(MemoryReporter::new()),
//!     Box::new(GameRng::from_entropy()),
//!     EngineConfig::default(),
//! );
//!
//! let bet = RouletteBet::from_kind_value("color", "red")?;
//! let round = engine.spin_roulette(1, bet, 100).await?;
//! assert!(round.returned == 0 || round.returned == 200);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod engine;
pub mod game;
pub mod ledger;
pub mod promotions;
pub mod reporter;
pub mod rng;

pub use engine::{BlackjackTurn, EngineConfig, GameEngine};
pub use game::{GameError, GameKind, GameResult, RoundResult, WinTier};
pub use ledger::{Ledger, LedgerError, MemoryLedger, PgLedger};
pub use promotions::{PromotionAward, PromotionKind};
pub use reporter::{MemoryReporter, PgRoundReporter, RecentGame, RoundReporter};
pub use rng::{GameRng, RandomSource, ScriptedSource};
