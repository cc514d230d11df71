//! House-edge simulator.
//!
//! Plays a fixed number of rounds of each game through the engine and prints
//! the observed return-to-player as JSON.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Error, bail};
use casino_engine::{
    BlackjackTurn, EngineConfig, GameEngine, GameKind, GameRng, Ledger, MemoryLedger,
    MemoryReporter, PgLedger, PgRoundReporter, RoundReporter,
    db::{Database, DatabaseConfig},
    game::{baccarat::BaccaratSide, entities::Color, hilo::Guess, roulette::RouletteBet},
    ledger::PlayerId,
    promotions::{ClaimStore, MemoryClaimStore, PgClaimStore},
};
use log::info;
use pico_args::Arguments;
use serde::Serialize;

const HELP: &str = "\
Measure the return-to-player of every casino game

USAGE:
  casino_sim [OPTIONS]

OPTIONS:
  --rounds     N           Rounds played per game  [default: 10000]
  --wager      N           Stake per round  [default: 10]
  --seed       N           Seed for a reproducible run  [default: OS entropy]
  --game       NAME        Only simulate this game (slots, progressive_slots,
                           blackjack, baccarat, roulette, keno, hilo)
  --db-url     URL         Play against a PostgreSQL ledger  [default: env DATABASE_URL, else in-memory]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  SLOT_ALL_SAME_CHANCE     Basic slot override chance
  PROGRESSIVE_JACKPOT_CHANCE, PROGRESSIVE_JACKPOT_BASE, KENO_JACKPOT_BASE,
  JACKPOT_CONTRIBUTION_BPS, CREDIT_RETRY_ATTEMPTS, CREDIT_RETRY_BACKOFF_MS,
  PROMOTION_COOLDOWN_SECS
  RUST_LOG                 Log filter (e.g. info, casino_engine=debug)
";

struct Args {
    rounds: u64,
    wager: i64,
    seed: Option<u64>,
    games: Vec<GameKind>,
    database_url: Option<String>,
}

/// Totals for one game.
#[derive(Debug, Default, Serialize)]
struct GameReport {
    game: Option<GameKind>,
    rounds: u64,
    wagered: i64,
    returned: i64,
    wins: u64,
    jackpots: u64,
    rtp: f64,
}

impl GameReport {
    fn record(&mut self, wager: i64, returned: i64, jackpot: bool) {
        self.rounds += 1;
        self.wagered += wager;
        self.returned += returned;
        if returned > wager {
            self.wins += 1;
        }
        if jackpot {
            self.jackpots += 1;
        }
    }

    fn finish(mut self) -> Self {
        if self.wagered > 0 {
            self.rtp = self.returned as f64 / self.wagered as f64;
        }
        self
    }
}

fn parse_args() -> Result<Args, Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let games = match pargs.opt_value_from_str::<_, String>("--game")? {
        Some(name) => vec![name.parse::<GameKind>()?],
        None => GameKind::ALL.to_vec(),
    };

    let args = Args {
        rounds: pargs.opt_value_from_str("--rounds")?.unwrap_or(10_000),
        wager: pargs.opt_value_from_str("--wager")?.unwrap_or(10),
        seed: pargs.opt_value_from_str("--seed")?,
        games,
        database_url: pargs
            .opt_value_from_str("--db-url")?
            .or_else(|| std::env::var("DATABASE_URL").ok()),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }
    if args.rounds == 0 {
        bail!("--rounds must be at least 1");
    }
    if args.wager <= 0 {
        bail!("--wager must be positive");
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let args = parse_args()?;

    env_logger::builder().format_target(false).init();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let rng = match args.seed {
        Some(seed) => GameRng::seeded(seed),
        None => GameRng::from_entropy(),
    };

    let (ledger, reporter, claims, first_player): (
        Arc<dyn Ledger>,
        Arc<dyn RoundReporter>,
        Arc<dyn ClaimStore>,
        PlayerId,
    ) = match &args.database_url {
        Some(url) => {
            let db_config = DatabaseConfig::from_url(url.clone());
            info!("Connecting to database: {}", db_config.redacted_url());
            let db = Database::connect(&db_config)
                .await
                .context("failed to connect to database")?;
            let pool = db.shared_pool();

            // Fresh ids per run so earlier balances don't leak in.
            let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            let first = i64::try_from(secs)?.saturating_mul(10);
            (
                Arc::new(PgLedger::new(pool.clone())),
                Arc::new(PgRoundReporter::new(pool.clone())),
                Arc::new(PgClaimStore::new(pool)),
                first,
            )
        }
        None => (
            Arc::new(MemoryLedger::new()),
            Arc::new(MemoryReporter::new()),
            Arc::new(MemoryClaimStore::new()),
            1,
        ),
    };

    let engine =
        GameEngine::new(ledger, reporter, Box::new(rng), config).with_claim_store(claims);
    let bankroll = i64::try_from(args.rounds)?
        .checked_mul(args.wager)
        .context("--rounds times --wager overflows the bankroll")?;

    let mut reports = Vec::with_capacity(args.games.len());
    for (i, &game) in args.games.iter().enumerate() {
        let player = first_player + i as PlayerId;
        engine.open_account(player, bankroll).await?;

        info!("Simulating {} rounds of {game}", args.rounds);
        let report = simulate(&engine, game, player, args.rounds, args.wager).await?;
        info!("{game}: RTP {:.4}", report.rtp);
        reports.push(report);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

/// Play `rounds` rounds of `game` with a simple fixed strategy.
async fn simulate(
    engine: &GameEngine,
    game: GameKind,
    player: PlayerId,
    rounds: u64,
    wager: i64,
) -> Result<GameReport, Error> {
    let mut report = GameReport {
        game: Some(game),
        ..GameReport::default()
    };
    let keno_ticket: Vec<u8> = vec![7, 14, 21, 28, 35];

    for _ in 0..rounds {
        let (returned, jackpot) = match game {
            GameKind::Slots => {
                let r = engine.spin_slot(player, wager).await?;
                (r.returned, false)
            }
            GameKind::ProgressiveSlots => {
                let r = engine.spin_progressive(player, wager).await?;
                (r.returned, r.outcome.jackpot_award > 0)
            }
            GameKind::Blackjack => (play_blackjack(engine, player, wager).await?, false),
            GameKind::Baccarat => {
                let r = engine
                    .play_baccarat(player, BaccaratSide::Banker, wager)
                    .await?;
                (r.returned, false)
            }
            GameKind::Roulette => {
                let r = engine
                    .spin_roulette(player, RouletteBet::Color(Color::Red), wager)
                    .await?;
                (r.returned, false)
            }
            GameKind::Keno => {
                let r = engine.play_keno(player, keno_ticket.clone(), wager).await?;
                (r.returned, r.outcome.jackpot_award > 0)
            }
            GameKind::HiLo => {
                let guess = if engine.hilo_current_card().rank() <= 7 {
                    Guess::Higher
                } else {
                    Guess::Lower
                };
                let r = engine.play_hilo(player, guess, wager).await?;
                (r.returned, false)
            }
        };
        report.record(wager, returned, jackpot);
    }

    Ok(report.finish())
}

/// Hit below 17, then stand. Returns the gross amount paid back.
async fn play_blackjack(engine: &GameEngine, player: PlayerId, wager: i64) -> Result<i64, Error> {
    let mut turn = engine.start_blackjack(player, wager).await?;
    loop {
        turn = match turn {
            BlackjackTurn::Finished(round) => return Ok(round.returned),
            BlackjackTurn::InProgress(view) if view.player_score < 17 => engine.hit(player).await?,
            BlackjackTurn::InProgress(_) => engine.stand(player).await?,
        };
    }
}
