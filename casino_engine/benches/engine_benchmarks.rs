use casino_engine::{
    EngineConfig, GameEngine, GameRng, MemoryLedger, MemoryReporter,
    game::{
        blackjack::{BlackjackHand, hand_score},
        entities::{Card, Deck, Suit},
        jackpot::JackpotPool,
        keno::{self, KenoTicket},
        roulette::{self, RouletteBet},
        slots::SlotMachine,
    },
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{hint::black_box, sync::Arc};
use uuid::Uuid;

/// Benchmark one basic 3-reel spin
fn bench_slot_spin(c: &mut Criterion) {
    let machine = SlotMachine::basic(0.08);
    let mut rng = GameRng::seeded(1);

    c.bench_function("slot_spin_basic", |b| {
        b.iter(|| machine.spin(black_box(100), &mut rng, None));
    });
}

/// Benchmark one progressive 5-reel spin feeding a pool
fn bench_progressive_spin(c: &mut Criterion) {
    let machine = SlotMachine::progressive(0.001);
    let mut rng = GameRng::seeded(2);
    let mut pool = JackpotPool::new(500_000, 100);

    c.bench_function("slot_spin_progressive", |b| {
        b.iter(|| machine.spin(black_box(100), &mut rng, Some(&mut pool)));
    });
}

/// Benchmark shuffling a deck and dealing a blackjack hand
fn bench_blackjack_deal(c: &mut Criterion) {
    let mut rng = GameRng::seeded(3);

    c.bench_function("blackjack_deal", |b| {
        b.iter(|| {
            let deck = Deck::shuffled(&mut rng);
            BlackjackHand::deal(Uuid::nil(), 100, 900, deck)
        });
    });
}

/// Benchmark hand scoring for growing hand sizes
fn bench_hand_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("hand_score");
    let cards = [
        Card(1, Suit::Spade),
        Card(1, Suit::Heart),
        Card(5, Suit::Club),
        Card(2, Suit::Diamond),
        Card(1, Suit::Club),
        Card(3, Suit::Heart),
    ];

    for n in [2, 4, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| hand_score(black_box(&cards[..n])));
        });
    }

    group.finish();
}

/// Benchmark a keno draw and a full ten-pick ticket
fn bench_keno(c: &mut Criterion) {
    let mut rng = GameRng::seeded(4);
    let ticket = KenoTicket::new((1..=10).collect()).unwrap();
    let mut pool = JackpotPool::new(50_000, 100);

    c.bench_function("keno_draw", |b| {
        b.iter(|| keno::draw_numbers(&mut rng));
    });

    c.bench_function("keno_ticket", |b| {
        b.iter(|| keno::play(&ticket, black_box(10), &mut rng, &mut pool));
    });
}

/// Benchmark a roulette spin and settlement
fn bench_roulette(c: &mut Criterion) {
    let mut rng = GameRng::seeded(5);
    let bet = RouletteBet::Straight(17);

    c.bench_function("roulette_spin", |b| {
        b.iter(|| roulette::settle(bet, black_box(10), roulette::spin_wheel(&mut rng)));
    });
}

/// Benchmark a full engine round through the in-memory ledger
fn bench_engine_round(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let engine = GameEngine::new(
        Arc::new(MemoryLedger::with_accounts([(1, i64::MAX / 2)])),
        Arc::new(MemoryReporter::new()),
        Box::new(GameRng::seeded(6)),
        EngineConfig::default(),
    );

    c.bench_function("engine_slot_round", |b| {
        b.iter(|| runtime.block_on(engine.spin_slot(1, black_box(10))));
    });
}

criterion_group!(
    game_resolution,
    bench_slot_spin,
    bench_progressive_spin,
    bench_blackjack_deal,
    bench_hand_score,
    bench_keno,
    bench_roulette,
);

criterion_group!(engine_operations, bench_engine_round);

criterion_main!(game_resolution, engine_operations);
