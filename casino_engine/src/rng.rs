//! Randomness sources used by every game.
//!
//! Games never touch a concrete generator directly. They draw through
//! [`RandomSource`], which lets the engine run on an OS-seeded generator in
//! production and on a seeded or scripted one under test.

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::VecDeque;

/// Uniform draws consumed by the game engines.
pub trait RandomSource: Send {
    /// Uniform float in `[0, 1)`.
    fn draw(&mut self) -> f64;

    /// Uniform integer in `[0, n)`. `n` must be at least 1.
    fn draw_int(&mut self, n: usize) -> usize;
}

/// Standard generator backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: StdRng,
}

impl GameRng {
    /// Seed from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for GameRng {
    fn draw(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    fn draw_int(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "draw_int requires a non-empty range");
        self.inner.random_range(0..n.max(1))
    }
}

/// Replays queued values in order.
///
/// Integers are reduced modulo the requested range so a script can be
/// written in terms of the index it wants. Exhausted queues yield zero.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    floats: VecDeque<f64>,
    ints: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_floats<I: IntoIterator<Item = f64>>(mut self, floats: I) -> Self {
        self.floats.extend(floats);
        self
    }

    #[must_use]
    pub fn with_ints<I: IntoIterator<Item = usize>>(mut self, ints: I) -> Self {
        self.ints.extend(ints);
        self
    }

    pub fn push_float(&mut self, value: f64) {
        self.floats.push_back(value);
    }

    pub fn push_int(&mut self, value: usize) {
        self.ints.push_back(value);
    }
}

impl RandomSource for ScriptedSource {
    fn draw(&mut self) -> f64 {
        self.floats.pop_front().unwrap_or(0.0).clamp(0.0, 1.0 - f64::EPSILON)
    }

    fn draw_int(&mut self, n: usize) -> usize {
        self.ints.pop_front().unwrap_or(0) % n.max(1)
    }
}

/// In-place Fisher-Yates shuffle driven by a [`RandomSource`].
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.draw_int(i + 1);
        items.swap(i, j);
    }
}
