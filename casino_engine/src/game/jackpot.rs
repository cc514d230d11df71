//! Progressive jackpot pools.

use serde::{Deserialize, Serialize};

/// Basis points in one whole.
const BPS_SCALE: i64 = 10_000;

/// A pool that grows with every wager and resets to its base when awarded.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct JackpotPool {
    base: i64,
    current: i64,
    contribution_bps: i64,
}

impl JackpotPool {
    pub fn new(base: i64, contribution_bps: i64) -> Self {
        let base = base.max(0);
        Self {
            base,
            current: base,
            contribution_bps: contribution_bps.clamp(0, BPS_SCALE),
        }
    }

    pub fn base(&self) -> i64 {
        self.base
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    /// Add the configured share of `wager`. Returns the contribution.
    pub fn contribute(&mut self, wager: i64) -> i64 {
        let share = wager.max(0).saturating_mul(self.contribution_bps) / BPS_SCALE;
        self.current = self.current.saturating_add(share);
        share
    }

    /// Pay out the whole pool and reset it to base.
    pub fn award(&mut self) -> i64 {
        std::mem::replace(&mut self.current, self.base)
    }
}
