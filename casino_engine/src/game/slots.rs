//! Weighted-reel slot machines.
//!
//! Both variants share the same resolution: each reel lands on a symbol
//! picked against the table's cumulative rarities, and any symbol showing
//! three or more times pays `wager * multiplier * combo`.

use serde::{Deserialize, Serialize};

use super::{
    WinTier,
    errors::{GameError, GameResult},
    jackpot::JackpotPool,
};
use crate::rng::RandomSource;

/// Allowed drift of the rarity sum from 1.0.
pub const RARITY_TOLERANCE: f64 = 1e-9;

pub const BASIC_REELS: usize = 3;
pub const PROGRESSIVE_REELS: usize = 5;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Symbol {
    pub id: u8,
    pub name: String,
    pub multiplier: i64,
    pub rarity: f64,
}

impl Symbol {
    pub fn new(id: u8, name: &str, multiplier: i64, rarity: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            multiplier,
            rarity,
        }
    }
}

/// Ordered symbols whose rarities sum to 1.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Build a table, rejecting empty tables, negative rarities and rarity
    /// sums further than [`RARITY_TOLERANCE`] from 1.
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidSymbolTable` - The table fails validation
    pub fn new(symbols: Vec<Symbol>) -> GameResult<Self> {
        if symbols.is_empty() {
            return Err(GameError::InvalidSymbolTable("no symbols".to_string()));
        }
        if let Some(bad) = symbols
            .iter()
            .find(|s| !s.rarity.is_finite() || s.rarity < 0.0 || s.multiplier < 0)
        {
            return Err(GameError::InvalidSymbolTable(format!(
                "symbol {} has rarity {} and multiplier {}",
                bad.name, bad.rarity, bad.multiplier
            )));
        }

        let total: f64 = symbols.iter().map(|s| s.rarity).sum();
        if (total - 1.0).abs() > RARITY_TOLERANCE {
            return Err(GameError::InvalidSymbolTable(format!(
                "rarities sum to {total}"
            )));
        }

        Ok(Self { symbols })
    }

    /// The 9-symbol table used by the basic 3-reel machine.
    pub fn basic() -> Self {
        Self {
            symbols: vec![
                Symbol::new(0, "Cherry", 2, 0.25),
                Symbol::new(1, "Lemon", 3, 0.20),
                Symbol::new(2, "Orange", 4, 0.15),
                Symbol::new(3, "Grapes", 6, 0.12),
                Symbol::new(4, "Bell", 8, 0.10),
                Symbol::new(5, "Star", 12, 0.08),
                Symbol::new(6, "Diamond", 20, 0.05),
                Symbol::new(7, "Lucky 7", 50, 0.03),
                Symbol::new(8, "Crown", 100, 0.02),
            ],
        }
    }

    /// The 6-symbol table used by the progressive 5-reel machine.
    pub fn progressive() -> Self {
        Self {
            symbols: vec![
                Symbol::new(0, "Cherry", 2, 0.30),
                Symbol::new(1, "Lemon", 3, 0.25),
                Symbol::new(2, "Bell", 5, 0.20),
                Symbol::new(3, "Diamond", 10, 0.15),
                Symbol::new(4, "Star", 15, 0.08),
                Symbol::new(5, "Crown", 25, 0.02),
            ],
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn total_rarity(&self) -> f64 {
        self.symbols.iter().map(|s| s.rarity).sum()
    }

    /// Index of the first symbol whose cumulative rarity reaches `draw`.
    ///
    /// Rounding can leave `draw` above the final cumulative sum, in which
    /// case the last symbol is used.
    pub fn index_for(&self, draw: f64) -> usize {
        let mut cumulative = 0.0;
        for (i, symbol) in self.symbols.iter().enumerate() {
            cumulative += symbol.rarity;
            if draw <= cumulative {
                return i;
            }
        }
        self.symbols.len() - 1
    }

    pub fn pick(&self, rng: &mut dyn RandomSource) -> usize {
        self.index_for(rng.draw())
    }
}

/// Bonus factor for `count` matching reels.
pub fn combo_multiplier(count: usize) -> i64 {
    match count {
        3 => 1,
        4 => 3,
        n if n >= 5 => 10,
        _ => 0,
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SlotOutcome {
    /// Symbol names, one per reel.
    pub reels: Vec<String>,
    /// Every symbol shown at least three times, with its count.
    pub matches: Vec<(String, usize)>,
    pub line_win: i64,
    pub jackpot_award: i64,
    pub all_same_override: bool,
}

/// A settled spin, before any ledger movement.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotSpin {
    pub outcome: SlotOutcome,
    pub returned: i64,
    pub tier: WinTier,
}

impl SlotSpin {
    pub fn message(&self) -> String {
        match self.tier {
            WinTier::None => "No win this time.".to_string(),
            WinTier::Normal => format!("You won {}!", self.returned),
            WinTier::Big => format!("Big win! {}", self.returned),
            WinTier::Mega => format!("MEGA WIN! {}", self.returned),
            WinTier::Jackpot => format!(
                "JACKPOT! {} including a {} progressive award",
                self.returned, self.outcome.jackpot_award
            ),
        }
    }
}

/// A configured machine: table, reel count, bonus odds and tier thresholds.
#[derive(Clone, Debug)]
pub struct SlotMachine {
    table: SymbolTable,
    reels: usize,
    all_same_chance: f64,
    jackpot_chance: f64,
    big_at: i64,
    mega_at: i64,
}

impl SlotMachine {
    /// 3 reels with the "all reels identical" override.
    pub fn basic(all_same_chance: f64) -> Self {
        Self {
            table: SymbolTable::basic(),
            reels: BASIC_REELS,
            all_same_chance,
            jackpot_chance: 0.0,
            big_at: 10,
            mega_at: 50,
        }
    }

    /// 5 reels feeding and paying a progressive pool.
    pub fn progressive(jackpot_chance: f64) -> Self {
        Self {
            table: SymbolTable::progressive(),
            reels: PROGRESSIVE_REELS,
            all_same_chance: 0.0,
            jackpot_chance,
            big_at: 20,
            mega_at: 100,
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: SymbolTable) -> Self {
        self.table = table;
        self
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn reels(&self) -> usize {
        self.reels
    }

    /// Spin once.
    ///
    /// With a pool the wager is contributed first, and a winning spin may
    /// additionally collect the whole pool.
    ///
    /// # Arguments
    ///
    /// * `wager` - Stake already debited from the player
    /// * `rng` - Source for every reel and bonus draw
    /// * `pool` - Progressive pool, if this machine feeds one
    pub fn spin(
        &self,
        wager: i64,
        rng: &mut dyn RandomSource,
        mut pool: Option<&mut JackpotPool>,
    ) -> SlotSpin {
        if let Some(pool) = pool.as_deref_mut() {
            pool.contribute(wager);
        }

        let all_same_override = self.all_same_chance > 0.0 && rng.draw() < self.all_same_chance;
        // The forced symbol is uniform over the table, not rarity-weighted.
        let indices: Vec<usize> = if all_same_override {
            let forced = rng.draw_int(self.table.symbols.len()) % self.table.symbols.len();
            vec![forced; self.reels]
        } else {
            (0..self.reels).map(|_| self.table.pick(rng)).collect()
        };

        let mut counts = vec![0usize; self.table.symbols.len()];
        for &i in &indices {
            counts[i] += 1;
        }

        let mut line_win = 0i64;
        let mut matches = Vec::new();
        for (i, &count) in counts.iter().enumerate() {
            if count >= 3 {
                let symbol = &self.table.symbols[i];
                line_win = line_win.saturating_add(
                    wager
                        .saturating_mul(symbol.multiplier)
                        .saturating_mul(combo_multiplier(count)),
                );
                matches.push((symbol.name.clone(), count));
            }
        }

        let mut jackpot_award = 0;
        if let Some(pool) = pool {
            if line_win > 0 && self.jackpot_chance > 0.0 && rng.draw() < self.jackpot_chance {
                jackpot_award = pool.award();
            }
        }

        let returned = line_win.saturating_add(jackpot_award);
        let tier = if jackpot_award > 0 {
            WinTier::Jackpot
        } else if returned == 0 {
            WinTier::None
        } else if returned >= wager.saturating_mul(self.mega_at) {
            WinTier::Mega
        } else if returned >= wager.saturating_mul(self.big_at) {
            WinTier::Big
        } else {
            WinTier::Normal
        };

        SlotSpin {
            outcome: SlotOutcome {
                reels: indices
                    .iter()
                    .map(|&i| self.table.symbols[i].name.clone())
                    .collect(),
                matches,
                line_win,
                jackpot_award,
                all_same_override,
            },
            returned,
            tier,
        }
    }
}
