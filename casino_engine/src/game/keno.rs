//! 80-ball keno with a progressive top prize.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{
    entities::{KENO_DRAW_SIZE, KENO_MAX_PICKS, KENO_POOL_SIZE, keno_multiplier},
    errors::{GameError, GameResult},
    jackpot::JackpotPool,
};
use crate::rng::RandomSource;

/// A validated selection of 1..=10 distinct numbers in 1..=80.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct KenoTicket(Vec<u8>);

impl KenoTicket {
    /// # Errors
    ///
    /// * `GameError::InvalidSelection` - Empty, too many, out of range or repeated numbers
    pub fn new(numbers: Vec<u8>) -> GameResult<Self> {
        if numbers.is_empty() || numbers.len() > KENO_MAX_PICKS {
            return Err(GameError::InvalidSelection(format!(
                "select 1-{KENO_MAX_PICKS} numbers, got {}",
                numbers.len()
            )));
        }
        if let Some(n) = numbers.iter().find(|&&n| n == 0 || n > KENO_POOL_SIZE) {
            return Err(GameError::InvalidSelection(format!(
                "number {n} is outside 1-{KENO_POOL_SIZE}"
            )));
        }
        let unique: HashSet<u8> = numbers.iter().copied().collect();
        if unique.len() != numbers.len() {
            return Err(GameError::InvalidSelection(
                "numbers must be distinct".to_string(),
            ));
        }
        Ok(Self(numbers))
    }

    pub fn numbers(&self) -> &[u8] {
        &self.0
    }

    pub fn picks(&self) -> usize {
        self.0.len()
    }
}

impl TryFrom<Vec<u8>> for KenoTicket {
    type Error = GameError;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(numbers)
    }
}

impl From<KenoTicket> for Vec<u8> {
    fn from(ticket: KenoTicket) -> Self {
        ticket.0
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct KenoOutcome {
    pub selected: Vec<u8>,
    pub drawn: Vec<u8>,
    pub hits: usize,
    pub multiplier: i64,
    pub jackpot_award: i64,
}

/// Draw 20 distinct numbers without replacement.
pub fn draw_numbers(rng: &mut dyn RandomSource) -> Vec<u8> {
    let mut available: Vec<u8> = (1..=KENO_POOL_SIZE).collect();
    (0..KENO_DRAW_SIZE)
        .map(|_| {
            let idx = rng.draw_int(available.len());
            available.remove(idx)
        })
        .collect()
}

/// Play one ticket. Every wager feeds the pool; ten of ten also takes it.
///
/// Returns the outcome and the gross amount owed.
pub fn play(
    ticket: &KenoTicket,
    wager: i64,
    rng: &mut dyn RandomSource,
    pool: &mut JackpotPool,
) -> (KenoOutcome, i64) {
    pool.contribute(wager);

    let drawn = draw_numbers(rng);
    let drawn_set: HashSet<u8> = drawn.iter().copied().collect();
    let hits = ticket
        .numbers()
        .iter()
        .filter(|n| drawn_set.contains(n))
        .count();

    let multiplier = keno_multiplier(ticket.picks(), hits);
    let jackpot_award = if ticket.picks() == KENO_MAX_PICKS && hits == KENO_MAX_PICKS {
        pool.award()
    } else {
        0
    };
    let returned = wager
        .saturating_mul(multiplier)
        .saturating_add(jackpot_award);

    (
        KenoOutcome {
            selected: ticket.numbers().to_vec(),
            drawn,
            hits,
            multiplier,
            jackpot_award,
        },
        returned,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{GameRng, ScriptedSource};

    #[test]
    fn test_ticket_validation() {
        assert!(KenoTicket::new(vec![1, 2, 3]).is_ok());
        assert!(KenoTicket::new((1..=10).collect()).is_ok());
        for bad in [vec![], (1..=11).collect(), vec![0, 5], vec![81], vec![4, 4]] {
            assert!(matches!(
                KenoTicket::new(bad),
                Err(GameError::InvalidSelection(_))
            ));
        }
    }

    #[test]
    fn test_ticket_deserialization_validates() {
        assert!(serde_json::from_str::<KenoTicket>("[1,2,3]").is_ok());
        assert!(serde_json::from_str::<KenoTicket>("[1,1]").is_err());
    }

    #[test]
    fn test_draw_is_twenty_distinct_numbers() {
        let mut rng = GameRng::seeded(5);
        for _ in 0..100 {
            let drawn = draw_numbers(&mut rng);
            assert_eq!(drawn.len(), KENO_DRAW_SIZE);
            let unique: HashSet<u8> = drawn.iter().copied().collect();
            assert_eq!(unique.len(), KENO_DRAW_SIZE);
            assert!(drawn.iter().all(|&n| (1..=KENO_POOL_SIZE).contains(&n)));
        }
    }

    #[test]
    fn test_zero_script_draws_lowest_numbers() {
        let mut rng = ScriptedSource::new();
        assert_eq!(draw_numbers(&mut rng), (1..=20).collect::<Vec<u8>>());
    }

    #[test]
    fn test_ten_of_ten_awards_jackpot_and_resets() {
        let ticket = KenoTicket::new((1..=10).collect()).unwrap();
        let mut pool = JackpotPool::new(50_000, 100);
        let mut rng = ScriptedSource::new();
        let (outcome, returned) = play(&ticket, 10, &mut rng, &mut pool);
        assert_eq!(outcome.hits, 10);
        assert_eq!(outcome.multiplier, 100_000);
        assert_eq!(outcome.jackpot_award, 50_000);
        assert_eq!(returned, 10 * 100_000 + 50_000);
        assert_eq!(pool.current(), pool.base());
    }

    #[test]
    fn test_miss_pays_nothing_but_feeds_pool() {
        let ticket = KenoTicket::new(vec![71, 72, 73, 74, 75]).unwrap();
        let mut pool = JackpotPool::new(50_000, 100);
        let mut rng = ScriptedSource::new();
        let (outcome, returned) = play(&ticket, 1_000, &mut rng, &mut pool);
        assert_eq!(outcome.hits, 0);
        assert_eq!(returned, 0);
        assert_eq!(pool.current(), 50_010);
    }

    #[test]
    fn test_partial_hits_use_table_row() {
        let ticket = KenoTicket::new(vec![1, 2, 3, 50]).unwrap();
        let mut pool = JackpotPool::new(50_000, 100);
        let mut rng = ScriptedSource::new();
        let (outcome, returned) = play(&ticket, 10, &mut rng, &mut pool);
        assert_eq!(outcome.hits, 3);
        assert_eq!(returned, 50);
    }
}
