//! Credit settlement with bounded, jittered retries.

use rand::Rng;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    game::{GameError, GameResult},
    ledger::{Balance, Ledger, PlayerId},
};

/// Equal jitter: a delay in `[backoff / 2, backoff]`.
pub(crate) fn jittered_backoff(rng: &mut impl Rng, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.random_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Settle `amount` for `round`, retrying storage failures with exponential
/// backoff.
///
/// Every attempt goes through [`Ledger::settle_round`], so an attempt that
/// committed but timed out before answering is not paid again. Rule failures
/// (unknown account, overflow) are not retried. Whatever the cause, a credit
/// that never lands escalates as [`GameError::UnsettledCredit`] so the owed
/// amount is never dropped.
///
/// # Arguments
///
/// * `ledger` - Ledger to credit
/// * `player` - Player owed the amount
/// * `round` - Round or claim the amount settles
/// * `amount` - Gross amount owed, positive
/// * `attempts` - Total attempts, at least one is always made
/// * `backoff` - Delay before the first retry
pub(crate) async fn credit_with_retry(
    ledger: &dyn Ledger,
    player: PlayerId,
    round: Uuid,
    amount: i64,
    attempts: u32,
    backoff: Duration,
) -> GameResult<Balance> {
    let attempts = attempts.max(1);
    let mut delay = backoff;

    for attempt in 1..=attempts {
        match ledger.settle_round(player, round, amount).await {
            Ok(balance) => {
                if attempt > 1 {
                    log::info!("Credit of {amount} for player {player} settled on attempt {attempt}");
                }
                return Ok(balance);
            }
            Err(e) if e.is_storage_failure() && attempt < attempts => {
                let wait = jittered_backoff(&mut rand::rng(), delay);
                log::warn!(
                    "Credit of {amount} for player {player} failed (attempt {attempt}/{attempts}): {e}; retrying in {wait:?}"
                );
                tokio::time::sleep(wait).await;
                delay = delay.saturating_mul(2);
            }
            Err(e) => {
                log::error!(
                    "Credit of {amount} for player {player} could not be settled after {attempt} attempt(s): {e}"
                );
                break;
            }
        }
    }

    Err(GameError::UnsettledCredit { player, amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerError, LedgerResult, MemoryLedger};
    use async_trait::async_trait;
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` settlements with a timeout. With
    /// `commit_first` set, each failing attempt still lands before it times
    /// out.
    struct FlakyLedger {
        inner: MemoryLedger,
        failures: AtomicU32,
        commit_first: bool,
    }

    impl FlakyLedger {
        fn take_failure(&self) -> bool {
            self.failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl Ledger for FlakyLedger {
        async fn get_balance(&self, player: PlayerId) -> LedgerResult<Balance> {
            self.inner.get_balance(player).await
        }

        async fn try_debit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance> {
            self.inner.try_debit(player, amount).await
        }

        async fn credit(&self, player: PlayerId, amount: i64) -> LedgerResult<Balance> {
            self.inner.credit(player, amount).await
        }

        async fn settle_round(
            &self,
            player: PlayerId,
            round: Uuid,
            amount: i64,
        ) -> LedgerResult<Balance> {
            if self.take_failure() {
                if self.commit_first {
                    self.inner.settle_round(player, round, amount).await?;
                }
                return Err(LedgerError::Timeout(Duration::from_millis(1)));
            }
            self.inner.settle_round(player, round, amount).await
        }

        async fn adjust(&self, player: PlayerId, delta: i64) -> LedgerResult<Balance> {
            self.inner.adjust(player, delta).await
        }

        async fn open_account(&self, player: PlayerId, initial: Balance) -> LedgerResult<Balance> {
            self.inner.open_account(player, initial).await
        }
    }

    fn flaky(failures: u32) -> FlakyLedger {
        FlakyLedger {
            inner: MemoryLedger::with_accounts([(1, 100)]),
            failures: AtomicU32::new(failures),
            commit_first: false,
        }
    }

    #[test]
    fn test_jittered_backoff_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let backoff = Duration::from_millis(100);
        for _ in 0..1_000 {
            let wait = jittered_backoff(&mut rng, backoff);
            assert!(wait >= Duration::from_millis(50));
            assert!(wait <= backoff);
        }
        assert_eq!(
            jittered_backoff(&mut rng, Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let ledger = flaky(2);
        let round = Uuid::new_v4();
        let balance = credit_with_retry(&ledger, 1, round, 50, 3, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(balance, 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_lost_acknowledgement_pays_once() {
        let ledger = FlakyLedger {
            commit_first: true,
            ..flaky(1)
        };
        let round = Uuid::new_v4();

        let balance = credit_with_retry(&ledger, 1, round, 50, 3, Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(balance, 150);
        assert_eq!(ledger.inner.get_balance(1).await.unwrap(), 150);
        assert!(ledger.inner.is_settled(round).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_escalate() {
        let ledger = flaky(5);
        let result =
            credit_with_retry(&ledger, 1, Uuid::new_v4(), 50, 3, Duration::from_millis(10)).await;
        assert!(matches!(
            result,
            Err(GameError::UnsettledCredit {
                player: 1,
                amount: 50
            })
        ));
        assert_eq!(ledger.inner.get_balance(1).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_rule_failures_are_not_retried() {
        let ledger = MemoryLedger::new();
        let result =
            credit_with_retry(&ledger, 9, Uuid::new_v4(), 50, 3, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(GameError::UnsettledCredit { .. })));
    }
}
