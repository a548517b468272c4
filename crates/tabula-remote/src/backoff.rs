use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cancel::CancelSignal;
use crate::error::{RemoteError, RemoteResult};

/// Exponential backoff parameters for retrying reset connections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min: Duration::from_micros(128),
            max: Duration::from_millis(1024),
            factor: 2.0,
            jitter: true,
        }
    }
}

/// Delay sequence for one logical operation.
///
/// The base delay is `min * factor^attempt` capped at `max`. With jitter the
/// delay is drawn from `[base / 2, base]`. Every delay stays within
/// `[min, max]` and is never shorter than the one before it.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
    last: Duration,
    rng: StdRng,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }

    /// Deterministic jitter, for reproducible schedules.
    pub fn seeded(policy: BackoffPolicy, seed: u64) -> Self {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(policy: BackoffPolicy, rng: StdRng) -> Self {
        Self {
            policy,
            attempt: 0,
            last: Duration::ZERO,
            rng,
        }
    }

    /// Delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&mut self) -> Duration {
        // Whole nanoseconds keep unjittered delays exact.
        let min = self.policy.min.as_nanos() as f64;
        let max = (self.policy.max.as_nanos() as f64).max(min);
        let factor = if self.policy.factor.is_finite() && self.policy.factor >= 1.0 {
            self.policy.factor
        } else {
            1.0
        };

        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let base = (min * factor.powi(exponent)).min(max);
        let nanos = if self.policy.jitter {
            self.rng.gen_range(base / 2.0..=base)
        } else {
            base
        };

        let delay = Duration::from_nanos(nanos.max(min).min(max) as u64).max(self.last);
        self.last = delay;
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last = Duration::ZERO;
    }
}

/// Where retry delays are spent. Swapped out in tests to observe the
/// schedule without waiting it out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `op` until it returns anything other than a connection reset.
///
/// Resets are retried without limit, sequentially, sleeping on the backoff
/// schedule in between. `cancel` is checked before every sleep and raced
/// against it, so only cancellation ends a run of resets early.
pub async fn retry_on_reset<F, Fut, T>(
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancelSignal,
    mut op: F,
) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut backoff: Option<Backoff> = None;
    loop {
        let err = match op().await {
            Err(err) if err.is_connection_reset() => err,
            other => return other,
        };

        let backoff = backoff.get_or_insert_with(|| Backoff::new(policy.clone()));
        let delay = backoff.next_delay();
        warn!(
            attempt = backoff.attempts(),
            delay = ?delay,
            error = %err,
            "connection reset, retrying read"
        );

        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        tokio::select! {
            _ = sleeper.sleep(delay) => {}
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
        }
    }
}
