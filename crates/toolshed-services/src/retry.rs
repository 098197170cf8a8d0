//! Retry policy for external calls.
//!
//! The decision (`should_retry`) is a pure function of the error and the
//! attempt count, so it can be tested without any executor. `run` drives an
//! async operation through it, sleeping between attempts with
//! `tokio::time::sleep` so only the calling task is suspended.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use toolshed_core::config::{BackoffKind, RetryConfig};
use toolshed_core::{ExecError, GiveUpReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// base * 2^(attempt-1), capped at `max_delay`.
    Exponential,
}

impl From<BackoffKind> for Backoff {
    fn from(kind: BackoffKind) -> Self {
        match kind {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

/// Per-job attempt counter. Created at job start, dropped at job end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts made so far (1 after the first call returns).
    pub attempt: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// The retry loop stopped with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaveUp {
    pub error: ExecError,
    pub reason: GiveUpReason,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
    /// Fraction (0.0-1.0) of the computed delay added as random jitter.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
            jitter: 0.0,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            backoff: Backoff::Exponential,
            jitter: 0.1,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.delay(),
            max_delay: config.max_delay().max(config.delay()),
            backoff: config.backoff.into(),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Decide what to do after `state.attempt` attempts ended with `err`.
    pub fn should_retry(&self, err: &ExecError, state: &RetryState) -> RetryDecision {
        if !err.is_transient() || state.attempt >= state.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.delay_for_attempt(state.attempt))
    }

    /// Delay before the retry that follows attempt `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor).min(self.max_delay)
            }
        };
        if self.jitter > 0.0 {
            let extra = delay.as_secs_f64() * self.jitter * rand::thread_rng().gen_range(0.0..=1.0);
            delay + Duration::from_secs_f64(extra)
        } else {
            delay
        }
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// `op` receives the 1-indexed attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, GaveUp>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExecError>>,
    {
        let mut state = RetryState::new(self.max_attempts);
        loop {
            state.attempt += 1;
            let err = match op(state.attempt).await {
                Ok(value) => {
                    if state.attempt > 1 {
                        tracing::info!(job = label, attempt = state.attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            match self.should_retry(&err, &state) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        job = label,
                        attempt = state.attempt,
                        retries_left = state.max_attempts - state.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    let reason = if err.is_transient() {
                        GiveUpReason::Exhausted
                    } else {
                        GiveUpReason::Permanent
                    };
                    tracing::debug!(job = label, attempt = state.attempt, ?reason, error = %err, "giving up");
                    return Err(GaveUp {
                        error: err,
                        reason,
                        attempts: state.attempt,
                    });
                }
            }
        }
    }
}
