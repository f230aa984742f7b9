//! Retry backoff and circuit breaking for licensing authority calls.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How many times to retry a transient failure, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)] // retry count won't exceed i32
        let secs = self.initial_delay.as_secs_f64()
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(secs).min(self.max_delay)
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Consecutive-failure circuit breaker.
///
/// After `failure_threshold` transient failures in a row the circuit opens and
/// calls fail fast until `cooldown` has passed. The next call after the
/// cooldown is let through as a trial: success closes the circuit, failure
/// re-opens it for another cooldown.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Whether a call may proceed right now.
    pub fn allow(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .opened_at
            .is_none_or(|opened| opened.elapsed() >= self.cooldown)
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = BreakerState::default();
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.failure_threshold {
            state.opened_at = Some(Instant::now());
        }
    }

    /// Whether the circuit is currently open (failing fast).
    pub fn is_open(&self) -> bool {
        !self.allow()
    }
}
