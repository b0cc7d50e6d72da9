//! Retry policy: backoff computation, the clock seam and per-request state.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;

/// Base of the exponential backoff.
pub const RETRY_BASE: f64 = 1.5;

/// Upper bound for a single backoff sleep.
pub const MAX_SLEEP: Duration = Duration::from_secs(10);

/// Minimum budget handed to a single attempt, even when the request's
/// remaining budget is smaller.
pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// How long to sleep before retry number `attempt + 1`.
///
/// `RETRY_BASE^attempt` plus a jitter drawn uniformly from
/// `[RETRY_BASE^-1, RETRY_BASE)`, capped at [`MAX_SLEEP`] and, when given,
/// at `max_wait`. The jitter desynchronizes concurrent clients.
pub fn calculate_sleep_before_retry(attempt: u32, max_wait: Option<Duration>) -> Duration {
    let jitter = rand::thread_rng().gen_range(RETRY_BASE.recip()..RETRY_BASE);
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let seconds = (RETRY_BASE.powi(exponent) + jitter).min(MAX_SLEEP.as_secs_f64());
    let duration = Duration::from_secs_f64(seconds);
    max_wait.map_or(duration, |max_wait| duration.min(max_wait))
}

// ============================================================================
// Clock
// ============================================================================

/// Time source and sleeper used by the retry loop.
#[async_trait]
pub trait RetryClock: Send + Sync {
    fn now(&self) -> Instant;

    /// Back off after `attempt` failed, sleeping no longer than `max_wait`.
    async fn sleep_before_retry(&self, attempt: u32, max_wait: Option<Duration>);
}

/// Wall clock with real tokio sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl RetryClock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_before_retry(&self, attempt: u32, max_wait: Option<Duration>) {
        tokio::time::sleep(calculate_sleep_before_retry(attempt, max_wait)).await;
    }
}

// ============================================================================
// Retry State
// ============================================================================

/// Per-request retry bookkeeping, discarded once the request resolves.
///
/// `attempt` counts backoff slots and is bounded by `max_attempts`;
/// `sequence` is the value injected into each attempt and advances on
/// every attempt, including re-authentication retries.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    sequence: u32,
    max_attempts: u32,
    /// `None` when the timeout is too large to represent as an instant.
    deadline: Option<Instant>,
}

impl RetryState {
    /// Start tracking a request at `now` with the given bounds.
    pub fn new(now: Instant, max_attempts: u32, timeout: Duration) -> Self {
        let deadline = now.checked_add(timeout);
        Self {
            attempt: 0,
            sequence: 0,
            max_attempts: max_attempts.max(1),
            deadline,
        }
    }

    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Take the counter value for the next attempt.
    pub const fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence += 1;
        sequence
    }

    /// Budget left at `now`. [`Duration::MAX`] for an unbounded request.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now))
    }

    /// If another attempt is allowed, the longest the backoff may sleep.
    ///
    /// `None` once the attempt bound is used up or the deadline has passed,
    /// whichever comes first.
    pub fn backoff_budget(&self, now: Instant) -> Option<Duration> {
        if self.attempt + 1 >= self.max_attempts {
            return None;
        }
        let remaining = self.remaining(now);
        (!remaining.is_zero()).then_some(remaining)
    }

    /// Move to the next backoff slot.
    pub const fn advance(&mut self) {
        self.attempt += 1;
    }
}

// ============================================================================
// Manual Clock for Testing
// ============================================================================
