//! Patient wait: poll a supplier until a predicate passes or time runs out.
//!
//! Every wait runs on the caller's thread. "Waiting" means calling the
//! supplier, sleeping for the policy's delay, and calling it again until the
//! predicate accepts a value or the deadline passes.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use patient_locator::{poll_until, FixedInterval};
//!
//! let policy = FixedInterval(Duration::from_millis(50));
//! let items = poll_until(&policy, Duration::from_secs(2), fetch, |v: &Vec<_>| !v.is_empty());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

// ============================================================================
// WaitPolicy
// ============================================================================

/// Poll pacing strategy.
pub trait WaitPolicy: fmt::Debug {
    /// Returns how long to sleep after the given (1-based) failed attempt.
    fn delay(&self, attempt: u32) -> Duration;

    /// Blocks the current thread.
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval(pub Duration);

impl Default for FixedInterval {
    fn default() -> Self {
        Self(Duration::from_millis(100))
    }
}

impl WaitPolicy for FixedInterval {
    #[inline]
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Delay multiplied by `factor` after every attempt, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Delay after the first attempt.
    pub initial: Duration,
    /// Growth factor per attempt.
    pub factor: u32,
    /// Upper bound for a single delay.
    pub max: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            factor: 2,
            max: Duration::from_secs(1),
        }
    }
}

impl WaitPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = self.factor.max(1).checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

// ============================================================================
// WaitError
// ============================================================================

/// Why a patient wait ended without an accepted value.
#[derive(Debug)]
pub enum WaitError<T, E> {
    /// The deadline passed. Carries the last rejected value, if any.
    TimedOut {
        /// Last value the predicate rejected.
        last: Option<T>,
        /// Number of supplier calls made.
        attempts: u32,
    },
    /// The supplier failed in a way the caller does not tolerate.
    Aborted(E),
}

// ============================================================================
// poll_until
// ============================================================================

/// Returns `duration` in whole milliseconds, saturating at `u64::MAX`.
#[inline]
#[must_use]
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Calls `supplier` until `predicate` accepts its value or `timeout` elapses.
///
/// The supplier is always called at least once. A zero timeout makes exactly
/// one attempt and never sleeps. Sleeps never overshoot the deadline.
///
/// # Errors
///
/// - [`WaitError::Aborted`] as soon as the supplier returns an error
/// - [`WaitError::TimedOut`] when the deadline passes
pub fn poll_until<T, E>(
    policy: &dyn WaitPolicy,
    timeout: Duration,
    mut supplier: impl FnMut() -> Result<T, E>,
    mut predicate: impl FnMut(&T) -> bool,
) -> Result<T, WaitError<T, E>> {
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);
        let value = supplier().map_err(WaitError::Aborted)?;
        if predicate(&value) {
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            trace!(attempts, timeout_ms = saturating_millis(timeout), "Wait timed out");
            return Err(WaitError::TimedOut {
                last: Some(value),
                attempts,
            });
        }

        let pause = policy.delay(attempts).min(timeout - elapsed);
        policy.sleep(pause);
    }
}

// ============================================================================
// Tests
// ============================================================================
