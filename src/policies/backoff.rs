//! # Backoff policy for polling and retry delays.
//!
//! [`BackoffPolicy`] computes how long to wait before the next check or attempt.
//! The engine uses it in two places:
//! - the shutdown loop polls worker status every `poll.next(n)` (see [`BackoffPolicy::poll`]);
//! - a [`Retry`](crate::Retry) wrapper optionally sleeps `backoff.next(n)` between attempts.
//!
//! The delay for step `n` is `first × factor^n`, clamped to `max`, then jitter is applied.
//! The base is derived from `n` alone, so jitter never feeds back into later steps.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use taskdispatch::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Exponential delay policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay for step 0.
    pub first: Duration,
    /// Upper bound for any step.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a constant 100ms delay capped at 30s, without jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Policy used by the shutdown loop: 500ms growing by ×1.1, capped at 5s.
    pub const fn poll() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(5),
            factor: 1.1,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given step (0-indexed).
    ///
    /// Non-finite or out-of-range intermediate values clamp to [`BackoffPolicy::max`].
    pub fn next(&self, step: u32) -> Duration {
        let exp = step.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
