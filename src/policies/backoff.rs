//! # Reconnect backoff policy.
//!
//! [`BackoffPolicy`] decides how long a resource waits before its transport
//! subscription is reopened after a non-intentional close. It is parameterized by:
//! - [`BackoffPolicy::first`] the base delay;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the ceiling for a single exponential delay;
//! - [`BackoffPolicy::max_attempts`] the attempt cap that triggers the cool-down;
//! - [`BackoffPolicy::cooldown`] the long pause taken once the cap is hit.
//!
//! The delay for failure number `n` (1-based) is `first × factor^n`, clamped to `max`,
//! then jittered. The base is derived from `n` alone, so jitter never compounds.
//!
//! Once `n` reaches `max_attempts` the resource waits `cooldown` instead, after which
//! the attempt counter silently resets and the exponential schedule starts over.
//! There is no terminal "give up" state.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use changemux::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//!     max_attempts: 5,
//!     cooldown: Duration::from_secs(60),
//! };
//!
//! assert_eq!(backoff.next(1), Duration::from_secs(1));
//! assert_eq!(backoff.next(3), Duration::from_secs(4));
//! // 500ms × 2^10 = 512s → capped at max=30s
//! assert_eq!(backoff.next(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect backoff policy, shared by every resource of one multiplexer.
///
/// The policy itself is stateless; each resource keeps its own attempt counter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Base delay, multiplied by `factor^attempt`.
    pub first: Duration,
    /// Ceiling for a single exponential delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied on top of the clamped delay.
    pub jitter: JitterPolicy,
    /// Failures tolerated before the cool-down kicks in (min 1).
    pub max_attempts: u32,
    /// Pause taken once `max_attempts` is reached, before the counter resets.
    pub cooldown: Duration,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 500ms`, `factor = 2.0`, `max = 30s` (1s, 2s, 4s, 8s, ...);
    /// - `max_attempts = 5`;
    /// - `cooldown = 60s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
            max_attempts: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Computes the exponential delay for the given attempt number.
    ///
    /// The base delay is `first × factor^attempt`, clamped to [`BackoffPolicy::max`];
    /// non-finite or negative intermediate values also clamp to `max`.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }

    /// Attempt cap clamped to a minimum of 1.
    #[inline]
    pub fn attempt_cap(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
