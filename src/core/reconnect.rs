//! # Per-resource reconnect bookkeeping.
//!
//! [`BackoffState`] is the mutable half of the backoff engine: one per resource,
//! driven by the lifecycle controller, reading the shared [`BackoffPolicy`].
//!
//! ```text
//! failure ─► attempts += 1 (saturating at cap)
//!              ├─ attempts <  cap ─► Retry::Backoff(max(first × factor^attempts, fixed, previous delay))
//!              └─ attempts >= cap ─► Retry::Cooldown(cooldown)
//!                                      └─ timer fires ─► resume(): attempts = 0
//! connected ─► reset(): attempts = 0, previous delay forgotten
//! ```

use std::time::Duration;

use crate::policies::BackoffPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPhase {
    Backoff,
    Cooldown,
}

/// Decision produced for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Retry {
    pub delay: Duration,
    pub attempt: u32,
    pub phase: RetryPhase,
}

#[derive(Debug, Default)]
pub(crate) struct BackoffState {
    attempts: u32,
    cooling_down: bool,
    /// Longest delay scheduled since the last reset; delays never shrink below it.
    floor: Duration,
}

impl BackoffState {
    /// Records one failure and returns when to try again.
    ///
    /// `fixed` (used for open failures) raises the exponential delay to at
    /// least that value. The cool-down always wins once the cap is reached.
    pub fn on_failure(&mut self, policy: &BackoffPolicy, fixed: Option<Duration>) -> Retry {
        let cap = policy.attempt_cap();
        if self.attempts < cap {
            self.attempts += 1;
        }

        if self.attempts >= cap {
            self.cooling_down = true;
            return Retry {
                delay: policy.cooldown,
                attempt: self.attempts,
                phase: RetryPhase::Cooldown,
            };
        }

        let base = policy.next(self.attempts);
        let delay = fixed.map_or(base, |f| f.max(base)).max(self.floor);
        self.floor = delay;
        Retry {
            delay,
            attempt: self.attempts,
            phase: RetryPhase::Backoff,
        }
    }

    /// Called when a scheduled retry fires; ends a cool-down by resetting the counter.
    pub fn resume(&mut self) {
        if self.cooling_down {
            self.reset();
        }
    }

    /// Called on a confirmed connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.cooling_down = false;
        self.floor = Duration::ZERO;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[cfg(test)]
    pub fn is_cooling_down(&self) -> bool {
        self.cooling_down
    }
}
