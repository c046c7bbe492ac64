//! # Per-resource delivery throttle.
//!
//! Drop-latest policy: an event arriving less than the minimum interval after
//! the last *forwarded* one is discarded. Nothing is queued or coalesced;
//! consumers re-fetch authoritative state on the next event that does get through.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Default)]
pub(crate) struct Throttle {
    last_forwarded: Option<Instant>,
}

impl Throttle {
    /// Returns `true` (and records `now`) if an event may be forwarded.
    pub fn admit(&mut self, now: Instant, min_interval: Option<Duration>) -> bool {
        let Some(min) = min_interval else {
            self.last_forwarded = Some(now);
            return true;
        };
        match self.last_forwarded {
            Some(last) if now.saturating_duration_since(last) < min => false,
            _ => {
                self.last_forwarded = Some(now);
                true
            }
        }
    }

    #[cfg(test)]
    pub fn last_forwarded(&self) -> Option<Instant> {
        self.last_forwarded
    }
}
