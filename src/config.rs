//! # Multiplexer configuration.
//!
//! Provides [`MuxConfig`] centralized settings for one [`Multiplexer`](crate::Multiplexer).
//!
//! ## Sentinel values
//! - `throttle = 0s` → every event is forwarded (no throttling)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::error::MuxError;
use crate::policies::BackoffPolicy;

/// Configuration for the multiplexer runtime.
///
/// ## Field semantics
/// - `throttle`: minimum spacing between forwarded events per resource (`0s` = off)
/// - `backoff`: reconnect schedule after a dropped transport subscription
/// - `open_retry_delay`: minimum wait after the transport fails to even open (at most `backoff.max`)
/// - `shutdown_grace`: window after `shutdown()` in which new subscriptions are parked
/// - `bus_capacity`: lifecycle event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct MuxConfig {
    /// Minimum interval between two forwarded change events of the same resource.
    ///
    /// Events arriving sooner are dropped, not queued: listeners are expected to
    /// re-fetch authoritative state rather than replay individual payloads.
    pub throttle: Duration,

    /// Reconnect backoff applied after a `closed`/`error` status.
    pub backoff: BackoffPolicy,

    /// Minimum delay before retrying when `Transport::open` itself returns an error or panics.
    ///
    /// The exponential delay applies when it is longer. Must not exceed `backoff.max`.
    pub open_retry_delay: Duration,

    /// Grace period observed after [`shutdown`](crate::Multiplexer::shutdown).
    ///
    /// Subscriptions made during the grace period are registered but their
    /// transports are only opened once it elapses.
    pub shutdown_grace: Duration,

    /// Capacity of the lifecycle event broadcast channel.
    ///
    /// Observers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,
}

impl MuxConfig {
    /// Returns the throttle interval as an `Option`.
    ///
    /// - `None` → no throttling
    /// - `Some(d)` → at most one forwarded event per `d` per resource
    #[inline]
    pub fn throttle_interval(&self) -> Option<Duration> {
        if self.throttle == Duration::ZERO {
            None
        } else {
            Some(self.throttle)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks that the reconnect settings are usable.
    ///
    /// Rejects a non-finite or sub-1 growth factor, a zero base delay, a zero
    /// attempt cap, an open retry delay longer than `backoff.max`, and a
    /// cool-down shorter than `backoff.max`.
    pub fn validate(&self) -> Result<(), MuxError> {
        let backoff = &self.backoff;
        if !backoff.factor.is_finite() || backoff.factor < 1.0 {
            return Err(MuxError::InvalidConfig {
                field: "backoff.factor",
                reason: format!("must be a finite value >= 1.0, got {}", backoff.factor),
            });
        }
        if backoff.first.is_zero() {
            return Err(MuxError::InvalidConfig {
                field: "backoff.first",
                reason: "must be greater than zero".to_string(),
            });
        }
        if backoff.max_attempts == 0 {
            return Err(MuxError::InvalidConfig {
                field: "backoff.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.open_retry_delay > backoff.max {
            return Err(MuxError::InvalidConfig {
                field: "open_retry_delay",
                reason: format!(
                    "must not exceed backoff.max ({:?}), got {:?}",
                    backoff.max, self.open_retry_delay
                ),
            });
        }
        if backoff.cooldown < backoff.max {
            return Err(MuxError::CooldownTooShort {
                cooldown: backoff.cooldown,
                max: backoff.max,
            });
        }
        Ok(())
    }
}

impl Default for MuxConfig {
    /// Default configuration:
    ///
    /// - `throttle = 100ms`
    /// - `backoff = BackoffPolicy::default()` (1s, 2s, 4s, 8s, then 60s cool-down)
    /// - `open_retry_delay = 5s`
    /// - `shutdown_grace = 500ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(100),
            backoff: BackoffPolicy::default(),
            open_retry_delay: Duration::from_secs(5),
            shutdown_grace: Duration::from_millis(500),
            bus_capacity: 1024,
        }
    }
}
