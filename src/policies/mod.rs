//! Reconnect policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how reconnect delays evolve (first / factor / max, attempt cap, cool-down)
//! - [`JitterPolicy`]  randomization to avoid synchronized reconnect storms
//!
//! ## Quick wiring
//! ```text
//! MuxConfig { backoff: BackoffPolicy, open_retry_delay, .. }
//!      └─► core::reconnect::BackoffState (one per resource) uses:
//!           - backoff.next(attempts) below the cap
//!           - backoff.cooldown at the cap, then resets
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
