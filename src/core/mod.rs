//! Runtime core: registry, lifecycle, throttle, backoff.
//!
//! The public API of this module is [`Multiplexer`], its builder and the
//! read-only status types.
//!
//! Internal modules:
//! - [`registry`]: resource → listeners / transport handle bookkeeping;
//! - [`lifecycle`]: opens, closes and reopens transport subscriptions;
//! - [`throttle`]: per-resource drop-latest rate limit;
//! - [`reconnect`]: per-resource attempt counter and cool-down;
//! - [`shutdown`]: termination signal handling;
//! - [`multiplexer`], [`builder`]: public facade.

mod builder;
mod lifecycle;
mod multiplexer;
mod reconnect;
mod registry;
mod shutdown;
mod throttle;

pub(crate) use lifecycle::Shared;

pub use builder::MultiplexerBuilder;
pub use multiplexer::{Multiplexer, Subscription};
pub use registry::{ConnectionState, ListenerId, MuxStatus, ResourceStatus};
