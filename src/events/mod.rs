//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the registry and lifecycle controller in `core`, retry and
//!   grace timers, `ObserverSet` workers (overflow/panic).
//! - **Consumers**: the observer forwarder spawned by `MultiplexerBuilder::build`,
//!   and any receiver obtained through `Multiplexer::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
