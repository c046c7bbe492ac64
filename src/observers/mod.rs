//! # Lifecycle observers.
//!
//! Observers watch the multiplexer's own [`Event`](crate::Event)s (not the row
//! changes, which go to listeners). Typical uses: logging, metrics, a
//! "realtime disconnected" indicator driven by `ResourceDegraded`.
//!
//! ```text
//! core ── publish(Event) ──► Bus ──► forwarder ──► ObserverSet::emit
//!                                                   ├─► LogWriter
//!                                                   └─► user observers
//! ```

#[cfg(feature = "logging")]
mod log;
mod observer;
mod observer_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observer::Observe;
pub use observer_set::ObserverSet;
