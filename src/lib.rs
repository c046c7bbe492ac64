//! # changemux
//!
//! **changemux** turns a database's row-level change stream into shared,
//! de-duplicated, self-healing subscriptions for any number of independent
//! consumers.
//!
//! Every UI panel that wants to know when `entities` changes calls
//! [`Multiplexer::subscribe`]. Only the first one opens a subscription on the
//! realtime service; the rest share it. Bursts of changes are throttled, a
//! dropped connection is reopened with exponential backoff, and when the last
//! consumer leaves the subscription is closed for good.
//!
//! ## Architecture
//! ```text
//!   subscribe("entities", f1)   subscribe("entities", f2)   subscribe("zones", f3)
//!            │                          │                          │
//!            ▼                          ▼                          ▼
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │  Multiplexer (cloneable handle)                                            │
//! │  - Registry      resource → [listeners], transport handle, generation      │
//! │  - Lifecycle     NONE → CONNECTING → CONNECTED → CLOSED/ERROR → ...        │
//! │  - Throttle      per resource, drop events closer than `throttle`          │
//! │  - Backoff       per resource, first × factor^n, cap → cool-down → reset   │
//! └──────┬────────────────────────────────────────────▲────────────────┬──────┘
//!        │ open(resource, sink) / close(handle)        │ sink.emit(ev)  │ publish(Event)
//!        ▼                                             │ sink.status(s) ▼
//!   ┌───────────┐                                      │          ┌─────────┐
//!   │ Transport │ ─────────────────────────────────────┘          │   Bus   │──► Observers
//!   └───────────┘                                                 └─────────┘   (LogWriter, ...)
//! ```
//!
//! ### Reconnect loop (per resource)
//! ```text
//! status Closed/Error (or open() failed)
//!   ├─► last listener already gone / shutdown in progress ─► stop
//!   ├─► attempts += 1
//!   ├─► attempts <  max_attempts ─► sleep(first × factor^attempts)   (cancellable)
//!   ├─► attempts >= max_attempts ─► ResourceDegraded, sleep(cooldown), attempts = 0
//!   └─► open(resource) with a fresh generation
//! status Connected ─► attempts = 0
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types                                  |
//! |-------------------|-----------------------------------------------------------|--------------------------------------------|
//! | **Subscriptions** | Shared per-resource subscriptions with idempotent removal | [`Multiplexer`], [`Subscription`]          |
//! | **Transport**     | Plug in the realtime client                               | [`Transport`], [`TransportSink`]           |
//! | **Policies**      | Reconnect backoff, cool-down, jitter                      | [`BackoffPolicy`], [`JitterPolicy`]        |
//! | **Observability** | Lifecycle events and observers                            | [`Event`], [`EventKind`], [`Observe`]      |
//! | **Configuration** | Throttle, grace period, retry delays                      | [`MuxConfig`]                              |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], an observer writing lifecycle events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use changemux::{
//!     ChangeEvent, Multiplexer, Transport, TransportError, TransportHandle, TransportSink,
//!     TransportStatus,
//! };
//!
//! /// Pretends to be a realtime client that connects instantly.
//! struct Loopback;
//!
//! impl Transport for Loopback {
//!     fn open(&self, _resource: &str, sink: TransportSink) -> Result<TransportHandle, TransportError> {
//!         sink.status(TransportStatus::Connected);
//!         Ok(TransportHandle::new(1))
//!     }
//!     fn close(&self, _handle: TransportHandle) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mux = Multiplexer::builder(Arc::new(Loopback)).build()?;
//!
//!     let sub = mux.subscribe("entities", |ev: &ChangeEvent| {
//!         println!("entities changed: {:?}", ev.kind);
//!     });
//!     assert_eq!(mux.status().listener_count("entities"), 1);
//!
//!     sub.unsubscribe();
//!     assert!(mux.status().resources.is_empty());
//!     Ok(())
//! }
//! ```
mod change;
mod config;
mod core;
mod error;
mod events;
mod observers;
mod policies;
mod transport;

// ---- Public re-exports ----

pub use crate::change::{ChangeEvent, ChangeKind};
pub use crate::config::MuxConfig;
pub use crate::core::{
    ConnectionState, ListenerId, Multiplexer, MultiplexerBuilder, MuxStatus, ResourceStatus,
    Subscription,
};
pub use crate::error::{MuxError, TransportError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::observers::{Observe, ObserverSet};
pub use crate::policies::{BackoffPolicy, JitterPolicy};
pub use crate::transport::{Transport, TransportHandle, TransportSink, TransportStatus};

#[cfg(feature = "logging")]
pub use crate::observers::LogWriter;
