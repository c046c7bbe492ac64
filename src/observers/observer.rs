//! # Lifecycle observer trait.
//!
//! [`Observe`] is the extension point for watching the multiplexer itself:
//! connection flaps, reconnect schedules, degraded resources, listener panics.
//! It is how an application drives a "disconnected" banner or exports metrics.
//!
//! Each observer gets:
//! - a **dedicated worker task**;
//! - a **bounded queue** (capacity via [`Observe::queue_capacity`]);
//! - **panic isolation** (panics are reported as `EventKind::ObserverPanicked`).
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use async_trait::async_trait;
//! use changemux::{Event, EventKind, Observe};
//!
//! #[derive(Default)]
//! struct Banner {
//!     degraded: AtomicBool,
//! }
//!
//! #[async_trait]
//! impl Observe for Banner {
//!     async fn on_event(&self, ev: &Event) {
//!         match ev.kind {
//!             EventKind::ResourceDegraded => self.degraded.store(true, Ordering::Relaxed),
//!             EventKind::Connected => self.degraded.store(false, Ordering::Relaxed),
//!             _ => {}
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "banner" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of multiplexer lifecycle events.
///
/// ### Implementation requirements
/// - Avoid blocking the executor; use async I/O.
/// - Slow processing only fills this observer's own queue.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per observer.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
