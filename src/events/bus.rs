//! # Lifecycle event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so the registry, the lifecycle
//! controller, timers and observer workers can all report what they do without
//! waiting on whoever is listening.
//!
//! ```text
//! Publishers:                          Receivers:
//!   subscribe/unsubscribe ──┐
//!   transport status     ───┼──► Bus ──┬──► observer forwarder ──► ObserverSet
//!   retry timers         ───┤          └──► Multiplexer::events() receivers
//!   observer workers     ───┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks; with no receivers the event is simply dropped.
//! - Capacity is shared; a lagging receiver gets `RecvError::Lagged(n)` and skips `n` events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
