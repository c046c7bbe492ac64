//! # Callback side of a transport subscription.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::change::ChangeEvent;
use crate::core::Shared;
use crate::transport::TransportStatus;

/// Handed to [`Transport::open`](crate::Transport::open); the transport reports
/// change events and status transitions for that one subscription through it.
///
/// Each sink is bound to a single open attempt. Once that attempt is replaced
/// (reconnect) or torn down (last listener left, shutdown), calls on the old
/// sink are ignored, so a transport never has to track which sinks are still wanted.
#[derive(Clone)]
pub struct TransportSink {
    shared: Weak<Shared>,
    resource: Arc<str>,
    generation: u64,
}

impl TransportSink {
    pub(crate) fn new(shared: Weak<Shared>, resource: Arc<str>, generation: u64) -> Self {
        Self {
            shared,
            resource,
            generation,
        }
    }

    /// Resource this sink belongs to.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Delivers one change event (subject to throttling).
    pub fn emit(&self, event: ChangeEvent) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_raw_event(&self.resource, self.generation, event);
        }
    }

    /// Reports a status transition.
    pub fn status(&self, status: TransportStatus) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_status(&self.resource, self.generation, status);
        }
    }

    /// Whether the multiplexer still listens to this sink.
    ///
    /// Transports may use it to stop pumping a stream nobody wants anymore.
    pub fn is_current(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.is_current(&self.resource, self.generation))
    }
}

impl fmt::Debug for TransportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSink")
            .field("resource", &self.resource)
            .field("generation", &self.generation)
            .finish()
    }
}
