//! # Change-stream transport boundary.
//!
//! The multiplexer does not talk to the database itself. It drives a
//! [`Transport`] that knows how to open one subscription per resource on the
//! realtime service, and receives everything back through a [`TransportSink`].
//!
//! ```text
//! core ── open(resource, sink) ──► Transport ──► realtime service
//!   ▲                                  │
//!   └── sink.emit(ChangeEvent) ────────┤
//!   └── sink.status(Connected|Closed|Error)
//! core ── close(handle) ─────────► Transport
//! ```
//!
//! ## Contract for implementors
//! - `open` must not block: start the connection and report the outcome later
//!   through `sink.status(..)`. Reporting synchronously from inside `open` is allowed.
//! - Return `Err` (or panic) only when the subscription cannot even be started;
//!   the multiplexer retries after a fixed delay.
//! - Emit events for one subscription from one task, in stream order.
//! - After `close(handle)` the sink may still be called; late calls are ignored.

mod sink;

pub use sink::TransportSink;

use crate::error::TransportError;

/// Connection status reported by a transport for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    /// The service confirmed the subscription.
    Connected,
    /// The subscription was closed by the service or the socket went away.
    Closed,
    /// The subscription failed.
    Error,
}

impl TransportStatus {
    /// `Closed` and `Error` end the subscription.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportStatus::Closed | TransportStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportStatus::Connected => "connected",
            TransportStatus::Closed => "closed",
            TransportStatus::Error => "error",
        }
    }
}

/// Opaque identifier of one open transport subscription, chosen by the transport.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TransportHandle(u64);

impl TransportHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// The realtime change-stream client the multiplexer sits on top of.
pub trait Transport: Send + Sync + 'static {
    /// Starts a subscription on `resource`; events and status go to `sink`.
    fn open(&self, resource: &str, sink: TransportSink) -> Result<TransportHandle, TransportError>;

    /// Releases a subscription previously returned by [`open`](Self::open).
    fn close(&self, handle: TransportHandle);

    /// Name used in logs. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
