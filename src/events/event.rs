//! # Lifecycle events emitted by the multiplexer.
//!
//! [`EventKind`] classifies what happened to a resource or to the multiplexer:
//! - **Registry events**: listeners added/removed
//! - **Connection events**: opening, connected, disconnected, open failures
//! - **Recovery events**: reconnect scheduled, degraded (cool-down)
//! - **Teardown events**: intentional close, shutdown, grace elapsed
//! - **Isolation events**: listener or observer panics, observer overflow
//!
//! These are diagnostics about the multiplexer itself; the row-level payloads
//! travel separately as [`ChangeEvent`](crate::ChangeEvent)s.
//!
//! ## Ordering guarantees
//! Each event has a globally unique `seq` that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use changemux::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReconnectScheduled)
//!     .with_resource("entities")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(2));
//!
//! assert_eq!(ev.resource.as_deref(), Some("entities"));
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry ===
    /// A listener was registered.
    ///
    /// Sets: `resource`, `listeners` (count after the change)
    ListenerAdded,

    /// A listener was removed.
    ///
    /// Sets: `resource`, `listeners` (count after the change)
    ListenerRemoved,

    // === Connection ===
    /// A transport subscription is being opened.
    ///
    /// Sets: `resource`, `attempt` (failures since the last successful connect)
    Opening,

    /// The transport confirmed the subscription.
    ///
    /// Sets: `resource`
    Connected,

    /// The transport reported `closed` or `error` on a live subscription.
    ///
    /// Sets: `resource`, `reason` ("closed" / "error")
    Disconnected,

    /// `Transport::open` returned an error or panicked.
    ///
    /// Sets: `resource`, `reason` (error label and message)
    OpenFailed,

    // === Recovery ===
    /// The next open attempt was scheduled.
    ///
    /// Sets: `resource`, `attempt`, `delay_ms`
    ReconnectScheduled,

    /// The attempt cap was reached; the resource cools down before retrying.
    ///
    /// Sets: `resource`, `attempt`, `delay_ms` (cool-down)
    ResourceDegraded,

    // === Teardown ===
    /// The last listener left; the transport subscription was closed intentionally.
    ///
    /// Sets: `resource`
    ResourceClosed,

    /// `shutdown()` was called; everything is being closed.
    ShutdownRequested,

    /// The shutdown grace period ended; normal operation resumed.
    ///
    /// Sets: `attempt` (resources opened that were parked during grace)
    GraceElapsed,

    // === Isolation ===
    /// A listener panicked while handling a change event.
    ///
    /// Sets: `resource`, `reason` (panic message)
    ListenerPanicked,

    /// An observer panicked while handling a lifecycle event.
    ///
    /// Sets: `resource` (observer name), `reason` (panic message)
    ObserverPanicked,

    /// An observer queue was full or closed; the event was dropped for that observer.
    ///
    /// Sets: `resource` (observer name), `reason`
    ObserverOverflow,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Resource (or observer) name, if applicable.
    pub resource: Option<Arc<str>>,
    /// Failures since the last successful connect (for `GraceElapsed`: resources reopened).
    pub attempt: Option<u32>,
    /// Listeners registered on `resource` after the change.
    pub listeners: Option<u32>,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            resource: None,
            attempt: None,
            listeners: None,
            delay_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_resource(mut self, resource: impl Into<Arc<str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a listener count (saturating).
    #[inline]
    pub fn with_listeners(mut self, n: usize) -> Self {
        self.listeners = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_resource(observer)
            .with_reason(reason)
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_resource(observer)
            .with_reason(info)
    }
}
