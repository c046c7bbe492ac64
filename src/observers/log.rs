//! # LogWriter: lifecycle events to `tracing`
//!
//! A minimal observer that turns every lifecycle [`Event`] into a `tracing` record.
//! Reconnect churn and degraded resources go out at `warn`, routine transitions
//! at `info`/`debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  changemux: connected resource="entities"
//! WARN  changemux: disconnected resource="entities" reason="error"
//! INFO  changemux: reconnect scheduled resource="entities" attempt=1 delay_ms=1000
//! WARN  changemux: resource degraded, cooling down resource="entities" attempt=5 delay_ms=60000
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Lifecycle event writer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let resource = e.resource.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ListenerAdded | EventKind::ListenerRemoved => {
                tracing::debug!(target: "changemux", resource, listeners = ?e.listeners, kind = ?e.kind, "listener change");
            }
            EventKind::Opening => {
                tracing::debug!(target: "changemux", resource, attempt = ?e.attempt, "opening");
            }
            EventKind::Connected => {
                tracing::info!(target: "changemux", resource, "connected");
            }
            EventKind::Disconnected => {
                tracing::warn!(target: "changemux", resource, reason, "disconnected");
            }
            EventKind::OpenFailed => {
                tracing::warn!(target: "changemux", resource, reason, "open failed");
            }
            EventKind::ReconnectScheduled => {
                tracing::info!(target: "changemux", resource, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "reconnect scheduled");
            }
            EventKind::ResourceDegraded => {
                tracing::warn!(target: "changemux", resource, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "resource degraded, cooling down");
            }
            EventKind::ResourceClosed => {
                tracing::info!(target: "changemux", resource, "closed (no listeners)");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "changemux", "shutdown requested");
            }
            EventKind::GraceElapsed => {
                tracing::info!(target: "changemux", reopened = ?e.attempt, "shutdown grace elapsed");
            }
            EventKind::ListenerPanicked => {
                tracing::error!(target: "changemux", resource, reason, "listener panicked");
            }
            EventKind::ObserverPanicked | EventKind::ObserverOverflow => {
                tracing::warn!(target: "changemux", observer = resource, reason, kind = ?e.kind, "observer trouble");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
