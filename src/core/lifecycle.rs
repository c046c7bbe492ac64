//! # Connection lifecycle controller.
//!
//! Owns the single transport subscription per resource and turns transport
//! signals, API calls and timer firings into registry transitions.
//!
//! ## State machine (per resource)
//! ```text
//!            subscribe (first)                 sink.status(Connected)
//!   NONE ─────────────────────► CONNECTING ─────────────────────────► CONNECTED
//!    ▲                            ▲    │ open() Err/panic                 │
//!    │ last unsubscribe           │    ▼                                  │ Closed/Error
//!    │ (intentional, any state)   │  RECONNECTING / COOLING_DOWN ◄────────┘
//!    │                            │    │
//!    └────────────────────────────┴────┘ retry timer fires (new generation)
//! ```
//!
//! ## Rules
//! - One mutex ([`Registry`]) serializes API calls, transport signals, change
//!   events and timer firings.
//! - The transport and listeners are only ever called with the lock released,
//!   so a listener may unsubscribe and a transport may report status from inside `open`.
//! - Every failure allocates a new generation; anything still arriving for the old
//!   one (late events, a handle returned after an inline `Closed`) is discarded.
//! - Retry timers are children of `Registry::root` and of nothing else:
//!   intentional teardown cancels one, shutdown cancels all.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::change::ChangeEvent;
use crate::config::MuxConfig;
use crate::core::reconnect::RetryPhase;
use crate::core::registry::{Added, ConnectionState, Listener, ListenerId, MuxStatus, Registry};
use crate::error::{TransportError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::transport::{Transport, TransportHandle, TransportSink, TransportStatus};

/// State shared by every [`Multiplexer`](crate::Multiplexer) clone, sink and timer.
pub(crate) struct Shared {
    pub cfg: MuxConfig,
    pub bus: Bus,
    transport: Arc<dyn Transport>,
    registry: Mutex<Registry>,
    runtime: RuntimeHandle,
    /// Cancelled when the last handle goes away; stops the observer forwarder.
    pub lifetime: CancellationToken,
}

impl Shared {
    pub fn new(
        cfg: MuxConfig,
        transport: Arc<dyn Transport>,
        bus: Bus,
        runtime: RuntimeHandle,
    ) -> Self {
        Self {
            cfg,
            bus,
            transport,
            registry: Mutex::new(Registry::new()),
            runtime,
            lifetime: CancellationToken::new(),
        }
    }

    // ---------------------------
    // Registry operations
    // ---------------------------

    pub fn subscribe(self: &Arc<Self>, resource: &str, listener: Listener) -> ListenerId {
        let (id, added, count) = {
            let mut reg = self.registry.lock();
            let (id, added) = reg.add_listener(resource, listener);
            (id, added, reg.listener_count(resource))
        };

        self.bus.publish(
            Event::new(EventKind::ListenerAdded)
                .with_resource(resource)
                .with_listeners(count),
        );

        match added {
            Added::Open { generation } => self.open(resource, generation),
            Added::Deferred => {
                tracing::debug!(resource, "subscription parked until shutdown grace ends");
            }
            Added::Joined => {}
        }
        id
    }

    /// Removes one listener; closes the resource intentionally if it was the last.
    pub fn unsubscribe(&self, resource: &str, id: ListenerId) {
        let removed = {
            let mut reg = self.registry.lock();
            match reg.remove_listener(resource, id) {
                None => return,
                Some(entry) => (entry, reg.listener_count(resource)),
            }
        };

        self.bus.publish(
            Event::new(EventKind::ListenerRemoved)
                .with_resource(resource)
                .with_listeners(removed.1),
        );

        if let (Some(mut entry), _) = removed {
            entry.cancel_retry();
            if let Some(handle) = entry.handle.take() {
                self.close_quietly(resource, handle);
            }
            tracing::debug!(resource, "last listener left, subscription closed");
            self.bus
                .publish(Event::new(EventKind::ResourceClosed).with_resource(resource));
        }
    }

    pub fn status(&self) -> MuxStatus {
        self.registry.lock().snapshot()
    }

    pub fn is_current(&self, resource: &str, generation: u64) -> bool {
        self.registry
            .lock()
            .current_mut(resource, generation)
            .is_some()
    }

    // ---------------------------
    // Transport side
    // ---------------------------

    /// Opens generation `generation` of `resource`. Must be called without the lock.
    fn open(self: &Arc<Self>, resource: &str, generation: u64) {
        let attempts = {
            let mut reg = self.registry.lock();
            match reg.current_mut(resource, generation) {
                Some(entry) => entry.backoff.attempts(),
                None => return,
            }
        };
        self.bus.publish(
            Event::new(EventKind::Opening)
                .with_resource(resource)
                .with_attempt(attempts),
        );

        let sink = TransportSink::new(Arc::downgrade(self), Arc::from(resource), generation);
        let transport = Arc::clone(&self.transport);
        let opened = std::panic::catch_unwind(AssertUnwindSafe(|| transport.open(resource, sink)))
            .unwrap_or_else(|payload| {
                Err(TransportError::Panicked {
                    info: panic_message(&*payload),
                })
            });

        match opened {
            Ok(handle) => {
                let orphan = {
                    let mut reg = self.registry.lock();
                    match reg.current_mut(resource, generation) {
                        Some(entry) => {
                            entry.handle = Some(handle);
                            None
                        }
                        None => Some(handle),
                    }
                };
                // Torn down or failed while `open` was still running.
                if let Some(handle) = orphan {
                    self.close_quietly(resource, handle);
                }
            }
            Err(err) => {
                tracing::warn!(
                    resource,
                    transport = self.transport.name(),
                    error = %err,
                    "transport open failed"
                );
                self.bus.publish(
                    Event::new(EventKind::OpenFailed)
                        .with_resource(resource)
                        .with_reason(format!("{}: {err}", err.as_label())),
                );
                self.schedule_retry(resource, generation, Some(self.cfg.open_retry_delay));
            }
        }
    }

    pub fn on_status(self: &Arc<Self>, resource: &str, generation: u64, status: TransportStatus) {
        if !status.is_terminal() {
            let changed = {
                let mut reg = self.registry.lock();
                match reg.current_mut(resource, generation) {
                    Some(entry) if entry.state != ConnectionState::Connected => {
                        entry.state = ConnectionState::Connected;
                        entry.backoff.reset();
                        true
                    }
                    _ => false,
                }
            };
            if changed {
                tracing::info!(resource, "realtime subscription connected");
                self.bus
                    .publish(Event::new(EventKind::Connected).with_resource(resource));
            }
            return;
        }

        if !self.is_current(resource, generation) {
            tracing::trace!(resource, generation, status = status.as_str(), "stale status ignored");
            return;
        }
        tracing::warn!(resource, status = status.as_str(), "realtime subscription dropped");
        self.bus.publish(
            Event::new(EventKind::Disconnected)
                .with_resource(resource)
                .with_reason(status.as_str()),
        );
        self.schedule_retry(resource, generation, None);
    }

    /// Throttles and fans out one raw change event.
    ///
    /// Listeners removed by an earlier listener of the same delivery are skipped.
    pub fn on_raw_event(&self, resource: &str, generation: u64, event: ChangeEvent) {
        let listeners: Vec<(ListenerId, Listener)> = {
            let mut reg = self.registry.lock();
            let Some(entry) = reg.current_mut(resource, generation) else {
                return;
            };
            if !entry
                .throttle
                .admit(Instant::now(), self.cfg.throttle_interval())
            {
                tracing::trace!(resource, "change event throttled");
                return;
            }
            entry
                .listeners
                .iter()
                .map(|(id, l)| (*id, Arc::clone(l)))
                .collect()
        };

        for (i, (id, listener)) in listeners.into_iter().enumerate() {
            if i > 0 && !self.registry.lock().has_listener(resource, id) {
                continue;
            }
            if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                let info = panic_message(&*payload);
                tracing::error!(resource, %info, "listener panicked");
                self.bus.publish(
                    Event::new(EventKind::ListenerPanicked)
                        .with_resource(resource)
                        .with_reason(info),
                );
            }
        }
    }

    // ---------------------------
    // Backoff engine
    // ---------------------------

    /// Records a failure of `generation` and arms the retry timer.
    ///
    /// No-op if the resource was torn down, the generation is stale, or a
    /// shutdown is in progress.
    fn schedule_retry(self: &Arc<Self>, resource: &str, generation: u64, fixed: Option<Duration>) {
        let (retry, next_generation, token, dead) = {
            let mut reg = self.registry.lock();
            if reg.shutting_down {
                return;
            }
            let next_generation = reg.next_generation();
            let token = reg.root.child_token();
            let Some(entry) = reg.current_mut(resource, generation) else {
                return;
            };

            let retry = entry.backoff.on_failure(&self.cfg.backoff, fixed);
            entry.generation = next_generation;
            entry.state = match retry.phase {
                RetryPhase::Backoff => ConnectionState::Reconnecting,
                RetryPhase::Cooldown => ConnectionState::CoolingDown,
            };
            entry.cancel_retry();
            entry.retry = Some(token.clone());
            (retry, next_generation, token, entry.handle.take())
        };

        if let Some(handle) = dead {
            self.close_quietly(resource, handle);
        }

        match retry.phase {
            RetryPhase::Backoff => {
                tracing::info!(resource, attempt = retry.attempt, delay = ?retry.delay, "reconnect scheduled");
                self.bus.publish(
                    Event::new(EventKind::ReconnectScheduled)
                        .with_resource(resource)
                        .with_attempt(retry.attempt)
                        .with_delay(retry.delay),
                );
            }
            RetryPhase::Cooldown => {
                tracing::warn!(resource, attempt = retry.attempt, cooldown = ?retry.delay, "reconnect attempts exhausted, cooling down");
                self.bus.publish(
                    Event::new(EventKind::ResourceDegraded)
                        .with_resource(resource)
                        .with_attempt(retry.attempt)
                        .with_delay(retry.delay),
                );
            }
        }

        let weak = Arc::downgrade(self);
        let resource: Arc<str> = Arc::from(resource);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(retry.delay) => {
                    if let Some(shared) = weak.upgrade() {
                        shared.retry_due(&resource, next_generation);
                    }
                }
            }
        });
    }

    fn retry_due(self: &Arc<Self>, resource: &str, generation: u64) {
        {
            let mut reg = self.registry.lock();
            let Some(entry) = reg.current_mut(resource, generation) else {
                return;
            };
            if !matches!(
                entry.state,
                ConnectionState::Reconnecting | ConnectionState::CoolingDown
            ) {
                return;
            }
            entry.retry = None;
            entry.backoff.resume();
            entry.state = ConnectionState::Connecting;
        }
        self.open(resource, generation);
    }

    // ---------------------------
    // Shutdown
    // ---------------------------

    /// Closes everything intentionally and starts the grace period.
    pub fn shutdown(self: &Arc<Self>) {
        let (entries, old_root, epoch) = {
            let mut reg = self.registry.lock();
            reg.shutting_down = true;
            reg.shutdown_epoch += 1;
            let old_root = std::mem::replace(&mut reg.root, CancellationToken::new());
            let entries: Vec<_> = reg.entries.drain().map(|(_, e)| e).collect();
            (entries, old_root, reg.shutdown_epoch)
        };
        old_root.cancel();

        tracing::info!(resources = entries.len(), grace = ?self.cfg.shutdown_grace, "shutting down realtime subscriptions");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        for mut entry in entries {
            if let Some(handle) = entry.handle.take() {
                self.close_quietly(&entry.resource, handle);
            }
            self.bus
                .publish(Event::new(EventKind::ResourceClosed).with_resource(Arc::clone(&entry.resource)));
        }

        let weak = Arc::downgrade(self);
        let grace = self.cfg.shutdown_grace;
        self.runtime.spawn(async move {
            time::sleep(grace).await;
            if let Some(shared) = weak.upgrade() {
                shared.end_grace(epoch);
            }
        });
    }

    /// Leaves the grace period and opens resources that were parked during it.
    fn end_grace(self: &Arc<Self>, epoch: u64) {
        let parked: Vec<(Arc<str>, u64)> = {
            let mut reg = self.registry.lock();
            if reg.shutdown_epoch != epoch || !reg.shutting_down {
                return;
            }
            reg.shutting_down = false;
            reg.entries
                .values_mut()
                .filter(|e| e.state == ConnectionState::Deferred)
                .map(|e| {
                    e.state = ConnectionState::Connecting;
                    (Arc::clone(&e.resource), e.generation)
                })
                .collect()
        };

        tracing::debug!(reopened = parked.len(), "shutdown grace elapsed");
        self.bus.publish(
            Event::new(EventKind::GraceElapsed).with_attempt(saturating_u32(parked.len())),
        );
        for (resource, generation) in parked {
            self.open(&resource, generation);
        }
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn close_quietly(&self, resource: &str, handle: TransportHandle) {
        let transport = Arc::clone(&self.transport);
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| transport.close(handle))) {
            tracing::warn!(resource, info = %panic_message(&*payload), "transport panicked while closing");
        }
    }
}

impl Drop for Shared {
    /// Releases every transport subscription still open when the last handle goes away.
    fn drop(&mut self) {
        self.lifetime.cancel();
        let reg = self.registry.get_mut();
        reg.root.cancel();
        let entries: Vec<_> = reg.entries.drain().map(|(_, e)| e).collect();

        for mut entry in entries {
            entry.cancel_retry();
            if let Some(handle) = entry.handle.take() {
                self.close_quietly(&entry.resource, handle);
            }
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
