//! # Multiplexer: the public face of the subscription registry.
//!
//! A [`Multiplexer`] is built once per application (see
//! [`MultiplexerBuilder`](crate::MultiplexerBuilder)) and cloned into whatever
//! needs realtime updates. Clones share one registry, one transport and one
//! lifecycle event bus.
//!
//! ```text
//! UI component A ──subscribe("entities", fa)──┐
//! UI component B ──subscribe("entities", fb)──┼──► one transport subscription "entities"
//! UI component C ──subscribe("zones", fc)─────┴──► one transport subscription "zones"
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, mpsc};

use crate::change::ChangeEvent;
use crate::config::MuxConfig;
use crate::core::lifecycle::Shared;
use crate::core::registry::{ListenerId, MuxStatus};
use crate::core::shutdown;
use crate::events::Event;

/// Shared, de-duplicated realtime subscriptions.
///
/// All methods are synchronous and never wait on the transport: opening,
/// reconnecting and closing happen in the background. Transport trouble is
/// never returned to callers; at worst, listeners stop hearing about changes
/// until the connection recovers.
#[derive(Clone)]
pub struct Multiplexer {
    shared: Arc<Shared>,
}

impl Multiplexer {
    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Registers `listener` for change events on `resource`.
    ///
    /// The first listener of a resource opens its transport subscription; later
    /// ones join it. The returned [`Subscription`] removes exactly this listener.
    pub fn subscribe<F>(&self, resource: &str, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.shared.subscribe(resource, Arc::new(listener));
        Subscription {
            shared: Arc::downgrade(&self.shared),
            resource: Arc::from(resource),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Like [`subscribe`](Self::subscribe), but delivers into a bounded channel.
    ///
    /// When the receiver falls behind by `capacity` events, newer events are
    /// dropped for this consumer only.
    pub fn subscribe_channel(
        &self,
        resource: &str,
        capacity: usize,
    ) -> (Subscription, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let owner = resource.to_string();
        let sub = self.subscribe(resource, move |ev: &ChangeEvent| {
            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(ev.clone()) {
                tracing::debug!(resource = %owner, "channel listener full, event dropped");
            }
        });
        (sub, rx)
    }

    /// Removes a listener by id. Unknown ids are ignored.
    pub fn unsubscribe(&self, resource: &str, id: ListenerId) {
        self.shared.unsubscribe(resource, id);
    }

    /// Snapshot of watched resources and their listener counts.
    pub fn status(&self) -> MuxStatus {
        self.shared.status()
    }

    /// Closes every transport subscription intentionally, cancels every pending
    /// reconnect and releases every listener.
    ///
    /// For [`MuxConfig::shutdown_grace`] afterwards, new subscriptions are
    /// accepted but their transports are opened only when the grace period ends.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then calls [`shutdown`](Self::shutdown).
    pub async fn shutdown_on_signal(&self) -> io::Result<()> {
        shutdown::wait_for_shutdown_signal().await?;
        tracing::info!("termination signal received");
        self.shutdown();
        Ok(())
    }

    /// Receiver of lifecycle [`Event`]s published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    pub fn config(&self) -> &MuxConfig {
        &self.shared.cfg
    }
}

/// Capability to remove one listener, returned by [`Multiplexer::subscribe`].
///
/// Dropping a `Subscription` does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe). Calling it more than once, after
/// `shutdown()`, or after the multiplexer is gone is a no-op.
#[must_use = "keep the Subscription to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    shared: Weak<Shared>,
    resource: Arc<str>,
    id: ListenerId,
    active: AtomicBool,
}

impl Subscription {
    /// Removes this listener.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.unsubscribe(&self.resource, self.id);
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// `false` once [`unsubscribe`](Self::unsubscribe) was called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
