//! # Subscription registry.
//!
//! Bookkeeping of which listeners want which resource, and of the single
//! transport subscription that owns each resource.
//!
//! ```text
//! Registry
//!   entries: resource ─► Entry
//!                         ├─ listeners  [(ListenerId, Listener)]  (registration order)
//!                         ├─ state      Deferred | Connecting | Connected | Reconnecting | CoolingDown
//!                         ├─ handle     Option<TransportHandle>
//!                         ├─ generation current open attempt
//!                         ├─ throttle   last forwarded instant
//!                         ├─ backoff    attempt counter
//!                         └─ retry      pending timer token
//! ```
//!
//! ## Rules
//! - An entry exists iff its listener set is non-empty.
//! - At most one transport handle per entry.
//! - Every signal from the transport carries the generation it was opened with;
//!   a mismatch means the signal belongs to a replaced or torn-down attempt.
//! - The registry never calls out (transport, listeners); the controller does that
//!   after releasing the lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::change::ChangeEvent;
use crate::core::reconnect::BackoffState;
use crate::core::throttle::Throttle;
use crate::transport::TransportHandle;

pub(crate) type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Identity of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Connection state of a watched resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered during the shutdown grace period; opens once it elapses.
    Deferred,
    /// Open requested, awaiting confirmation.
    Connecting,
    /// Transport confirmed the subscription.
    Connected,
    /// Dropped; waiting on the backoff timer.
    Reconnecting,
    /// Attempt cap reached; waiting out the cool-down.
    CoolingDown,
}

/// One resource in a [`MuxStatus`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    pub name: String,
    pub listener_count: usize,
    pub state: ConnectionState,
    /// Failures since the last successful connection.
    pub attempts: u32,
}

/// Read-only snapshot returned by [`Multiplexer::status`](crate::Multiplexer::status).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuxStatus {
    /// Watched resources, sorted by name.
    pub resources: Vec<ResourceStatus>,
    /// Whether the shutdown grace period is in progress.
    pub shutting_down: bool,
}

impl MuxStatus {
    pub fn resource(&self, name: &str) -> Option<&ResourceStatus> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.resource(name).map_or(0, |r| r.listener_count)
    }
}

pub(crate) struct Entry {
    pub resource: Arc<str>,
    pub listeners: Vec<(ListenerId, Listener)>,
    pub state: ConnectionState,
    pub handle: Option<TransportHandle>,
    pub generation: u64,
    pub throttle: Throttle,
    pub backoff: BackoffState,
    pub retry: Option<CancellationToken>,
}

impl Entry {
    fn new(resource: Arc<str>, generation: u64, state: ConnectionState) -> Self {
        Self {
            resource,
            listeners: Vec::new(),
            state,
            handle: None,
            generation,
            throttle: Throttle::default(),
            backoff: BackoffState::default(),
            retry: None,
        }
    }

    /// Cancels a pending retry timer, if any.
    pub fn cancel_retry(&mut self) {
        if let Some(token) = self.retry.take() {
            token.cancel();
        }
    }

    fn status(&self) -> ResourceStatus {
        ResourceStatus {
            name: self.resource.to_string(),
            listener_count: self.listeners.len(),
            state: self.state,
            attempts: self.backoff.attempts(),
        }
    }
}

/// What `add_listener` did to the resource.
pub(crate) enum Added {
    /// Resource already had listeners.
    Joined,
    /// First listener; the caller must open generation `generation`.
    Open { generation: u64 },
    /// First listener during the grace period; opening is postponed.
    Deferred,
}

pub(crate) struct Registry {
    pub entries: HashMap<Arc<str>, Entry>,
    /// Parent of every retry timer token; replaced on each shutdown.
    pub root: CancellationToken,
    /// Set between `shutdown()` and the end of its grace period.
    pub shutting_down: bool,
    /// Bumped by every `shutdown()` so a stale grace timer cannot end a newer one.
    pub shutdown_epoch: u64,
    next_listener: u64,
    next_generation: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            root: CancellationToken::new(),
            shutting_down: false,
            shutdown_epoch: 0,
            next_listener: 0,
            next_generation: 0,
        }
    }

    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub fn add_listener(&mut self, resource: &str, listener: Listener) -> (ListenerId, Added) {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);

        if let Some(entry) = self.entries.get_mut(resource) {
            entry.listeners.push((id, listener));
            return (id, Added::Joined);
        }

        let generation = self.next_generation();
        let (state, added) = if self.shutting_down {
            (ConnectionState::Deferred, Added::Deferred)
        } else {
            (ConnectionState::Connecting, Added::Open { generation })
        };
        let key: Arc<str> = Arc::from(resource);
        let mut entry = Entry::new(Arc::clone(&key), generation, state);
        entry.listeners.push((id, listener));
        self.entries.insert(key, entry);
        (id, added)
    }

    /// Removes one listener.
    ///
    /// Returns `None` if the listener was unknown, `Some(None)` if other
    /// listeners remain, and `Some(Some(entry))` if it was the last one
    /// (the entry is detached and handed back for teardown).
    pub fn remove_listener(&mut self, resource: &str, id: ListenerId) -> Option<Option<Entry>> {
        let entry = self.entries.get_mut(resource)?;
        let before = entry.listeners.len();
        entry.listeners.retain(|(lid, _)| *lid != id);
        if entry.listeners.len() == before {
            return None;
        }
        if !entry.listeners.is_empty() {
            return Some(None);
        }
        Some(self.entries.remove(resource))
    }

    /// Returns the entry only if `generation` is still its current attempt.
    pub fn current_mut(&mut self, resource: &str, generation: u64) -> Option<&mut Entry> {
        self.entries
            .get_mut(resource)
            .filter(|e| e.generation == generation)
    }

    pub fn has_listener(&self, resource: &str, id: ListenerId) -> bool {
        self.entries
            .get(resource)
            .is_some_and(|e| e.listeners.iter().any(|(lid, _)| *lid == id))
    }

    pub fn listener_count(&self, resource: &str) -> usize {
        self.entries.get(resource).map_or(0, |e| e.listeners.len())
    }

    pub fn snapshot(&self) -> MuxStatus {
        let mut resources: Vec<ResourceStatus> = self.entries.values().map(Entry::status).collect();
        resources.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        MuxStatus {
            resources,
            shutting_down: self.shutting_down,
        }
    }
}
