use std::sync::Arc;

use tokio::runtime::Handle as RuntimeHandle;

use crate::{
    config::MuxConfig,
    core::{lifecycle::Shared, multiplexer::Multiplexer},
    error::MuxError,
    events::Bus,
    observers::{Observe, ObserverSet},
    transport::Transport,
};

/// Builder for a [`Multiplexer`].
pub struct MultiplexerBuilder {
    transport: Arc<dyn Transport>,
    cfg: MuxConfig,
    observers: Vec<Arc<dyn Observe>>,
}

impl MultiplexerBuilder {
    /// Starts a builder around the given transport with default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cfg: MuxConfig::default(),
            observers: Vec::new(),
        }
    }

    pub fn with_config(mut self, cfg: MuxConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets lifecycle observers (logging, metrics, connection banners).
    ///
    /// Each observer gets its own worker and bounded queue.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Validates the configuration and wires the runtime:
    /// - lifecycle event bus
    /// - observer workers plus the bus → observers forwarder
    /// - registry and lifecycle controller
    ///
    /// Must be called from within a tokio runtime; timers are spawned on it.
    pub fn build(self) -> Result<Multiplexer, MuxError> {
        self.cfg.validate()?;
        let runtime = RuntimeHandle::try_current().map_err(|_| MuxError::NoRuntime)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let shared = Arc::new(Shared::new(self.cfg, self.transport, bus.clone(), runtime.clone()));

        if !self.observers.is_empty() {
            let set = ObserverSet::new(self.observers, bus.clone());
            let mut rx = bus.subscribe();
            let lifetime = shared.lifetime.clone();
            runtime.spawn(async move {
                loop {
                    tokio::select! {
                        _ = lifetime.cancelled() => break,
                        msg = rx.recv() => match msg {
                            Ok(ev) => set.emit(ev),
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(skipped = n, "observer forwarder lagged");
                            }
                        }
                    }
                }
                set.shutdown().await;
            });
        }

        Ok(Multiplexer::from_shared(shared))
    }
}

impl Multiplexer {
    /// Starts building a multiplexer on top of `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> MultiplexerBuilder {
        MultiplexerBuilder::new(transport)
    }
}
