#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use changemux::{
    ChangeEvent, Event, Multiplexer, MuxConfig, Transport, TransportError, TransportHandle,
    TransportSink, TransportStatus,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// In-memory transport: records every open/close and lets tests drive the sinks.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    live: HashMap<u64, (String, TransportSink)>,
    history: Vec<(String, TransportSink)>,
    opens: Vec<String>,
    closes: Vec<String>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    inline_status: HashMap<String, TransportStatus>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `open` return `Err` for `resource` until called again with `false`.
    pub fn fail_opens(&self, resource: &str, fail: bool) {
        let mut st = self.state.lock();
        if fail {
            st.failing.insert(resource.to_string());
        } else {
            st.failing.remove(resource);
        }
    }

    pub fn panic_opens(&self, resource: &str) {
        self.state.lock().panicking.insert(resource.to_string());
    }

    /// Reports `status` synchronously from inside `open` for `resource`.
    pub fn inline_status(&self, resource: &str, status: TransportStatus) {
        self.state
            .lock()
            .inline_status
            .insert(resource.to_string(), status);
    }

    /// Sink of the most recent live subscription for `resource`.
    pub fn sink(&self, resource: &str) -> Option<TransportSink> {
        let st = self.state.lock();
        st.live
            .iter()
            .filter(|(_, (r, _))| r == resource)
            .max_by_key(|(id, _)| **id)
            .map(|(_, (_, sink))| sink.clone())
    }

    /// Every sink ever handed out for `resource`, oldest first.
    pub fn sinks(&self, resource: &str) -> Vec<TransportSink> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|(r, _)| r == resource)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn connect(&self, resource: &str) {
        self.report(resource, TransportStatus::Connected);
    }

    pub fn report(&self, resource: &str, status: TransportStatus) {
        let sink = self.sink(resource).expect("no live subscription");
        sink.status(status);
    }

    pub fn emit(&self, resource: &str, event: ChangeEvent) {
        let sink = self.sink(resource).expect("no live subscription");
        sink.emit(event);
    }

    pub fn live(&self, resource: &str) -> usize {
        self.state
            .lock()
            .live
            .values()
            .filter(|(r, _)| r == resource)
            .count()
    }

    pub fn opens(&self, resource: &str) -> usize {
        self.state.lock().opens.iter().filter(|r| *r == resource).count()
    }

    pub fn closes(&self, resource: &str) -> usize {
        self.state.lock().closes.iter().filter(|r| *r == resource).count()
    }
}

impl Transport for MockTransport {
    fn open(&self, resource: &str, sink: TransportSink) -> Result<TransportHandle, TransportError> {
        let mut st = self.state.lock();
        st.opens.push(resource.to_string());
        st.history.push((resource.to_string(), sink.clone()));

        if st.panicking.contains(resource) {
            drop(st);
            panic!("mock transport exploded");
        }
        if st.failing.contains(resource) {
            return Err(TransportError::Unavailable {
                reason: "mock outage".to_string(),
            });
        }

        st.next_id += 1;
        let id = st.next_id;
        st.live.insert(id, (resource.to_string(), sink.clone()));
        let inline = st.inline_status.get(resource).copied();
        drop(st);

        if let Some(status) = inline {
            sink.status(status);
        }
        Ok(TransportHandle::new(id))
    }

    fn close(&self, handle: TransportHandle) {
        let mut st = self.state.lock();
        if let Some((resource, _)) = st.live.remove(&handle.id()) {
            st.closes.push(resource);
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Listener that records every event it receives.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl Recorder {
    pub fn listener(&self) -> impl Fn(&ChangeEvent) + Send + Sync + use<> {
        let seen = Arc::clone(&self.seen);
        move |ev: &ChangeEvent| seen.lock().push(ev.clone())
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.seen.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

pub fn config() -> MuxConfig {
    MuxConfig {
        throttle: Duration::from_millis(100),
        open_retry_delay: Duration::from_secs(5),
        shutdown_grace: Duration::from_millis(500),
        ..MuxConfig::default()
    }
}

pub fn mux(transport: &Arc<MockTransport>, cfg: MuxConfig) -> Multiplexer {
    let transport: Arc<dyn Transport> = transport.clone();
    Multiplexer::builder(transport)
        .with_config(cfg)
        .build()
        .expect("valid config")
}

/// Drains every lifecycle event currently buffered.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
