mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use changemux::{
    BackoffPolicy, ChangeEvent, Event, EventKind, LogWriter, Multiplexer, MuxConfig, MuxError,
    Observe, Transport, TransportStatus,
};
use parking_lot::Mutex;

use common::{MockTransport, config, sleep_ms};

#[derive(Default)]
struct Journal {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Observe for Journal {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}

struct Grumpy;

#[async_trait]
impl Observe for Grumpy {
    async fn on_event(&self, _event: &Event) {
        panic!("observer bug");
    }

    fn name(&self) -> &'static str {
        "grumpy"
    }
}

fn build(transport: &Arc<MockTransport>, cfg: MuxConfig, observers: Vec<Arc<dyn Observe>>) -> Result<Multiplexer, MuxError> {
    let transport: Arc<dyn Transport> = transport.clone();
    Multiplexer::builder(transport)
        .with_config(cfg)
        .with_observers(observers)
        .build()
}

#[tokio::test(start_paused = true)]
async fn observers_see_the_connection_lifecycle_in_order() {
    let transport = MockTransport::new();
    let journal = Arc::new(Journal::default());
    let mux = build(
        &transport,
        config(),
        vec![journal.clone(), Arc::new(Grumpy), Arc::new(LogWriter::new())],
    )
    .expect("valid config");

    let sub = mux.subscribe("entities", |_: &ChangeEvent| {});
    transport.connect("entities");
    transport.report("entities", TransportStatus::Error);
    sleep_ms(1_001).await;
    sub.unsubscribe();
    sleep_ms(10).await;

    let kinds = journal.kinds.lock().clone();
    let lifecycle: Vec<_> = kinds
        .iter()
        .copied()
        .filter(|k| *k != EventKind::ObserverPanicked)
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            EventKind::ListenerAdded,
            EventKind::Opening,
            EventKind::Connected,
            EventKind::Disconnected,
            EventKind::ReconnectScheduled,
            EventKind::Opening,
            EventKind::ListenerRemoved,
            EventKind::ResourceClosed,
        ]
    );

    // The panicking observer is reported once per event it choked on, and never for its own reports.
    let panics = kinds.len() - lifecycle.len();
    assert_eq!(panics, lifecycle.len());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_last_handle_stops_observers() {
    let transport = MockTransport::new();
    let journal = Arc::new(Journal::default());
    let mux = build(&transport, config(), vec![journal.clone()]).expect("valid config");

    let _sub = mux.subscribe("entities", |_: &ChangeEvent| {});
    sleep_ms(10).await;
    let before = journal.kinds.lock().len();
    assert!(before > 0);

    drop(mux);
    sleep_ms(10).await;
    assert_eq!(Arc::strong_count(&journal), 1);
}

#[test]
fn build_outside_a_runtime_fails() {
    let transport = MockTransport::new();
    let err = build(&transport, MuxConfig::default(), Vec::new()).err();
    assert_eq!(err, Some(MuxError::NoRuntime));
}

#[test]
fn invalid_backoff_is_rejected_before_anything_starts() {
    let transport = MockTransport::new();

    let cfg = MuxConfig {
        backoff: BackoffPolicy {
            factor: 0.5,
            ..BackoffPolicy::default()
        },
        ..MuxConfig::default()
    };
    assert!(matches!(
        build(&transport, cfg, Vec::new()),
        Err(MuxError::InvalidConfig { field: "backoff.factor", .. })
    ));

    let cfg = MuxConfig {
        backoff: BackoffPolicy {
            cooldown: Duration::from_secs(1),
            ..BackoffPolicy::default()
        },
        ..MuxConfig::default()
    };
    assert!(matches!(
        build(&transport, cfg, Vec::new()),
        Err(MuxError::CooldownTooShort { .. })
    ));
}
