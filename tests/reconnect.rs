mod common;

use std::time::Duration;

use changemux::{
    BackoffPolicy, ChangeEvent, ConnectionState, Event, EventKind, JitterPolicy, MuxConfig,
    TransportStatus,
};
use serde_json::json;

use common::{MockTransport, Recorder, config, drain, mux, sleep_ms};

fn short_cap() -> MuxConfig {
    MuxConfig {
        backoff: BackoffPolicy {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
            max_attempts: 3,
            cooldown: Duration::from_secs(60),
        },
        ..config()
    }
}

fn of_kind(events: &[Event], kind: EventKind) -> Vec<(Option<u32>, Option<u32>)> {
    events
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| (e.attempt, e.delay_ms))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_then_cools_down_then_starts_over() {
    let transport = MockTransport::new();
    let mux = mux(&transport, short_cap());
    let mut events = mux.events();
    let _sub = mux.subscribe("entities", |_: &ChangeEvent| {});

    transport.report("entities", TransportStatus::Error);
    assert_eq!(transport.live("entities"), 0);
    assert_eq!(
        mux.status().resource("entities").map(|r| r.state),
        Some(ConnectionState::Reconnecting)
    );

    sleep_ms(999).await;
    assert_eq!(transport.opens("entities"), 1);
    sleep_ms(2).await;
    assert_eq!(transport.opens("entities"), 2);

    transport.report("entities", TransportStatus::Closed);
    sleep_ms(2_001).await;
    assert_eq!(transport.opens("entities"), 3);

    transport.report("entities", TransportStatus::Error);
    let status = mux.status();
    let entities = status.resource("entities").expect("still watched");
    assert_eq!(entities.state, ConnectionState::CoolingDown);
    assert_eq!(entities.attempts, 3);

    let seen = drain(&mut events);
    assert_eq!(
        of_kind(&seen, EventKind::ReconnectScheduled),
        vec![(Some(1), Some(1_000)), (Some(2), Some(2_000))]
    );
    assert_eq!(
        of_kind(&seen, EventKind::ResourceDegraded),
        vec![(Some(3), Some(60_000))]
    );

    sleep_ms(59_000).await;
    assert_eq!(transport.opens("entities"), 3);
    sleep_ms(1_001).await;
    assert_eq!(transport.opens("entities"), 4);
    assert_eq!(mux.status().resource("entities").map(|r| r.attempts), Some(0));

    transport.report("entities", TransportStatus::Error);
    assert_eq!(
        of_kind(&drain(&mut events), EventKind::ReconnectScheduled),
        vec![(Some(1), Some(1_000))]
    );
}

#[tokio::test(start_paused = true)]
async fn connected_resets_the_attempt_counter() {
    let transport = MockTransport::new();
    let mux = mux(&transport, short_cap());
    let mut events = mux.events();
    let _sub = mux.subscribe("entities", |_: &ChangeEvent| {});

    transport.report("entities", TransportStatus::Closed);
    sleep_ms(1_001).await;
    transport.report("entities", TransportStatus::Closed);
    sleep_ms(2_001).await;
    assert_eq!(mux.status().resource("entities").map(|r| r.attempts), Some(2));

    transport.connect("entities");
    assert_eq!(mux.status().resource("entities").map(|r| r.attempts), Some(0));
    drain(&mut events);

    transport.report("entities", TransportStatus::Closed);
    assert_eq!(
        of_kind(&drain(&mut events), EventKind::ReconnectScheduled),
        vec![(Some(1), Some(1_000))]
    );
}

#[tokio::test(start_paused = true)]
async fn open_failure_retries_after_fixed_delay() {
    let transport = MockTransport::new();
    transport.fail_opens("entities", true);
    let mux = mux(&transport, config());
    let mut events = mux.events();
    let _sub = mux.subscribe("entities", |_: &ChangeEvent| {});

    assert_eq!(transport.opens("entities"), 1);
    assert_eq!(transport.live("entities"), 0);
    let seen = drain(&mut events);
    assert_eq!(of_kind(&seen, EventKind::OpenFailed).len(), 1);
    assert_eq!(
        of_kind(&seen, EventKind::ReconnectScheduled),
        vec![(Some(1), Some(5_000))]
    );

    sleep_ms(4_999).await;
    assert_eq!(transport.opens("entities"), 1);

    transport.fail_opens("entities", false);
    sleep_ms(2).await;
    assert_eq!(transport.opens("entities"), 2);
    assert_eq!(transport.live("entities"), 1);

    transport.connect("entities");
    let status = mux.status();
    let entities = status.resource("entities").expect("watched");
    assert_eq!(entities.state, ConnectionState::Connected);
    assert_eq!(entities.attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn mixed_open_errors_and_drops_never_shorten_the_delay() {
    let transport = MockTransport::new();
    transport.fail_opens("entities", true);
    let mux = mux(&transport, config());
    let mut events = mux.events();
    let _sub = mux.subscribe("entities", |_: &ChangeEvent| {});

    sleep_ms(5_001).await;
    assert_eq!(transport.opens("entities"), 2);
    transport.fail_opens("entities", false);

    sleep_ms(5_001).await;
    assert_eq!(transport.live("entities"), 1);
    transport.report("entities", TransportStatus::Closed);

    sleep_ms(5_001).await;
    assert_eq!(transport.live("entities"), 1);
    transport.report("entities", TransportStatus::Closed);

    let delays: Vec<_> = of_kind(&drain(&mut events), EventKind::ReconnectScheduled)
        .into_iter()
        .map(|(_, delay)| delay.expect("delay set"))
        .collect();
    assert_eq!(delays, vec![5_000, 5_000, 5_000, 8_000]);
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    assert!(delays.iter().all(|d| *d <= 30_000));
}

#[tokio::test(start_paused = true)]
async fn panicking_open_is_treated_as_failure() {
    let transport = MockTransport::new();
    transport.panic_opens("entities");
    let mux = mux(&transport, config());
    let mut events = mux.events();

    let _bad = mux.subscribe("entities", |_: &ChangeEvent| {});
    let seen = Recorder::default();
    let _good = mux.subscribe("zones", seen.listener());

    let failed: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| e.kind == EventKind::OpenFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(
        failed[0]
            .reason
            .as_deref()
            .is_some_and(|r| r.starts_with("transport_panicked"))
    );
    assert_eq!(
        mux.status().resource("entities").map(|r| r.state),
        Some(ConnectionState::Reconnecting)
    );

    transport.emit("zones", ChangeEvent::created(json!({ "id": 1 })));
    assert_eq!(seen.len(), 1);

    sleep_ms(5_001).await;
    assert_eq!(transport.opens("entities"), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_resource_does_not_disturb_others() {
    let transport = MockTransport::new();
    transport.fail_opens("entities", true);
    let mux = mux(&transport, config());
    let zones = Recorder::default();

    let _a = mux.subscribe("entities", |_: &ChangeEvent| {});
    let _b = mux.subscribe("zones", zones.listener());
    transport.connect("zones");

    for _ in 0..20 {
        transport.emit("zones", ChangeEvent::updated(json!({}), None));
        sleep_ms(3_000).await;
    }

    assert_eq!(zones.len(), 20);
    assert_eq!(transport.opens("zones"), 1);
    assert!(transport.opens("entities") > 3);
    assert_eq!(
        mux.status().resource("zones").map(|r| r.state),
        Some(ConnectionState::Connected)
    );
}

#[tokio::test(start_paused = true)]
async fn closed_reported_inside_open_discards_the_returned_handle() {
    let transport = MockTransport::new();
    transport.inline_status("entities", TransportStatus::Closed);
    let mux = mux(&transport, config());

    let _sub = mux.subscribe("entities", |_: &ChangeEvent| {});
    assert_eq!(transport.opens("entities"), 1);
    assert_eq!(transport.closes("entities"), 1);
    assert_eq!(transport.live("entities"), 0);
    assert_eq!(
        mux.status().resource("entities").map(|r| r.state),
        Some(ConnectionState::Reconnecting)
    );
}

#[tokio::test(start_paused = true)]
async fn events_from_a_replaced_attempt_are_ignored() {
    let transport = MockTransport::new();
    let mux = mux(&transport, config());
    let seen = Recorder::default();
    let _sub = mux.subscribe("entities", seen.listener());

    transport.report("entities", TransportStatus::Closed);
    sleep_ms(1_001).await;
    assert_eq!(transport.opens("entities"), 2);

    let sinks = transport.sinks("entities");
    let (stale, current) = (&sinks[0], &sinks[1]);
    assert!(!stale.is_current());
    assert!(current.is_current());

    stale.emit(ChangeEvent::created(json!({ "from": "old" })));
    stale.status(TransportStatus::Error);
    assert_eq!(seen.len(), 0);
    assert_eq!(transport.live("entities"), 1);

    current.emit(ChangeEvent::created(json!({ "from": "new" })));
    assert_eq!(seen.events()[0].new, Some(json!({ "from": "new" })));
}

#[tokio::test(start_paused = true)]
async fn unsubscribing_cancels_a_pending_reconnect() {
    let transport = MockTransport::new();
    let mux = mux(&transport, config());
    let sub = mux.subscribe("entities", |_: &ChangeEvent| {});

    transport.report("entities", TransportStatus::Closed);
    sub.unsubscribe();

    sleep_ms(120_000).await;
    assert_eq!(transport.opens("entities"), 1);
    assert!(mux.status().resources.is_empty());
}
