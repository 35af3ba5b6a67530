//! Integration tests for start, shutdown drain, and event timestamps.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::DispatchHarness;
use futures::future::join_all;
use meridian_events::{
    Dispatcher, DispatchError, DispatcherConfig, DispatcherState, Event, kinds,
};
use meridian_test::SlowHandler;

#[tokio::test]
async fn dispatch_before_start_is_rejected() {
    let dispatcher = Dispatcher::new(DispatcherConfig::default());
    assert_eq!(dispatcher.state(), DispatcherState::Uninitialized);

    let err = dispatcher
        .dispatch(Event::empty(&kinds::SWITCH_UP))
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::NotStarted);
    assert_eq!(dispatcher.shutdown().await.unwrap_err(), DispatchError::NotStarted);
}

#[tokio::test]
async fn shutdown_delivers_then_rejects_further_dispatch() {
    let harness = DispatchHarness::new();
    harness.record("teardown", &kinds::SHUTDOWN_EVENT);
    harness.record("everything", &kinds::ANY_EVENT);

    let report = harness.dispatcher.shutdown().await.unwrap();
    assert_eq!(report.delivered(), 2);
    assert_eq!(harness.log.handler_names(), vec!["teardown", "everything"]);
    assert_eq!(harness.dispatcher.state(), DispatcherState::Stopped);

    let err = harness
        .dispatcher
        .dispatch(Event::empty(&kinds::SWITCH_UP))
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::Stopped);
    assert_eq!(harness.dispatcher.start().unwrap_err(), DispatchError::Stopped);
    assert_eq!(harness.log.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_waits_for_in_flight_dispatch() {
    let harness = DispatchHarness::new();
    harness
        .dispatcher
        .subscribe(
            &kinds::SWITCH_UP,
            Arc::new(SlowHandler::new("slow", Duration::from_millis(300), &harness.log)),
        )
        .unwrap();
    let mut states = harness.dispatcher.subscribe_state();

    let in_flight = {
        let dispatcher = harness.dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(Event::empty(&kinds::SWITCH_UP)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    harness.dispatcher.dispatch(Event::shutdown()).await.unwrap();
    assert_eq!(harness.dispatcher.state(), DispatcherState::Draining);
    assert_eq!(
        harness
            .dispatcher
            .dispatch(Event::empty(&kinds::SWITCH_DOWN))
            .await
            .unwrap_err(),
        DispatchError::Stopped
    );

    harness.dispatcher.wait_stopped().await;
    let report = in_flight.await.unwrap().unwrap();
    assert!(report.is_clean());
    assert_eq!(harness.log.handler_names(), vec!["slow"]);

    states
        .wait_for(|s| *s == DispatcherState::Stopped)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_dispatch_finishes_before_stopped() {
    let harness = DispatchHarness::new();
    harness
        .dispatcher
        .subscribe(
            &kinds::SWITCH_UP,
            Arc::new(SlowHandler::new("slow", Duration::from_millis(300), &harness.log)),
        )
        .unwrap();
    harness.record("after", &kinds::SWITCH_UP);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        harness.dispatcher.dispatch(Event::empty(&kinds::SWITCH_UP)),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(harness.log.is_empty());

    harness.dispatcher.shutdown().await.unwrap();
    assert_eq!(harness.dispatcher.state(), DispatcherState::Stopped);
    assert_eq!(harness.log.handler_names(), vec!["slow", "after"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatches_each_deliver() {
    let harness = DispatchHarness::new();
    harness.record("core", &kinds::CORE_EVENT);

    let dispatches = (0..32).map(|_| {
        let dispatcher = harness.dispatcher.clone();
        async move { dispatcher.dispatch(Event::empty(&kinds::SWITCH_UP)).await }
    });
    let reports = join_all(dispatches).await;

    assert!(reports.iter().all(|r| matches!(r, Ok(report) if report.delivered() == 1)));
    assert_eq!(harness.log.count_for("core"), 32);
}

#[tokio::test]
async fn sequential_events_have_non_decreasing_timestamps() {
    let harness = DispatchHarness::new();
    harness.record("all", &kinds::ANY_EVENT);

    for _ in 0..50 {
        harness
            .dispatcher
            .dispatch(Event::empty(&kinds::MESSAGE_IN_ECHO_REQUEST))
            .await
            .unwrap();
    }

    let entries = harness.log.entries();
    assert_eq!(entries.len(), 50);
    for pair in entries.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
        assert_ne!(pair[0].event_id, pair[1].event_id);
    }

    let first = Event::empty(&kinds::SWITCH_UP);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = Event::empty(&kinds::SWITCH_UP);
    assert!(second.timestamp() > first.timestamp());
}
