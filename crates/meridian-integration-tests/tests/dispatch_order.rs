//! Integration tests for delivery order and deduplication.

mod common;

use std::sync::Arc;

use common::DispatchHarness;
use meridian_events::{DispatcherConfig, DuplicatePolicy, Event, EventKind, SubscribeError, kinds};

#[tokio::test]
async fn core_handler_sees_every_core_kind_after_exact_handlers() {
    let harness = DispatchHarness::new();
    let core_kinds: Vec<EventKind> = harness
        .dispatcher
        .taxonomy_snapshot()
        .kinds()
        .filter(|d| harness.dispatcher.is_subtype(*d, &kinds::CORE_EVENT))
        .filter(|d| d.kind() != kinds::CORE_EVENT.kind())
        .map(|d| d.kind().clone())
        .collect();
    assert!(core_kinds.len() >= 10);

    for kind in &core_kinds {
        harness.record(&format!("exact:{kind}"), kind);
    }
    harness.record("core", &kinds::CORE_EVENT);

    for kind in &core_kinds {
        harness.log.clear();
        let event = harness
            .dispatcher
            .event(kind, meridian_events::EventContent::new())
            .unwrap();
        harness.dispatcher.dispatch(event).await.unwrap();

        let names = harness.log.handler_names();
        assert_eq!(names.first(), Some(&format!("exact:{kind}")));
        assert_eq!(names.last().map(String::as_str), Some("core"));
        assert_eq!(harness.log.count_for("core"), 1);
    }
}

#[tokio::test]
async fn message_in_hello_reaches_specific_then_general_once_each() {
    let harness = DispatchHarness::new();
    harness.record("h1", &kinds::MESSAGE_IN);
    harness.record("h2", &kinds::MESSAGE_IN_HELLO);

    let report = harness
        .dispatcher
        .dispatch(Event::empty(&kinds::MESSAGE_IN_HELLO))
        .await
        .unwrap();

    assert_eq!(harness.log.handler_names(), vec!["h2", "h1"]);
    assert_eq!(report.delivered(), 2);
    assert_eq!(&report.outcomes[0].kind, kinds::MESSAGE_IN_HELLO.kind());
    assert_eq!(&report.outcomes[1].kind, kinds::MESSAGE_IN.kind());
}

#[tokio::test]
async fn registration_order_within_a_kind() {
    let harness = DispatchHarness::new();
    for name in ["first", "second", "third"] {
        harness.record(name, &kinds::SWITCH_DOWN);
    }

    harness
        .dispatcher
        .dispatch(Event::empty(&kinds::SWITCH_DOWN))
        .await
        .unwrap();
    assert_eq!(harness.log.handler_names(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn handler_on_kind_and_ancestor_is_invoked_once() {
    let harness = DispatchHarness::new();
    let shared = harness.record("shared", &kinds::CORE_EVENT);
    harness
        .dispatcher
        .subscribe(&kinds::SWITCH_UP, Arc::clone(&shared))
        .unwrap();
    harness
        .dispatcher
        .subscribe(&kinds::ANY_EVENT, shared)
        .unwrap();

    let report = harness
        .dispatcher
        .dispatch(Event::empty(&kinds::SWITCH_UP))
        .await
        .unwrap();

    assert_eq!(harness.log.count_for("shared"), 1);
    assert_eq!(report.delivered(), 1);
    assert_eq!(&report.outcomes[0].kind, kinds::SWITCH_UP.kind());
}

#[tokio::test]
async fn duplicate_subscription_is_idempotent_by_default() {
    let harness = DispatchHarness::new();
    let handler = harness.record("dup", &kinds::APP_INSTALLED);
    let again = harness
        .dispatcher
        .subscribe(&kinds::APP_INSTALLED, Arc::clone(&handler))
        .unwrap();

    assert_eq!(harness.dispatcher.handlers_for(&kinds::APP_INSTALLED).len(), 1);
    assert_eq!(
        harness.dispatcher.handlers_for(&kinds::APP_INSTALLED)[0].handle(),
        again
    );

    harness
        .dispatcher
        .dispatch(Event::empty(&kinds::APP_INSTALLED))
        .await
        .unwrap();
    assert_eq!(harness.log.count_for("dup"), 1);
}

#[tokio::test]
async fn duplicate_subscription_rejected_when_configured() {
    let harness = DispatchHarness::with_config(
        DispatcherConfig::new().with_duplicate_policy(DuplicatePolicy::Reject),
    );
    let handler = harness.record("dup", &kinds::APP_INSTALLED);

    let err = harness
        .dispatcher
        .subscribe(&kinds::APP_INSTALLED, handler)
        .unwrap_err();
    assert!(matches!(err, SubscribeError::AlreadySubscribed { .. }));
}

#[tokio::test]
async fn unsubscribed_handler_is_never_invoked() {
    let harness = DispatchHarness::new();
    harness.record("stays", &kinds::SERVER_DOWN);
    let leaving = meridian_test::RecordingHandler::shared("leaves", &harness.log);
    let handle = harness
        .dispatcher
        .subscribe(&kinds::CORE_EVENT, leaving)
        .unwrap();

    assert!(harness.dispatcher.unsubscribe(handle));
    assert!(!harness.dispatcher.unsubscribe(handle));

    for _ in 0..3 {
        harness
            .dispatcher
            .dispatch(Event::empty(&kinds::SERVER_DOWN))
            .await
            .unwrap();
    }
    assert_eq!(harness.log.count_for("leaves"), 0);
    assert_eq!(harness.log.count_for("stays"), 3);
}

#[tokio::test]
async fn subscribing_to_unknown_kind_fails() {
    let harness = DispatchHarness::new();
    let handler = meridian_test::RecordingHandler::shared("typo", &harness.log);
    let err = harness
        .dispatcher
        .subscribe(&EventKind::new("SwitchUpp"), handler)
        .unwrap_err();
    assert_eq!(err, SubscribeError::UnknownKind(EventKind::new("SwitchUpp")));
}
