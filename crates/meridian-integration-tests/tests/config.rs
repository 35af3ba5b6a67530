//! Integration tests wiring loaded configuration into the dispatcher and
//! logging setup.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::DispatchHarness;
use meridian_config::{Config, ConfigError, DuplicateSubscription};
use meridian_events::{
    DispatcherConfig, DuplicatePolicy, Event, FailureCause, SubscribeError, kinds,
};
use meridian_telemetry::{LogConfig, LogFormat, LogTarget};
use meridian_test::{RecordingHandler, SlowHandler, test_dir, test_file_in_dir};

#[tokio::test]
async fn dispatch_section_drives_dispatcher() {
    let dir = test_dir();
    let path = test_file_in_dir(
        &dir,
        "meridian.toml",
        r#"
        [dispatch]
        handler_timeout_ms = 40
        duplicate_subscription = "reject"
        "#,
    );
    let config = Config::load_file(&path).unwrap();
    assert_eq!(
        config.dispatch.duplicate_subscription,
        DuplicateSubscription::Reject
    );

    let dispatcher_config = DispatcherConfig::from(&config.dispatch);
    assert_eq!(dispatcher_config.duplicate_policy, DuplicatePolicy::Reject);
    assert_eq!(
        dispatcher_config.handler_timeout,
        Some(Duration::from_millis(40))
    );

    let harness = DispatchHarness::with_config(dispatcher_config);
    let slow = Arc::new(SlowHandler::new("slow", Duration::from_secs(5), &harness.log));
    harness
        .dispatcher
        .subscribe(&kinds::SWITCH_UP, Arc::clone(&slow) as _)
        .unwrap();
    assert!(matches!(
        harness.dispatcher.subscribe(&kinds::SWITCH_UP, slow).unwrap_err(),
        SubscribeError::AlreadySubscribed { .. }
    ));

    let report = harness
        .dispatcher
        .dispatch(Event::empty(&kinds::SWITCH_UP))
        .await
        .unwrap();
    assert!(matches!(
        report.failures().next().unwrap().cause,
        FailureCause::TimedOut(_)
    ));
}

#[test]
fn default_config_yields_default_dispatcher() {
    let config = Config::default();
    assert_eq!(DispatcherConfig::from(&config.dispatch), DispatcherConfig::default());
}

#[test]
fn logging_section_converts_to_log_config() {
    let dir = test_dir();
    let path = test_file_in_dir(
        &dir,
        "meridian.toml",
        r#"
        [logging]
        level = "debug"
        format = "json"
        target = "stdout"
        directives = ["meridian_events=trace"]
        "#,
    );
    let config = Config::load_file(&path).unwrap();
    let log_config = LogConfig::try_from(&config.logging).unwrap();

    assert_eq!(log_config.level, "debug");
    assert_eq!(log_config.format, LogFormat::Json);
    assert_eq!(log_config.target, LogTarget::Stdout);
    assert_eq!(log_config.directives, vec!["meridian_events=trace"]);
}

#[test]
fn invalid_file_is_rejected_before_reaching_dispatcher() {
    let dir = test_dir();
    let path = test_file_in_dir(&dir, "bad.toml", "[dispatch]\nhandler_timeout_ms = 0\n");
    let err = Config::load_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "dispatch.handler_timeout_ms"));
}

#[tokio::test]
async fn idempotent_policy_from_config() {
    let config = Config::default();
    let harness = DispatchHarness::with_config(DispatcherConfig::from(&config.dispatch));
    let handler = RecordingHandler::shared("once", &harness.log);

    let a = harness
        .dispatcher
        .subscribe(&kinds::SERVER_DOWN, Arc::clone(&handler))
        .unwrap();
    let b = harness
        .dispatcher
        .subscribe(&kinds::SERVER_DOWN, handler)
        .unwrap();
    assert_eq!(a, b);
}
