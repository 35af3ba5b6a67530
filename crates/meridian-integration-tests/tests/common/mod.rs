//! Shared setup for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use meridian_events::{Dispatcher, DispatcherConfig, EventHandler, EventKind};
use meridian_test::{DeliveryLog, RecordingHandler, running_dispatcher, setup_test_logging};

/// A running dispatcher and a log that recording handlers share.
pub struct DispatchHarness {
    /// The dispatcher under test.
    pub dispatcher: Dispatcher,
    /// Deliveries seen by handlers created through [`Self::record`].
    pub log: DeliveryLog,
}

impl DispatchHarness {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        setup_test_logging("meridian_events=debug");
        Self {
            dispatcher: running_dispatcher(config),
            log: DeliveryLog::new(),
        }
    }

    /// Subscribe a new recording handler named `name` to `kind`.
    pub fn record<K>(&self, name: &str, kind: &K) -> Arc<dyn EventHandler>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        let handler = RecordingHandler::shared(name, &self.log);
        self.dispatcher
            .subscribe(kind, Arc::clone(&handler))
            .expect("subscribe");
        handler
    }
}
