//! Handler doubles for dispatch tests.
//!
//! All doubles that observe deliveries write to a shared [`DeliveryLog`],
//! so a test can assert the global order across several handlers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_events::{Event, EventHandler, EventKind, HandlerError, HandlerResult};
use uuid::Uuid;

/// One observed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Handler that received the event.
    pub handler: String,
    /// Kind of the delivered event.
    pub kind: EventKind,
    /// Id of the delivered event.
    pub event_id: Uuid,
    /// Event construction time.
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of deliveries, shared between handlers.
#[derive(Debug, Clone, Default)]
pub struct DeliveryLog {
    entries: Arc<Mutex<Vec<Delivery>>>,
}

impl DeliveryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivery of `event` to `handler`.
    pub fn record(&self, handler: &str, event: &Event) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivery {
                handler: handler.to_string(),
                kind: event.kind().clone(),
                event_id: event.id(),
                timestamp: event.timestamp(),
            });
    }

    /// All deliveries so far, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<Delivery> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Handler names in delivery order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        self.entries().into_iter().map(|d| d.handler).collect()
    }

    /// Number of deliveries to `handler`.
    #[must_use]
    pub fn count_for(&self, handler: &str) -> usize {
        self.entries()
            .iter()
            .filter(|d| d.handler == handler)
            .count()
    }

    /// Total number of deliveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all deliveries.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Handler that records every delivery and succeeds.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    log: DeliveryLog,
}

impl RecordingHandler {
    /// Create a recording handler writing to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &DeliveryLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
        }
    }

    /// Create it already wrapped for `subscribe`.
    #[must_use]
    pub fn shared(name: impl Into<String>, log: &DeliveryLog) -> Arc<dyn EventHandler> {
        Arc::new(Self::new(name, log))
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) -> HandlerResult {
        self.log.record(&self.name, event);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that always returns an error.
#[derive(Debug)]
pub struct FailingHandler {
    name: String,
    message: String,
    calls: AtomicUsize,
}

impl FailingHandler {
    /// Create a handler failing with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Times the handler was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for FailingHandler {
    async fn handle(&self, _event: &Event) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::failed(self.message.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that panics with a fixed message.
#[derive(Debug)]
pub struct PanickingHandler {
    name: String,
    message: String,
}

impl PanickingHandler {
    /// Create a handler panicking with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl EventHandler for PanickingHandler {
    #[allow(clippy::panic)]
    async fn handle(&self, _event: &Event) -> HandlerResult {
        panic!("{}", self.message);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that sleeps before recording the delivery.
#[derive(Debug)]
pub struct SlowHandler {
    name: String,
    delay: Duration,
    timeout: Option<Duration>,
    log: DeliveryLog,
}

impl SlowHandler {
    /// Create a handler that takes `delay` per delivery.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration, log: &DeliveryLog) -> Self {
        Self {
            name: name.into(),
            delay,
            timeout: None,
            log: log.clone(),
        }
    }

    /// Give the handler its own timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl EventHandler for SlowHandler {
    async fn handle(&self, event: &Event) -> HandlerResult {
        tokio::time::sleep(self.delay).await;
        self.log.record(&self.name, event);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
