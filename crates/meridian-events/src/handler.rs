//! Event handler trait and a closure-backed implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::event::Event;

/// Result returned by a handler.
pub type HandlerResult = Result<(), HandlerError>;

/// A consumer registered to receive events.
///
/// Handlers receive a shared reference to the event and may suspend (e.g.
/// for I/O). Each delivery runs in its own task, so a panic or timeout in
/// one handler never prevents delivery to the next.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event.
    async fn handle(&self, event: &Event) -> HandlerResult;

    /// Name used in logs and failure reports.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Per-delivery timeout, overriding the dispatcher default.
    ///
    /// `None` falls back to the dispatcher's configured timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Identity of a handler allocation.
///
/// Two `Arc`s are the same handler iff they point at the same allocation.
pub(crate) fn handler_identity(handler: &Arc<dyn EventHandler>) -> usize {
    Arc::as_ptr(handler).cast::<()>().addr()
}

/// Handler backed by a synchronous closure.
pub struct FnHandler<F>
where
    F: Fn(&Event) -> HandlerResult + Send + Sync,
{
    name: String,
    timeout: Option<Duration>,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Event) -> HandlerResult + Send + Sync,
{
    /// Create a new closure handler.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            handler,
        }
    }

    /// Set a per-delivery timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<F> std::fmt::Debug for FnHandler<F>
where
    F: Fn(&Event) -> HandlerResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) -> HandlerResult + Send + Sync,
{
    async fn handle(&self, event: &Event) -> HandlerResult {
        (self.handler)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
