//! Error types for taxonomy, registry, dispatch, and handler failures.

use std::time::Duration;

use thiserror::Error;

use crate::kind::{EventContext, EventKind};
use crate::registry::SubscriptionHandle;

/// Errors raised when mutating or querying the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    /// A kind with this name is already registered.
    #[error("event kind '{0}' is already registered")]
    DuplicateKind(EventKind),

    /// The named parent kind is not registered.
    #[error("parent kind '{parent}' of '{kind}' is not registered")]
    UnknownParent {
        /// Kind being registered.
        kind: EventKind,
        /// Missing parent.
        parent: EventKind,
    },

    /// The kind is not registered.
    #[error("event kind '{0}' is not registered")]
    UnknownKind(EventKind),

    /// Root-level kinds are owned by the controller core.
    #[error("cannot register '{0}' directly under the universal root")]
    ReservedRoot(EventKind),
}

/// Result type for taxonomy operations.
pub type TaxonomyResult<T> = Result<T, TaxonomyError>;

/// Errors raised by [`subscribe`](crate::Dispatcher::subscribe).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// The handler already holds a subscription for this kind.
    #[error("handler '{handler}' is already subscribed to '{kind}'")]
    AlreadySubscribed {
        /// Kind subscribed to.
        kind: EventKind,
        /// Handler name.
        handler: String,
        /// The existing subscription.
        existing: SubscriptionHandle,
    },

    /// The kind is not registered in the taxonomy.
    #[error("cannot subscribe to unregistered event kind '{0}'")]
    UnknownKind(EventKind),
}

/// Errors that reject a [`dispatch`](crate::Dispatcher::dispatch) call outright.
///
/// A dispatch that ran but had failing handlers is not an error; see
/// [`DispatchReport`](crate::DispatchReport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The dispatcher has not been started.
    #[error("dispatcher has not been started")]
    NotStarted,

    /// The dispatcher is draining or stopped after shutdown.
    #[error("dispatcher is stopped")]
    Stopped,

    /// The event's kind is not registered in the taxonomy.
    #[error("cannot dispatch event of unregistered kind '{0}'")]
    UnknownKind(EventKind),

    /// The event carries a context other than the one its kind defines,
    /// e.g. after deserializing an event built against another taxonomy.
    #[error("event of kind '{kind}' carries context {found:?}, kind defines {expected:?}")]
    ContextMismatch {
        /// Kind of the rejected event.
        kind: EventKind,
        /// Context recorded on the kind's descriptor.
        expected: Option<EventContext>,
        /// Context carried by the event.
        found: Option<EventContext>,
    },

    /// The task running the deliveries was cancelled, which only happens
    /// when the runtime shuts down mid-dispatch.
    #[error("dispatch was cancelled before all handlers ran")]
    Cancelled,
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Error returned by a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler-reported failure.
    #[error("{0}")]
    Failed(String),

    /// Any other error source.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Why a single delivery failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// The handler returned an error.
    #[error("handler returned an error: {0}")]
    Error(#[source] HandlerError),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The handler exceeded its timeout and was cancelled.
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),

    /// The handler task was cancelled before completing.
    #[error("handler task was cancelled")]
    Cancelled,
}

/// A single handler's failure during one dispatch.
#[derive(Debug, Error)]
#[error("handler '{handler}' failed on '{kind}': {cause}")]
pub struct HandlerFailure {
    /// Subscription that failed.
    pub handle: SubscriptionHandle,
    /// Handler name.
    pub handler: String,
    /// Kind the failing subscription was registered for.
    pub kind: EventKind,
    /// What went wrong.
    #[source]
    pub cause: FailureCause,
}

impl HandlerFailure {
    /// Short stable label for logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self.cause {
            FailureCause::Error(_) => "handler_error",
            FailureCause::Panicked(_) => "handler_panicked",
            FailureCause::TimedOut(_) => "handler_timed_out",
            FailureCause::Cancelled => "handler_cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_error_messages() {
        let err = TaxonomyError::UnknownParent {
            kind: EventKind::new("CustomApp"),
            parent: EventKind::new("Missing"),
        };
        assert_eq!(
            err.to_string(),
            "parent kind 'Missing' of 'CustomApp' is not registered"
        );
    }

    #[test]
    fn test_failure_label() {
        let failure = HandlerFailure {
            handle: SubscriptionHandle::new(),
            handler: "slow".to_string(),
            kind: EventKind::new("SwitchUp"),
            cause: FailureCause::TimedOut(Duration::from_millis(5)),
        };
        assert_eq!(failure.as_label(), "handler_timed_out");
        assert!(failure.to_string().contains("slow"));
    }

    #[test]
    fn test_context_mismatch_message() {
        let err = DispatchError::ContextMismatch {
            kind: EventKind::new("SwitchUp"),
            expected: Some(EventContext::Core),
            found: Some(EventContext::Apps),
        };
        assert_eq!(
            err.to_string(),
            "event of kind 'SwitchUp' carries context Some(Apps), kind defines Some(Core)"
        );
    }
}
