//! Prelude module - commonly used types for convenient import.
//!
//! Use `use meridian_events::prelude::*;` to import all essential types.

// Dispatch
pub use crate::{DispatchReport, Dispatcher, DispatcherConfig, DispatcherState, HandlerOutcome};

// Taxonomy
pub use crate::{EventContext, EventKind, KindDescriptor, Taxonomy, kinds};

// Events and handlers
pub use crate::{ConnectionId, Event, EventContent, EventHandler, FnHandler, HandlerResult};

// Subscriptions
pub use crate::{DuplicatePolicy, SubscriptionHandle};

// Errors
pub use crate::{
    DispatchError, DispatchResult, FailureCause, HandlerError, HandlerFailure, SubscribeError,
    TaxonomyError,
};
