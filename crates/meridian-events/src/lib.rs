//! Meridian Events - Event taxonomy and hierarchical dispatch for the
//! Meridian SDN controller.
//!
//! This crate provides:
//! - A closed built-in tree of event kinds, extensible by applications
//! - Immutable event values carrying a kind, context, and payload
//! - A registry of handlers keyed by exact kind
//! - A dispatcher that delivers each event to handlers of its kind and of
//!   every ancestor kind, most specific first
//!
//! # Architecture
//!
//! Kinds are data, not types. A [`Taxonomy`] records each kind's single
//! parent; the subtype relation is a walk up that tree. Handlers subscribe
//! to one kind through the [`Dispatcher`] and receive events of that kind
//! and all of its descendants.
//!
//! Dispatch is sequential per event and isolated per handler: a handler
//! that errors, panics, or exceeds its timeout is recorded in the
//! [`DispatchReport`] and the next handler still runs.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use meridian_events::{Dispatcher, DispatcherConfig, Event, FnHandler, kinds};
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::new(DispatcherConfig::default());
//! dispatcher.start().unwrap();
//!
//! // Every core event, including SwitchUp.
//! dispatcher
//!     .subscribe(
//!         &kinds::CORE_EVENT,
//!         Arc::new(FnHandler::new("core-audit", |event| {
//!             println!("core event: {}", event.kind());
//!             Ok(())
//!         })),
//!     )
//!     .unwrap();
//!
//! let report = dispatcher.dispatch(Event::empty(&kinds::SWITCH_UP)).await.unwrap();
//! assert_eq!(report.delivered(), 1);
//!
//! dispatcher.shutdown().await.unwrap();
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

#[cfg(feature = "config")]
mod config;
mod dispatcher;
mod error;
mod event;
mod handler;
mod kind;
mod lifecycle;
mod registry;
mod taxonomy;

pub use dispatcher::{DispatchReport, Dispatcher, DispatcherConfig, HandlerOutcome};
pub use error::{
    DispatchError, DispatchResult, FailureCause, HandlerError, HandlerFailure, SubscribeError,
    TaxonomyError, TaxonomyResult,
};
pub use event::{ConnectionId, Event, EventContent};
pub use handler::{EventHandler, FnHandler, HandlerResult};
pub use kind::{EventContext, EventKind, KindDescriptor, kinds};
pub use lifecycle::DispatcherState;
pub use registry::{DuplicatePolicy, Subscription, SubscriptionHandle, SubscriptionRegistry};
pub use taxonomy::Taxonomy;
