//! Meridian Test - Shared test utilities for the Meridian controller.
//!
//! Handler doubles that record, fail, panic, or stall, plus small harness
//! helpers. Intended as a dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use meridian_events::{DispatcherConfig, Event, kinds};
//! use meridian_test::{DeliveryLog, RecordingHandler, running_dispatcher};
//!
//! #[tokio::test]
//! async fn test_core_handler_sees_switch_up() {
//!     let dispatcher = running_dispatcher(DispatcherConfig::default());
//!     let log = DeliveryLog::new();
//!     dispatcher
//!         .subscribe(&kinds::CORE_EVENT, RecordingHandler::shared("core", &log))
//!         .unwrap();
//!
//!     dispatcher.dispatch(Event::empty(&kinds::SWITCH_UP)).await.unwrap();
//!     assert_eq!(log.handler_names(), vec!["core"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod handlers;
pub mod harness;

pub use handlers::*;
pub use harness::*;
