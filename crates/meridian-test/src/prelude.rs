//! Prelude module - commonly used test utilities.
//!
//! Use `use meridian_test::prelude::*;` in test modules.

// Handler doubles
pub use crate::{
    Delivery, DeliveryLog, FailingHandler, PanickingHandler, RecordingHandler, SlowHandler,
};

// Harness
pub use crate::{
    content, running_dispatcher, setup_test_logging, setup_test_logging_default, test_dir,
    test_file_in_dir,
};
