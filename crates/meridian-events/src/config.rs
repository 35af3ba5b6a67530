//! Conversion from the unified config's `[dispatch]` section.

use std::time::Duration;

use meridian_config::{DispatchSection, DuplicateSubscription};

use crate::dispatcher::DispatcherConfig;
use crate::registry::DuplicatePolicy;

impl From<DuplicateSubscription> for DuplicatePolicy {
    fn from(value: DuplicateSubscription) -> Self {
        match value {
            DuplicateSubscription::Idempotent => Self::Idempotent,
            DuplicateSubscription::Reject => Self::Reject,
        }
    }
}

impl From<&DispatchSection> for DispatcherConfig {
    fn from(section: &DispatchSection) -> Self {
        Self {
            handler_timeout: section
                .handler_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            duplicate_policy: section.duplicate_subscription.into(),
        }
    }
}
