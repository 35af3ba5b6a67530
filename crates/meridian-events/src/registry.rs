//! Exact-kind subscription index.
//!
//! The registry knows nothing about the taxonomy: [`handlers_for`] returns
//! only the subscriptions registered for exactly the given kind. Ancestor
//! expansion happens in the [`Dispatcher`](crate::Dispatcher).
//!
//! [`handlers_for`]: SubscriptionRegistry::handlers_for

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::SubscribeError;
use crate::handler::{EventHandler, handler_identity};
use crate::kind::EventKind;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What to do when a handler subscribes twice to the same kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Return the existing handle.
    #[default]
    Idempotent,
    /// Fail with [`SubscribeError::AlreadySubscribed`].
    Reject,
}

/// One handler registered for one kind.
#[derive(Clone)]
pub struct Subscription {
    handle: SubscriptionHandle,
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
}

impl Subscription {
    /// Handle of this subscription.
    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    /// Kind the handler subscribed to.
    #[must_use]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    pub(crate) fn identity(&self) -> usize {
        handler_identity(&self.handler)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("handler", &self.handler.name())
            .finish()
    }
}

#[derive(Default)]
struct Index {
    by_kind: HashMap<EventKind, Vec<Subscription>>,
    kind_of: HashMap<SubscriptionHandle, EventKind>,
}

/// Registry mapping each kind to its subscriptions in registration order.
#[derive(Default)]
pub struct SubscriptionRegistry {
    index: RwLock<Index>,
    policy: DuplicatePolicy,
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscription_count", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Create an empty registry with the default duplicate policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    /// Create an empty registry with an explicit duplicate policy.
    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            index: RwLock::new(Index::default()),
            policy,
        }
    }

    /// The duplicate policy this registry applies.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register `handler` for exactly `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::AlreadySubscribed`] if the handler is already
    /// subscribed to `kind` and the policy is [`DuplicatePolicy::Reject`].
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let identity = handler_identity(&handler);
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);

        let existing = index
            .by_kind
            .get(&kind)
            .and_then(|subs| subs.iter().find(|s| s.identity() == identity))
            .map(Subscription::handle);

        if let Some(existing) = existing {
            return match self.policy {
                DuplicatePolicy::Idempotent => {
                    trace!(
                        kind = %kind,
                        handler = %handler.name(),
                        "Handler already subscribed, reusing handle"
                    );
                    Ok(existing)
                },
                DuplicatePolicy::Reject => Err(SubscribeError::AlreadySubscribed {
                    kind,
                    handler: handler.name().to_string(),
                    existing,
                }),
            };
        }

        let handle = SubscriptionHandle::new();
        debug!(
            kind = %kind,
            handler = %handler.name(),
            handle = %handle,
            "Handler subscribed"
        );
        index.kind_of.insert(handle, kind.clone());
        index
            .by_kind
            .entry(kind.clone())
            .or_default()
            .push(Subscription {
                handle,
                kind,
                handler,
            });
        Ok(handle)
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if it was registered. Removing an already removed
    /// handle is a no-op.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        // Dropped after the lock is released: a handler's Drop may re-enter.
        let removed = {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            let Some(kind) = index.kind_of.remove(&handle) else {
                return false;
            };
            let mut removed = None;
            let now_empty = match index.by_kind.get_mut(&kind) {
                Some(subs) => {
                    if let Some(pos) = subs.iter().position(|s| s.handle == handle) {
                        removed = Some(subs.remove(pos));
                    }
                    subs.is_empty()
                },
                None => false,
            };
            if now_empty {
                index.by_kind.remove(&kind);
            }
            removed
        };

        match removed {
            Some(sub) => {
                debug!(
                    kind = %sub.kind,
                    handler = %sub.handler.name(),
                    handle = %handle,
                    "Handler unsubscribed"
                );
                true
            },
            None => false,
        }
    }

    /// Subscriptions for exactly `kind`, in registration order.
    #[must_use]
    pub fn handlers_for(&self, kind: &EventKind) -> Vec<Subscription> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_kind
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscriptions for each kind in `kinds`, concatenated in order, under
    /// a single read of the registry.
    pub(crate) fn snapshot(&self, kinds: &[EventKind]) -> Vec<Subscription> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        kinds
            .iter()
            .filter_map(|kind| index.by_kind.get(kind))
            .flatten()
            .cloned()
            .collect()
    }

    /// Total number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .kind_of
            .len()
    }

    /// Whether there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every subscription, as on a full controller restart.
    pub fn clear(&self) {
        let cleared = {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *index)
        };
        debug!(count = cleared.kind_of.len(), "All subscriptions cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FnHandler;
    use crate::kind::kinds;

    fn handler(name: &str) -> Arc<dyn EventHandler> {
        Arc::new(FnHandler::new(name, |_| Ok(())))
    }

    fn names(subs: &[Subscription]) -> Vec<String> {
        subs.iter().map(|s| s.handler().name().to_string()).collect()
    }

    #[test]
    fn test_subscribe_and_handlers_for() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.is_empty());

        let kind = kinds::SWITCH_UP.kind().clone();
        registry.subscribe(kind.clone(), handler("first")).unwrap();
        registry.subscribe(kind.clone(), handler("second")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(names(&registry.handlers_for(&kind)), vec!["first", "second"]);
    }

    #[test]
    fn test_handlers_for_is_exact_match() {
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(kinds::CORE_EVENT.kind().clone(), handler("generic"))
            .unwrap();

        assert!(registry.handlers_for(kinds::SWITCH_UP.kind()).is_empty());
        assert_eq!(registry.handlers_for(kinds::CORE_EVENT.kind()).len(), 1);
    }

    #[test]
    fn test_duplicate_subscription_idempotent() {
        let registry = SubscriptionRegistry::new();
        let h = handler("dup");
        let kind = kinds::APP_LOADED.kind().clone();

        let first = registry.subscribe(kind.clone(), Arc::clone(&h)).unwrap();
        let second = registry.subscribe(kind.clone(), Arc::clone(&h)).unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.handlers_for(&kind).len(), 1);
    }

    #[test]
    fn test_duplicate_subscription_rejected() {
        let registry = SubscriptionRegistry::with_policy(DuplicatePolicy::Reject);
        let h = handler("dup");
        let kind = kinds::APP_LOADED.kind().clone();

        let first = registry.subscribe(kind.clone(), Arc::clone(&h)).unwrap();
        let err = registry.subscribe(kind.clone(), Arc::clone(&h)).unwrap_err();

        assert!(matches!(
            err,
            SubscribeError::AlreadySubscribed { existing, .. } if existing == first
        ));
    }

    #[test]
    fn test_same_handler_different_kinds() {
        let registry = SubscriptionRegistry::with_policy(DuplicatePolicy::Reject);
        let h = handler("shared");

        let a = registry
            .subscribe(kinds::MESSAGE_IN.kind().clone(), Arc::clone(&h))
            .unwrap();
        let b = registry
            .subscribe(kinds::MESSAGE_IN_HELLO.kind().clone(), Arc::clone(&h))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let registry = SubscriptionRegistry::new();
        let kind = kinds::SERVER_DOWN.kind().clone();
        let handle = registry.subscribe(kind.clone(), handler("gone")).unwrap();

        assert!(registry.unsubscribe(handle));
        assert!(registry.handlers_for(&kind).is_empty());
        assert!(registry.is_empty());

        // Second removal is a no-op.
        assert!(!registry.unsubscribe(handle));
    }

    #[test]
    fn test_unsubscribe_preserves_order_of_rest() {
        let registry = SubscriptionRegistry::new();
        let kind = kinds::SWITCH_DOWN.kind().clone();
        registry.subscribe(kind.clone(), handler("a")).unwrap();
        let b = registry.subscribe(kind.clone(), handler("b")).unwrap();
        registry.subscribe(kind.clone(), handler("c")).unwrap();

        registry.unsubscribe(b);
        assert_eq!(names(&registry.handlers_for(&kind)), vec!["a", "c"]);
    }

    #[test]
    fn test_snapshot_concatenates_in_kind_order() {
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(kinds::CORE_EVENT.kind().clone(), handler("core"))
            .unwrap();
        registry
            .subscribe(kinds::SWITCH_UP.kind().clone(), handler("switch"))
            .unwrap();

        let snapshot = registry.snapshot(&[
            kinds::SWITCH_UP.kind().clone(),
            kinds::CORE_EVENT.kind().clone(),
        ]);
        assert_eq!(names(&snapshot), vec!["switch", "core"]);
    }

    #[test]
    fn test_clear() {
        let registry = SubscriptionRegistry::new();
        let handle = registry
            .subscribe(kinds::APP_INSTALLED.kind().clone(), handler("x"))
            .unwrap();
        registry.clear();

        assert!(registry.is_empty());
        assert!(!registry.unsubscribe(handle));
    }

    #[test]
    fn test_unsubscribe_drops_handler_outside_lock() {
        struct ReentrantDrop {
            registry: Arc<SubscriptionRegistry>,
        }

        #[async_trait::async_trait]
        impl EventHandler for ReentrantDrop {
            async fn handle(&self, _event: &crate::Event) -> crate::HandlerResult {
                Ok(())
            }
        }

        impl Drop for ReentrantDrop {
            fn drop(&mut self) {
                // Would deadlock if the write lock were still held.
                let _ = self.registry.len();
            }
        }

        let registry = Arc::new(SubscriptionRegistry::new());
        let handle = registry
            .subscribe(
                kinds::SWITCH_UP.kind().clone(),
                Arc::new(ReentrantDrop {
                    registry: Arc::clone(&registry),
                }),
            )
            .unwrap();

        assert!(registry.unsubscribe(handle));
    }
}
