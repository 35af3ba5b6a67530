//! Subtype-aware dispatch.
//!
//! # Delivery order
//!
//! For an event of kind `K`, the match set is `K` followed by every ancestor
//! of `K`, nearest first. Handlers are collected per kind in that order and,
//! within a kind, in registration order. A handler subscribed under several
//! kinds of the match set is delivered to once, at its most specific
//! position. Applications may rely on this: a handler for `SwitchUp` always
//! sees a `SwitchUp` before a handler for `CoreEvent` does.
//!
//! # Snapshots
//!
//! Each dispatch reads the taxonomy and the registry once, before the first
//! delivery. Subscriptions or kinds added or removed while a dispatch is in
//! flight take effect from the next dispatch.
//!
//! # Failure isolation
//!
//! Each delivery runs in its own tokio task. Errors, panics, and timeouts
//! are recorded in the [`DispatchReport`]; delivery always continues with
//! the next handler.
//!
//! # Cancellation
//!
//! Once admitted, a dispatch runs to completion in a task of its own. Dropping
//! the future returned by [`Dispatcher::dispatch`] only stops waiting for the
//! report: every planned handler is still delivered to, and the dispatcher
//! does not reach `Stopped` until that task finishes.

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::{
    DispatchError, DispatchResult, FailureCause, HandlerFailure, SubscribeError, TaxonomyResult,
};
use crate::event::{Event, EventContent};
use crate::handler::{EventHandler, HandlerResult};
use crate::kind::{EventKind, KindDescriptor, kinds};
use crate::lifecycle::{DispatcherState, Lifecycle};
use crate::registry::{DuplicatePolicy, Subscription, SubscriptionHandle, SubscriptionRegistry};
use crate::taxonomy::Taxonomy;

/// Dispatcher settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Default per-delivery timeout; `None` waits indefinitely.
    pub handler_timeout: Option<Duration>,
    /// Policy for a handler subscribing twice to the same kind.
    pub duplicate_policy: DuplicatePolicy,
}

impl DispatcherConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default per-delivery timeout.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Set the duplicate subscription policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Outcome of delivering one event to one handler.
#[derive(Debug)]
pub struct HandlerOutcome {
    /// Subscription that was delivered to.
    pub handle: SubscriptionHandle,
    /// Handler name.
    pub handler: String,
    /// Kind the subscription was registered for.
    pub kind: EventKind,
    /// Wall time spent in the handler.
    pub elapsed: Duration,
    /// `Err` if the handler failed.
    pub result: Result<(), HandlerFailure>,
}

impl HandlerOutcome {
    /// Whether the handler completed without error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-handler outcomes of one dispatch, in delivery order.
#[derive(Debug)]
pub struct DispatchReport {
    /// Id of the dispatched event.
    pub event_id: Uuid,
    /// Kind of the dispatched event.
    pub event_kind: EventKind,
    /// One entry per delivered handler.
    pub outcomes: Vec<HandlerOutcome>,
}

impl DispatchReport {
    /// Number of handlers the event was delivered to.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.outcomes.len()
    }

    /// Failed deliveries.
    pub fn failures(&self) -> impl Iterator<Item = &HandlerFailure> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    /// Number of failed deliveries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Whether every handler succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::is_success)
    }
}

tokio::task_local! {
    /// Id of the dispatcher whose handler the current task is running.
    static DELIVERING_FOR: Uuid;
}

struct Shared {
    id: Uuid,
    taxonomy: RwLock<Taxonomy>,
    registry: SubscriptionRegistry,
    lifecycle: Arc<Lifecycle>,
    config: DispatcherConfig,
}

/// Routes events to every handler subscribed to their kind or an ancestor.
///
/// Cloning is cheap and clones share taxonomy, subscriptions, and lifecycle.
/// Create one per controller at startup and pass it to the components that
/// produce or consume events.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state())
            .field("registry", &self.shared.registry)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Dispatcher {
    /// Create a dispatcher over the built-in taxonomy.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_taxonomy(Taxonomy::new(), config)
    }

    /// Create a dispatcher over an existing taxonomy.
    #[must_use]
    pub fn with_taxonomy(taxonomy: Taxonomy, config: DispatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                taxonomy: RwLock::new(taxonomy),
                registry: SubscriptionRegistry::with_policy(config.duplicate_policy),
                lifecycle: Arc::new(Lifecycle::new()),
                config,
            }),
        }
    }

    /// Start accepting dispatches.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Stopped`] if the dispatcher has already been
    /// shut down; a stopped dispatcher cannot be restarted.
    pub fn start(&self) -> DispatchResult<()> {
        self.shared.lifecycle.start()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        self.shared.lifecycle.state()
    }

    /// Receiver notified on every lifecycle transition.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DispatcherState> {
        self.shared.lifecycle.watch()
    }

    /// Settings this dispatcher was built with.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// The exact-kind subscription registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.shared.registry
    }

    fn taxonomy(&self) -> std::sync::RwLockReadGuard<'_, Taxonomy> {
        self.shared
            .taxonomy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the taxonomy as it is now.
    #[must_use]
    pub fn taxonomy_snapshot(&self) -> Taxonomy {
        self.taxonomy().clone()
    }

    /// Register an application-defined kind under an existing parent.
    ///
    /// # Errors
    ///
    /// See [`Taxonomy::register_kind`].
    pub fn register_kind<P>(
        &self,
        kind: impl Into<EventKind>,
        parent: &P,
    ) -> TaxonomyResult<KindDescriptor>
    where
        P: AsRef<EventKind> + ?Sized,
    {
        self.shared
            .taxonomy
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_kind(kind, parent)
    }

    /// Descriptor of a registered kind.
    #[must_use]
    pub fn descriptor<K>(&self, kind: &K) -> Option<KindDescriptor>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        self.taxonomy().descriptor(kind).cloned()
    }

    /// See [`Taxonomy::ancestors_of`].
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is not registered.
    pub fn ancestors_of<K>(&self, kind: &K) -> TaxonomyResult<Vec<EventKind>>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        self.taxonomy().ancestors_of(kind)
    }

    /// See [`Taxonomy::is_subtype`].
    #[must_use]
    pub fn is_subtype<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: AsRef<EventKind> + ?Sized,
        B: AsRef<EventKind> + ?Sized,
    {
        self.taxonomy().is_subtype(a, b)
    }

    /// Construct an event of any registered kind by name.
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is not registered.
    pub fn event<K>(&self, kind: &K, content: EventContent) -> TaxonomyResult<Event>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        self.taxonomy().event(kind, content)
    }

    /// Subscribe `handler` to `kind` and, through it, to every descendant.
    ///
    /// # Errors
    ///
    /// - [`SubscribeError::UnknownKind`] if `kind` is not registered.
    /// - [`SubscribeError::AlreadySubscribed`] under [`DuplicatePolicy::Reject`].
    pub fn subscribe<K>(
        &self,
        kind: &K,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        let kind = kind.as_ref();
        // Held across the registry write so the kind cannot be missing
        // from the taxonomy a concurrent dispatch reads.
        let taxonomy = self.taxonomy();
        if !taxonomy.contains(kind) {
            return Err(SubscribeError::UnknownKind(kind.clone()));
        }
        self.shared.registry.subscribe(kind.clone(), handler)
    }

    /// Remove a subscription. No-op if already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.shared.registry.unsubscribe(handle)
    }

    /// Subscriptions for exactly `kind`, in registration order.
    #[must_use]
    pub fn handlers_for<K>(&self, kind: &K) -> Vec<Subscription>
    where
        K: AsRef<EventKind> + ?Sized,
    {
        self.shared.registry.handlers_for(kind.as_ref())
    }

    /// Kinds `event` matches, most specific first, and the deduplicated
    /// deliveries for them.
    fn plan(&self, event: &Event) -> DispatchResult<(Vec<EventKind>, Vec<Subscription>)> {
        let kind = event.kind();
        let taxonomy = self.taxonomy();
        let descriptor = taxonomy
            .descriptor(kind)
            .ok_or_else(|| DispatchError::UnknownKind(kind.clone()))?;
        if descriptor.context() != event.context() {
            return Err(DispatchError::ContextMismatch {
                kind: kind.clone(),
                expected: descriptor.context(),
                found: event.context(),
            });
        }
        let ancestors = taxonomy
            .ancestors_of(kind)
            .map_err(|_| DispatchError::UnknownKind(kind.clone()))?;

        let mut match_set = Vec::with_capacity(ancestors.len().saturating_add(1));
        match_set.push(kind.clone());
        match_set.extend(ancestors);

        let mut seen = HashSet::new();
        let deliveries = self
            .shared
            .registry
            .snapshot(&match_set)
            .into_iter()
            .filter(|sub| seen.insert(sub.identity()))
            .collect();
        Ok((match_set, deliveries))
    }

    /// Deliver `event` to every matching handler.
    ///
    /// Must be called from within a tokio runtime. Dispatching a
    /// `ShutdownEvent` (or a subtype) moves the dispatcher to `Draining`;
    /// that event is still delivered, later dispatches are rejected.
    ///
    /// Handlers may dispatch further events from inside [`EventHandler::handle`].
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NotStarted`] before [`start`](Self::start).
    /// - [`DispatchError::Stopped`] once draining has begun.
    /// - [`DispatchError::UnknownKind`] if the event's kind is not registered.
    /// - [`DispatchError::ContextMismatch`] if the event's context differs
    ///   from the one its kind defines.
    /// - [`DispatchError::Cancelled`] if the runtime shut down mid-dispatch.
    ///
    /// Handler failures are not errors; they are reported in the returned
    /// [`DispatchReport`].
    pub async fn dispatch(&self, event: Event) -> DispatchResult<DispatchReport> {
        let in_flight = self.shared.lifecycle.enter().inspect_err(|e| {
            warn!(
                event_kind = %event.kind(),
                event_id = %event.id(),
                error = %e,
                "Dispatch rejected"
            );
        })?;

        let (match_set, deliveries) = self.plan(&event).inspect_err(|e| {
            warn!(
                event_kind = %event.kind(),
                event_id = %event.id(),
                error = %e,
                "Dispatch rejected"
            );
        })?;

        if match_set.contains(kinds::SHUTDOWN_EVENT.kind()) {
            info!(event_id = %event.id(), "Shutdown event dispatched, draining");
            self.shared.lifecycle.begin_drain();
        }

        debug!(
            event_kind = %event.kind(),
            event_id = %event.id(),
            handler_count = deliveries.len(),
            "Dispatching event"
        );

        let dispatcher = self.clone();
        let run = tokio::spawn(async move {
            let _in_flight = in_flight;
            dispatcher.deliver_all(event, deliveries).await
        });

        match run.await {
            Ok(report) => Ok(report),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(DispatchError::Cancelled),
        }
    }

    async fn deliver_all(&self, event: Event, deliveries: Vec<Subscription>) -> DispatchReport {
        let event = Arc::new(event);
        let mut outcomes = Vec::with_capacity(deliveries.len());
        for subscription in &deliveries {
            outcomes.push(self.deliver(subscription, &event).await);
        }

        let report = DispatchReport {
            event_id: event.id(),
            event_kind: event.kind().clone(),
            outcomes,
        };

        if !report.is_clean() {
            warn!(
                event_kind = %report.event_kind,
                event_id = %report.event_id,
                delivered = report.delivered(),
                failed = report.failure_count(),
                "Dispatch completed with handler failures"
            );
        }

        report
    }

    async fn deliver(&self, subscription: &Subscription, event: &Arc<Event>) -> HandlerOutcome {
        let handler = Arc::clone(subscription.handler());
        let name = handler.name().to_string();
        let limit = handler.timeout().or(self.shared.config.handler_timeout);

        trace!(
            event_kind = %event.kind(),
            event_id = %event.id(),
            handler = %name,
            subscribed_kind = %subscription.kind(),
            "Delivering event"
        );

        let started = Instant::now();
        let task_event = Arc::clone(event);
        let mut task = tokio::spawn(DELIVERING_FOR.scope(self.shared.id, async move {
            handler.handle(&task_event).await
        }));

        let result = match limit {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => classify(joined),
                Err(_) => {
                    task.abort();
                    Err(FailureCause::TimedOut(limit))
                },
            },
            None => classify(task.await),
        };
        let elapsed = started.elapsed();

        let result = result.map_err(|cause| {
            let failure = HandlerFailure {
                handle: subscription.handle(),
                handler: name.clone(),
                kind: subscription.kind().clone(),
                cause,
            };
            warn!(
                event_kind = %event.kind(),
                event_id = %event.id(),
                handler = %name,
                failure = failure.as_label(),
                error = %failure.cause,
                "Handler failed"
            );
            failure
        });

        HandlerOutcome {
            handle: subscription.handle(),
            handler: name,
            kind: subscription.kind().clone(),
            elapsed,
            result,
        }
    }

    /// Dispatch a `ShutdownEvent` and wait until every in-flight delivery
    /// has finished.
    ///
    /// Called from inside one of this dispatcher's handlers, it returns once
    /// the shutdown event has been delivered without waiting for `Stopped`:
    /// the caller's own delivery is still in flight. Observe the transition
    /// with [`subscribe_state`](Self::subscribe_state) instead.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NotStarted`] if the dispatcher was never
    /// started. If shutdown is already under way this waits for it to
    /// complete and returns [`DispatchError::Stopped`].
    pub async fn shutdown(&self) -> DispatchResult<DispatchReport> {
        let result = self.dispatch(Event::shutdown()).await;
        if matches!(result, Err(DispatchError::NotStarted)) {
            return result;
        }
        if self.in_delivery() {
            debug!("Shutdown requested by a handler, not waiting for Stopped");
            return result;
        }
        self.wait_stopped().await;
        result
    }

    /// Wait until the dispatcher reaches `Stopped`.
    ///
    /// # Deadlocks
    ///
    /// Never completes when awaited inside one of this dispatcher's
    /// handlers, since that delivery keeps the dispatcher from stopping.
    pub async fn wait_stopped(&self) {
        self.shared.lifecycle.wait_stopped().await;
    }

    /// Whether the current task is running a handler of this dispatcher.
    fn in_delivery(&self) -> bool {
        DELIVERING_FOR
            .try_with(|id| *id == self.shared.id)
            .unwrap_or(false)
    }
}

fn classify(joined: Result<HandlerResult, JoinError>) -> Result<(), FailureCause> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(FailureCause::Error(e)),
        Err(e) if e.is_panic() => Err(FailureCause::Panicked(panic_message(e.into_panic()))),
        Err(_) => Err(FailureCause::Cancelled),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
