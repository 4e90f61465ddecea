//! The bus facade tying registry, scheduling, and delivery together.

use crate::context;
use crate::defer::DeferQueue;
use crate::error::{BusError, Result};
use crate::publication::{Notification, Publication, PublicationHandle, PublishOptions};
use crate::subscriptions::{
    IntoSubscriberResult, Propagation, SubscribeOptions, SubscriberFn, Subscription,
    SubscriptionRegistry,
};
use crate::topic::Topic;
use crate::types::{PublicationId, SubscriptionId};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Work scheduled for the next cooperative turn.
enum Deferred {
    Dispatch(Publication),
    Call(Box<dyn FnOnce() + Send>),
}

/// A hierarchical, priority-ordered publish/subscribe message bus.
///
/// Provides a unified interface for:
/// - Registering callbacks against topics, with priority and context
/// - Publishing synchronously (in the calling frame) or deferred
/// - Bubbling notifications up the published topic's ancestor chain
/// - Cooperative propagation control from inside subscriber callbacks
///
/// Construct one `Bus` per logical scope; tests get isolation by building
/// a fresh instance instead of sharing a global.
pub struct Bus {
    /// Topic buckets.
    registry: SubscriptionRegistry,

    /// Queue of deferred publishes and calls, drained by [`tick`](Self::tick).
    deferred: DeferQueue<Deferred>,

    /// Dispatch lock. Non-zero while a publication is being delivered;
    /// a depth rather than a flag so nested synchronous publishes from
    /// inside a callback re-enter cleanly.
    dispatch_depth: AtomicU32,

    /// Counter for publication ids.
    next_publication: AtomicU64,
}

impl Bus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            deferred: DeferQueue::new(),
            dispatch_depth: AtomicU32::new(0),
            next_publication: AtomicU64::new(1),
        }
    }

    // --- Subscriptions ---

    /// Register a callback against a topic with default options.
    ///
    /// The callback runs for publishes to the topic itself and to any
    /// descendant topic. Its return value steers propagation; see
    /// [`IntoSubscriberResult`].
    pub fn subscribe<F, R>(&self, topic: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&Notification) -> R + Send + Sync + 'static,
        R: IntoSubscriberResult,
    {
        self.subscribe_with(topic, callback, SubscribeOptions::new())
    }

    /// Register a callback with explicit priority/context options.
    pub fn subscribe_with<F, R>(
        &self,
        topic: &str,
        callback: F,
        options: SubscribeOptions,
    ) -> Result<Subscription>
    where
        F: Fn(&Notification) -> R + Send + Sync + 'static,
        R: IntoSubscriberResult,
    {
        let topic = Topic::parse(topic)?;
        if let Some(ctx) = &options.context {
            if !context::is_object_like(ctx) {
                return Err(BusError::InvalidContext(format!(
                    "expected a JSON object, got {ctx}"
                )));
            }
        }
        let callback: SubscriberFn =
            Arc::new(move |notification| callback(notification).into_subscriber_result());
        Ok(self.registry.insert(topic, callback, options))
    }

    /// Remove one subscription by id. Returns the topic's remaining
    /// subscriptions.
    ///
    /// Fails with [`BusError::DeliveryInProgress`] while a publication is
    /// being delivered: the bucket under iteration must not be mutated.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> Result<Vec<Subscription>> {
        let topic = Topic::parse(topic)?;
        self.ensure_not_dispatching()?;
        Ok(self.registry.remove(&topic, id))
    }

    /// Bulk-clear every subscription on a topic. Returns the (empty)
    /// remaining bucket.
    ///
    /// The emptied bucket stays present, so the topic still reports
    /// subscribed-to; see [`SubscriptionRegistry::has_any`].
    pub fn unsubscribe_all(&self, topic: &str) -> Result<Vec<Subscription>> {
        let topic = Topic::parse(topic)?;
        self.ensure_not_dispatching()?;
        Ok(self.registry.clear_topic(&topic))
    }

    /// Whether the topic, or any ancestor of it, has a bucket.
    pub fn has_subscriptions(&self, topic: &str) -> Result<bool> {
        let topic = Topic::parse(topic)?;
        Ok(self.registry.has_any(&topic))
    }

    /// The ordered subscriptions a publish to `topic` would deliver to.
    pub fn subscriptions(&self, topic: &str, include_ancestors: bool) -> Result<Vec<Subscription>> {
        let topic = Topic::parse(topic)?;
        Ok(self.registry.flatten(&topic, include_ancestors))
    }

    /// Total number of subscriptions across all topics.
    pub fn subscription_count(&self) -> usize {
        self.registry.subscription_count()
    }

    /// Drop every subscription and bucket. Reconfiguration after a reset
    /// reproduces identical delivery order for an identical subscribe
    /// sequence.
    pub fn reset(&self) {
        debug!("bus reset");
        self.registry.reset();
    }

    // --- Publishing ---

    /// Publish asynchronously: delivery is deferred to the next
    /// [`tick`](Self::tick).
    ///
    /// Topic validation still happens in this frame. The returned handle
    /// reports `Pending` until the deferred turn runs, except when no
    /// subscriber exists, which rejects immediately.
    pub fn publish(&self, topic: &str, options: PublishOptions) -> Result<PublicationHandle> {
        self.submit(topic, options, false)
    }

    /// Publish synchronously: the full lifecycle, subscriber calls through
    /// `always`, completes before this returns.
    pub fn publish_sync(&self, topic: &str, options: PublishOptions) -> Result<PublicationHandle> {
        self.submit(topic, options, true)
    }

    fn submit(&self, topic: &str, options: PublishOptions, sync: bool) -> Result<PublicationHandle> {
        let topic = Topic::parse(topic)?;
        let id = PublicationId(self.next_publication.fetch_add(1, Ordering::SeqCst));
        let publication = Publication::new(id, topic.clone(), options, sync);
        let handle = publication.handle();

        if !self.registry.has_any(&topic) {
            // Nobody listening at the topic or above. Reject in the calling
            // frame for both modes; progress/fail/always still run.
            trace!(topic = %topic, id = %id, "publish with no subscribers");
            publication.progress();
            publication.notification().reject();
            publication.finish();
            return Ok(handle);
        }

        if sync {
            self.dispatch(&publication);
        } else {
            trace!(topic = %topic, id = %id, "publish deferred");
            self.deferred.schedule(Deferred::Dispatch(publication));
        }
        Ok(handle)
    }

    // --- Deferred turn ---

    /// Schedule an arbitrary call on the bus's deferred queue, after any
    /// publish already queued.
    pub fn defer(&self, f: impl FnOnce() + Send + 'static) {
        self.deferred.schedule(Deferred::Call(Box::new(f)));
    }

    /// Run one cooperative turn: deliver every publish (and run every
    /// call) deferred before this tick began. Returns the number of tasks
    /// run. Work deferred during the tick waits for the next one.
    pub fn tick(&self) -> usize {
        let tasks = self.deferred.drain();
        let count = tasks.len();
        for task in tasks {
            match task {
                Deferred::Dispatch(publication) => self.dispatch(&publication),
                Deferred::Call(f) => f(),
            }
        }
        count
    }

    /// Number of tasks waiting for the next tick.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    // --- Delivery engine ---

    /// Walk the ancestor chain and drive the publication's lifecycle.
    ///
    /// Holds the dispatch lock for the duration of the walk, including
    /// when entered from a deferred turn, so unsubscription cannot mutate
    /// the bucket snapshot mid-iteration.
    fn dispatch(&self, publication: &Publication) {
        let _guard = DispatchGuard::enter(&self.dispatch_depth);

        publication.progress();

        let notification = publication.notification();
        let chain = self.registry.flatten(publication.topic(), true);
        trace!(
            topic = %publication.topic(),
            id = %notification.id(),
            subscribers = chain.len(),
            sync = publication.is_sync(),
            "dispatching"
        );

        for subscription in chain {
            // Covers an explicit reject() from the previous callback.
            if !notification.is_propagation() {
                break;
            }

            notification.set_current_topic(subscription.topic().clone());
            notification.set_effective_context(context::merge(
                notification.publish_context(),
                subscription.context(),
            ));

            match (subscription.callback())(notification) {
                Ok(Propagation::Continue) => {}
                Ok(Propagation::Halt) => {
                    trace!(id = %notification.id(), subscriber = %subscription.id(), "propagation halted");
                    notification.reject();
                    break;
                }
                Err(e) => {
                    trace!(id = %notification.id(), subscriber = %subscription.id(), error = %e, "subscriber failed");
                    notification.reject_with(e.to_string());
                    break;
                }
            }
        }

        if notification.is_propagation() {
            notification.resolve();
        }
        publication.finish();
    }

    fn ensure_not_dispatching(&self) -> Result<()> {
        if self.dispatch_depth.load(Ordering::SeqCst) > 0 {
            Err(BusError::DeliveryInProgress)
        } else {
            Ok(())
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII depth guard for the dispatch lock.
struct DispatchGuard<'a> {
    depth: &'a AtomicU32,
}

impl<'a> DispatchGuard<'a> {
    fn enter(depth: &'a AtomicU32) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self { depth }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}
