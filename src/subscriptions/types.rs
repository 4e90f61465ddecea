//! Subscription types and the subscriber return protocol.

use crate::publication::Notification;
use crate::topic::Topic;
use crate::types::{SubscriptionId, Timestamp, DEFAULT_PRIORITY};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a subscriber tells the delivery engine after handling a
/// notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// Deliver to the remaining chain.
    Continue,
    /// Stop here; the notification is rejected with no reason.
    Halt,
}

/// Error a subscriber callback may surface.
///
/// Caught by the delivery engine and translated into a rejection carrying
/// the error's message; it never escapes to the publisher.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one subscriber invocation.
pub type SubscriberResult = std::result::Result<Propagation, SubscriberError>;

/// Type-erased subscriber callback, as stored in the registry.
pub type SubscriberFn = Arc<dyn Fn(&Notification) -> SubscriberResult + Send + Sync>;

/// Conversion for subscriber callback return values.
///
/// Lets callbacks return whichever shape reads best at the call site:
/// `()` and `true` continue propagation, `false` halts it, and `Err`
/// rejects the notification with the error's message.
pub trait IntoSubscriberResult {
    fn into_subscriber_result(self) -> SubscriberResult;
}

impl IntoSubscriberResult for () {
    fn into_subscriber_result(self) -> SubscriberResult {
        Ok(Propagation::Continue)
    }
}

impl IntoSubscriberResult for bool {
    fn into_subscriber_result(self) -> SubscriberResult {
        if self {
            Ok(Propagation::Continue)
        } else {
            Ok(Propagation::Halt)
        }
    }
}

impl IntoSubscriberResult for Propagation {
    fn into_subscriber_result(self) -> SubscriberResult {
        Ok(self)
    }
}

impl<E: Into<SubscriberError>> IntoSubscriberResult for std::result::Result<Propagation, E> {
    fn into_subscriber_result(self) -> SubscriberResult {
        self.map_err(Into::into)
    }
}

impl<E: Into<SubscriberError>> IntoSubscriberResult for std::result::Result<(), E> {
    fn into_subscriber_result(self) -> SubscriberResult {
        self.map(|_| Propagation::Continue).map_err(Into::into)
    }
}

/// Options for a subscribe call.
#[derive(Clone, Debug)]
pub struct SubscribeOptions {
    /// Delivery priority within the subscription's topic level.
    /// Smaller delivers earlier. Default: 10.
    pub priority: i32,

    /// Subscriber-side invocation context. Must be a JSON object; merged
    /// over the publisher context with subscriber fields winning.
    pub context: Option<Value>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            context: None,
        }
    }
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// A registered subscriber.
///
/// Immutable after creation. The registry owns the authoritative copy for
/// the subscription's lifetime; clones share the callback and are handed
/// to callers as lookup results and subscribe receipts.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    ancestor_chain: Vec<Topic>,
    callback: SubscriberFn,
    priority: i32,
    context: Option<Value>,
    created_at: Timestamp,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: Topic,
        callback: SubscriberFn,
        options: SubscribeOptions,
    ) -> Self {
        Self {
            id,
            ancestor_chain: topic.ancestors(),
            topic,
            callback,
            priority: options.priority,
            context: options.context,
            created_at: Timestamp::now(),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The exact topic subscribed to, never an ancestor.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// The topic's ancestor chain, leaf first. Precomputed for diagnostics.
    pub fn ancestor_chain(&self) -> &[Topic] {
        &self.ancestor_chain
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub(crate) fn callback(&self) -> &SubscriberFn {
        &self.callback
    }

    /// Bucket ordering: priority ascending, then creation order. Ids are
    /// monotonic, so they stand in for the creation order.
    pub(crate) fn sort_key(&self) -> (i32, SubscriptionId) {
        (self.priority, self.id)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("priority", &self.priority)
            .field("context", &self.context)
            .field("created_at", &self.created_at)
            .finish()
    }
}
