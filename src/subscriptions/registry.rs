//! Subscription registry mapping topics to ordered subscriber buckets.

use crate::topic::Topic;
use crate::types::SubscriptionId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::types::{SubscribeOptions, SubscriberFn, Subscription};

/// Maps each topic to its insertion-ordered, priority-sorted bucket.
///
/// An empty-but-present bucket (left behind by a bulk clear) is distinct
/// from an absent topic: presence is what [`has_any`](Self::has_any) keys
/// on, so a cleared topic still reports as subscribed-to until the bucket
/// itself is dropped by [`reset`](Self::reset).
pub struct SubscriptionRegistry {
    buckets: RwLock<HashMap<Topic, Vec<Subscription>>>,
    /// Counter for subscription ids; ids double as creation order.
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback against a topic.
    ///
    /// Appends to the topic's bucket, then re-sorts the bucket by
    /// `(priority, creation order)` with the stdlib's stable sort, so
    /// equal-priority subscriptions keep their subscribe-call order.
    pub fn insert(
        &self,
        topic: Topic,
        callback: SubscriberFn,
        options: SubscribeOptions,
    ) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let subscription = Subscription::new(id, topic.clone(), callback, options);

        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(topic.clone()).or_default();
        bucket.push(subscription.clone());
        bucket.sort_by_key(|s| s.sort_key());

        debug!(topic = %topic, id = %id, priority = subscription.priority(), "subscribed");
        subscription
    }

    /// Remove exactly one subscription by id.
    ///
    /// Unknown ids are ignored. Returns the remaining bucket contents.
    pub fn remove(&self, topic: &Topic, id: SubscriptionId) -> Vec<Subscription> {
        let mut buckets = self.buckets.write();
        match buckets.get_mut(topic) {
            Some(bucket) => {
                if let Some(pos) = bucket.iter().position(|s| s.id() == id) {
                    bucket.remove(pos);
                    debug!(topic = %topic, id = %id, "unsubscribed");
                }
                bucket.clone()
            }
            None => Vec::new(),
        }
    }

    /// Bulk-clear a topic's bucket, leaving the (now empty) bucket present.
    ///
    /// Returns the remaining bucket contents, which is always empty.
    pub fn clear_topic(&self, topic: &Topic) -> Vec<Subscription> {
        let mut buckets = self.buckets.write();
        let removed = match buckets.insert(topic.clone(), Vec::new()) {
            Some(old) => old.len(),
            None => 0,
        };
        debug!(topic = %topic, removed, "cleared topic");
        Vec::new()
    }

    /// Whether the topic, or any ancestor of it, has a bucket.
    ///
    /// Keyed on bucket presence, not emptiness: a bulk-cleared topic still
    /// counts until `reset` drops its bucket.
    pub fn has_any(&self, topic: &Topic) -> bool {
        let buckets = self.buckets.read();
        topic.ancestors().iter().any(|t| buckets.contains_key(t))
    }

    /// The ordered subscriptions a publish to `topic` would deliver to.
    ///
    /// With `include_ancestors`, concatenates each ancestor level's bucket
    /// leaf-first, the delivery order. Priority ordering applies within a
    /// level, never across levels.
    pub fn flatten(&self, topic: &Topic, include_ancestors: bool) -> Vec<Subscription> {
        let buckets = self.buckets.read();
        if !include_ancestors {
            return buckets.get(topic).cloned().unwrap_or_default();
        }
        let mut chain = Vec::new();
        for level in topic.ancestors() {
            if let Some(bucket) = buckets.get(&level) {
                chain.extend(bucket.iter().cloned());
            }
        }
        chain
    }

    /// Total number of subscriptions across all topics.
    pub fn subscription_count(&self) -> usize {
        self.buckets.read().values().map(Vec::len).sum()
    }

    /// Drop every bucket, empty or not.
    pub fn reset(&self) {
        let mut buckets = self.buckets.write();
        debug!(topics = buckets.len(), "registry reset");
        buckets.clear();
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::types::Propagation;
    use std::sync::Arc;

    fn noop() -> SubscriberFn {
        Arc::new(|_| Ok(Propagation::Continue))
    }

    fn topic(s: &str) -> Topic {
        Topic::parse(s).unwrap()
    }

    #[test]
    fn test_insert_sorts_by_priority_then_creation() {
        let registry = SubscriptionRegistry::new();
        let t = topic("/t");

        let late = registry.insert(t.clone(), noop(), SubscribeOptions::new().priority(20));
        let early = registry.insert(t.clone(), noop(), SubscribeOptions::new().priority(1));
        let default_a = registry.insert(t.clone(), noop(), SubscribeOptions::new());
        let default_b = registry.insert(t.clone(), noop(), SubscribeOptions::new());

        let order: Vec<_> = registry
            .flatten(&t, false)
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(
            order,
            vec![early.id(), default_a.id(), default_b.id(), late.id()]
        );
    }

    #[test]
    fn test_remove_exactly_one() {
        let registry = SubscriptionRegistry::new();
        let t = topic("/t");

        let a = registry.insert(t.clone(), noop(), SubscribeOptions::new());
        let b = registry.insert(t.clone(), noop(), SubscribeOptions::new());

        let remaining = registry.remove(&t, a.id());
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), b.id());

        // Unknown id: no-op.
        let remaining = registry.remove(&t, a.id());
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_clear_leaves_bucket_present() {
        let registry = SubscriptionRegistry::new();
        let t = topic("/t");

        registry.insert(t.clone(), noop(), SubscribeOptions::new());
        let remaining = registry.clear_topic(&t);
        assert!(remaining.is_empty());
        assert_eq!(registry.subscription_count(), 0);

        // The empty bucket still counts for has_any.
        assert!(registry.has_any(&t));

        registry.reset();
        assert!(!registry.has_any(&t));
    }

    #[test]
    fn test_has_any_checks_ancestors() {
        let registry = SubscriptionRegistry::new();
        registry.insert(topic("/x"), noop(), SubscribeOptions::new());

        assert!(registry.has_any(&topic("/x/y/z")));
        assert!(registry.has_any(&topic("/x")));
        assert!(!registry.has_any(&topic("/other")));
    }

    #[test]
    fn test_flatten_concatenates_levels_leaf_first() {
        let registry = SubscriptionRegistry::new();

        // Subscribed out of leaf-first order, and with a priority that
        // would win globally if levels were merged.
        let root = registry.insert(topic("/x"), noop(), SubscribeOptions::new().priority(0));
        let mid = registry.insert(topic("/x/y"), noop(), SubscribeOptions::new());
        let leaf = registry.insert(topic("/x/y/z"), noop(), SubscribeOptions::new().priority(99));

        let order: Vec<_> = registry
            .flatten(&topic("/x/y/z"), true)
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(order, vec![leaf.id(), mid.id(), root.id()]);
    }

    #[test]
    fn test_flatten_without_ancestors() {
        let registry = SubscriptionRegistry::new();
        registry.insert(topic("/x"), noop(), SubscribeOptions::new());
        let leaf = registry.insert(topic("/x/y"), noop(), SubscribeOptions::new());

        let own: Vec<_> = registry
            .flatten(&topic("/x/y"), false)
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(own, vec![leaf.id()]);
        assert!(registry.flatten(&topic("/unknown"), false).is_empty());
    }
}
