//! Subscription system for topic delivery.
//!
//! This module maps topics to ordered lists of subscribers:
//! - Per-topic buckets, kept sorted by `(priority, creation order)`
//! - Exact and ancestor-chain lookup (the bubbling delivery order)
//! - Single removal by id and per-topic bulk clear
//!
//! Subscribers steer delivery through their return value:
//! - `()` or `true` lets the notification continue up the chain
//! - `false` or [`Propagation::Halt`] stops the remaining chain
//! - `Err` rejects the notification with the error's message
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new();
//!
//! let subscription = registry.insert(
//!     Topic::parse("/app/log")?,
//!     Arc::new(|notification| {
//!         println!("Got: {:?}", notification.data());
//!         Ok(Propagation::Continue)
//!     }),
//!     SubscribeOptions::new().priority(5),
//! );
//!
//! // Delivery order for a publish to /app/log/error:
//! let chain = registry.flatten(&Topic::parse("/app/log/error")?, true);
//! ```

mod registry;
mod types;

pub use registry::SubscriptionRegistry;
pub use types::{
    IntoSubscriberResult, Propagation, SubscribeOptions, Subscription, SubscriberError,
    SubscriberFn, SubscriberResult,
};
