//! # Topic Bus
//!
//! A hierarchical, priority-ordered publish/subscribe message bus with
//! topic bubbling and cooperative propagation control.
//!
//! ## Core Concepts
//!
//! - **Topics**: Unix-path-like names forming a hierarchy (`/app/log/error`)
//! - **Bubbling**: a publish to a leaf topic also notifies every ancestor
//!   topic's subscribers, leaf first
//! - **Priorities**: within a topic, smaller priority delivers earlier;
//!   ties preserve subscribe order
//! - **Propagation control**: a subscriber can halt delivery to the
//!   remaining chain by returning `false`, returning an error, or
//!   rejecting the notification
//! - **Sync and deferred delivery**: `publish_sync` runs the whole
//!   lifecycle in the calling frame; `publish` waits for the next
//!   cooperative [`Bus::tick`]
//!
//! ## Example
//!
//! ```
//! use topicbus::{Bus, PublishOptions, SubscribeOptions};
//! use serde_json::json;
//!
//! let bus = Bus::new();
//!
//! // A log sink listening to the whole /log subtree.
//! bus.subscribe_with("/log", |notification| {
//!     println!("[sink] {:?}", notification.data());
//! }, SubscribeOptions::new().priority(1)).unwrap();
//!
//! // Deliver an entry to /log/error and, by bubbling, to /log.
//! let handle = bus.publish_sync("/log/error", PublishOptions::new()
//!     .data(json!({ "message": "disk full", "level": "error" }))
//! ).unwrap();
//!
//! assert!(handle.is_resolved());
//! ```

pub mod bus;
pub mod context;
pub mod defer;
pub mod error;
pub mod publication;
pub mod subscriptions;
pub mod topic;
pub mod types;

// Re-exports
pub use bus::Bus;
pub use defer::DeferQueue;
pub use error::{BusError, Result};
pub use publication::{
    LifecycleFn, Notification, NotificationState, Publication, PublicationHandle,
    PublicationReceipt, PublishOptions,
};
pub use subscriptions::{
    IntoSubscriberResult, Propagation, SubscribeOptions, Subscription, SubscriberError,
    SubscriberFn, SubscriberResult, SubscriptionRegistry,
};
pub use topic::Topic;
pub use types::{PublicationId, SubscriptionId, Timestamp, DEFAULT_PRIORITY};
