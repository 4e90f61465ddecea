//! Error types for the message bus.

use thiserror::Error;

/// Main error type for bus operations.
///
/// Every variant is raised synchronously at the call site that violated
/// the contract, never deferred, never delivered to subscribers. A
/// subscriber's own failure during delivery is not a `BusError`; it is
/// captured as a rejection on the notification and surfaces through the
/// publication's `fail`/`always` callbacks.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),

    #[error("Invalid subscription context: {0}")]
    InvalidContext(String),

    #[error("Cannot unsubscribe while a publication is being delivered")]
    DeliveryInProgress,
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
