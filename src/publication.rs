//! Publication and notification values exchanged during a single publish.
//!
//! A publish call builds one [`Publication`] owning exactly one
//! [`Notification`]. The publication carries the caller's lifecycle
//! callbacks; the notification is what subscribers actually receive, with
//! a mutable current-topic field that climbs the ancestor chain and a
//! terminal state machine (`pending -> resolved | rejected`).

use crate::context;
use crate::topic::Topic;
use crate::types::{PublicationId, Timestamp};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Lifecycle callback attached to a publication.
pub type LifecycleFn = Box<dyn Fn(&Notification) + Send + Sync>;

/// Outcome state of a single publish event.
///
/// Transitions are one-way: `Pending` moves to exactly one of the terminal
/// states and never back. Late transition attempts are no-ops.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationState {
    /// Delivery has not finished.
    Pending,
    /// Every reachable subscriber ran without halting propagation.
    Resolved,
    /// Propagation was halted, a subscriber failed, or nobody was listening.
    Rejected { reason: Option<String> },
}

impl NotificationState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NotificationState::Pending)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, NotificationState::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, NotificationState::Resolved)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, NotificationState::Rejected { .. })
    }
}

/// The subscriber-facing view of one publish event.
///
/// Shared by identity between the publication, its handle, and every
/// subscriber in the chain: mutations of the current topic and state are
/// visible to all holders.
pub struct Notification {
    id: PublicationId,
    publish_topic: Topic,
    current_topic: RwLock<Topic>,
    data: Option<Value>,
    publish_context: Option<Value>,
    effective_context: RwLock<Option<Value>>,
    timestamp: Timestamp,
    synchronous: bool,
    state: Mutex<NotificationState>,
}

impl Notification {
    fn new(
        id: PublicationId,
        topic: Topic,
        data: Option<Value>,
        context: Option<Value>,
        synchronous: bool,
    ) -> Self {
        Self {
            id,
            current_topic: RwLock::new(topic.clone()),
            publish_topic: topic,
            data,
            effective_context: RwLock::new(context.clone()),
            publish_context: context,
            timestamp: Timestamp::now(),
            synchronous,
            state: Mutex::new(NotificationState::Pending),
        }
    }

    /// Identifier shared with the owning publication.
    pub fn id(&self) -> PublicationId {
        self.id
    }

    /// The topic originally published to. Fixed for the whole delivery.
    pub fn publish_topic(&self) -> &Topic {
        &self.publish_topic
    }

    /// The ancestor level currently being delivered to.
    ///
    /// Starts equal to [`publish_topic`](Self::publish_topic) and moves one
    /// step root-ward per delivered level.
    pub fn current_topic(&self) -> Topic {
        self.current_topic.read().clone()
    }

    /// The published data payload, if any.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The effective context for the current delivery step.
    ///
    /// Publisher context unless the subscription supplied its own, in which
    /// case the two are merged with subscriber fields winning.
    pub fn context(&self) -> Option<Value> {
        self.effective_context.read().clone()
    }

    /// When the publication was created.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether the caller requested synchronous delivery.
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Current state of the publish event.
    pub fn state(&self) -> NotificationState {
        self.state.lock().clone()
    }

    /// Whether delivery may continue to the remaining chain.
    pub fn is_propagation(&self) -> bool {
        self.state.lock().is_pending()
    }

    /// Reject the notification, halting propagation. No-op once terminal.
    pub fn reject(&self) {
        self.transition(NotificationState::Rejected { reason: None });
    }

    /// Reject with a reason, halting propagation. No-op once terminal.
    pub fn reject_with(&self, reason: impl Into<String>) {
        self.transition(NotificationState::Rejected {
            reason: Some(reason.into()),
        });
    }

    pub(crate) fn resolve(&self) {
        self.transition(NotificationState::Resolved);
    }

    fn transition(&self, next: NotificationState) {
        let mut state = self.state.lock();
        if state.is_pending() {
            *state = next;
        }
    }

    pub(crate) fn publish_context(&self) -> Option<&Value> {
        self.publish_context.as_ref()
    }

    pub(crate) fn set_current_topic(&self, topic: Topic) {
        *self.current_topic.write() = topic;
    }

    pub(crate) fn set_effective_context(&self, context: Option<Value>) {
        *self.effective_context.write() = context;
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("id", &self.id)
            .field("publish_topic", &self.publish_topic)
            .field("current_topic", &*self.current_topic.read())
            .field("state", &*self.state.lock())
            .field("synchronous", &self.synchronous)
            .finish()
    }
}

/// Options for a publish call.
///
/// All fields are optional; `PublishOptions::new()` publishes with no
/// payload and no lifecycle callbacks. Non-object `data`/`context` values
/// are normalized away at publication build time.
#[derive(Default)]
pub struct PublishOptions {
    pub(crate) data: Option<Value>,
    pub(crate) context: Option<Value>,
    pub(crate) progress: Option<LifecycleFn>,
    pub(crate) done: Option<LifecycleFn>,
    pub(crate) fail: Option<LifecycleFn>,
    pub(crate) always: Option<LifecycleFn>,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data payload delivered to every subscriber.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Publisher-side invocation context.
    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Invoked once, right before delivery begins.
    pub fn on_progress(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Invoked once, only if the publication resolves.
    pub fn on_done(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.done = Some(Box::new(f));
        self
    }

    /// Invoked once, only if the publication is rejected.
    pub fn on_fail(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.fail = Some(Box::new(f));
        self
    }

    /// Invoked once, unconditionally, after `done`/`fail`.
    pub fn on_always(mut self, f: impl Fn(&Notification) + Send + Sync + 'static) -> Self {
        self.always = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for PublishOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishOptions")
            .field("data", &self.data)
            .field("context", &self.context)
            .field("progress", &self.progress.is_some())
            .field("done", &self.done.is_some())
            .field("fail", &self.fail.is_some())
            .field("always", &self.always.is_some())
            .finish()
    }
}

/// The caller-side request object for one publish call.
///
/// Created fresh per publish, handed to the delivery engine, and discarded
/// once the lifecycle callbacks have run. Never stored in the registry.
pub struct Publication {
    topic: Topic,
    sync: bool,
    notification: Arc<Notification>,
    progress: Option<LifecycleFn>,
    done: Option<LifecycleFn>,
    fail: Option<LifecycleFn>,
    always: Option<LifecycleFn>,
}

impl Publication {
    pub(crate) fn new(id: PublicationId, topic: Topic, options: PublishOptions, sync: bool) -> Self {
        let data = context::normalize(options.data);
        let ctx = context::normalize(options.context);
        let notification = Arc::new(Notification::new(id, topic.clone(), data, ctx, sync));
        Self {
            topic,
            sync,
            notification,
            progress: options.progress,
            done: options.done,
            fail: options.fail,
            always: options.always,
        }
    }

    /// The exact topic published to.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Whether the caller requested synchronous delivery.
    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// The notification this publication owns.
    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    /// A shareable handle observing this publication's lifecycle.
    pub fn handle(&self) -> PublicationHandle {
        PublicationHandle {
            notification: Arc::clone(&self.notification),
        }
    }

    /// Invoke the `progress` callback. The engine calls this exactly once,
    /// before any subscriber runs.
    pub(crate) fn progress(&self) {
        if let Some(f) = &self.progress {
            f(&self.notification);
        }
    }

    /// Invoke `done` or `fail` per the final state, then `always`. The
    /// engine calls this exactly once, after the chain walk.
    pub(crate) fn finish(&self) {
        match self.notification.state() {
            NotificationState::Resolved => {
                if let Some(f) = &self.done {
                    f(&self.notification);
                }
            }
            NotificationState::Rejected { .. } => {
                if let Some(f) = &self.fail {
                    f(&self.notification);
                }
            }
            NotificationState::Pending => {}
        }
        if let Some(f) = &self.always {
            f(&self.notification);
        }
    }
}

impl fmt::Debug for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publication")
            .field("topic", &self.topic)
            .field("sync", &self.sync)
            .field("notification", &self.notification)
            .finish()
    }
}

/// Observer handle returned by `publish`/`publish_sync`.
///
/// Shares the notification by identity, so the final state of an
/// asynchronous publish becomes observable here once the deferred turn has
/// run.
#[derive(Clone)]
pub struct PublicationHandle {
    notification: Arc<Notification>,
}

impl PublicationHandle {
    pub fn id(&self) -> PublicationId {
        self.notification.id()
    }

    /// The topic originally published to.
    pub fn topic(&self) -> &Topic {
        self.notification.publish_topic()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.notification.timestamp()
    }

    /// Current state of the underlying notification.
    pub fn state(&self) -> NotificationState {
        self.notification.state()
    }

    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    pub fn is_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    pub fn is_rejected(&self) -> bool {
        self.state().is_rejected()
    }

    /// The full subscriber-facing view.
    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    /// Serializable snapshot of the publication's identity and state.
    pub fn snapshot(&self) -> PublicationReceipt {
        PublicationReceipt {
            id: self.id(),
            topic: self.topic().clone(),
            timestamp: self.timestamp(),
            state: self.state(),
        }
    }
}

impl fmt::Debug for PublicationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicationHandle")
            .field("id", &self.id())
            .field("topic", self.topic())
            .field("state", &self.state())
            .finish()
    }
}

/// Point-in-time snapshot of a publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationReceipt {
    pub id: PublicationId,
    pub topic: Topic,
    pub timestamp: Timestamp,
    pub state: NotificationState,
}
