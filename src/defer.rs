//! Deferred execution queue.
//!
//! Asynchronous publishes are not delivered in the calling frame; they are
//! queued here and run on the next cooperative turn. The queue is a plain
//! FIFO: there is no background thread, and nothing runs until the owner
//! drains it.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// FIFO queue of tasks scheduled for the next turn.
///
/// `drain` takes a snapshot of the queue: tasks scheduled while a drain is
/// running land on the following turn, which keeps one `drain` call equal
/// to exactly one tick of the cooperative scheduler.
pub struct DeferQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> DeferQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Schedule a task for the next drain.
    pub fn schedule(&self, task: T) {
        // The receiver lives as long as the queue, so the send cannot fail.
        let _ = self.tx.send(task);
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Remove and return every task scheduled before this call.
    pub fn drain(&self) -> Vec<T> {
        let pending = self.rx.len();
        let mut tasks = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.rx.try_recv() {
                Ok(task) => tasks.push(task),
                Err(_) => break,
            }
        }
        tasks
    }
}

impl<T> Default for DeferQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
