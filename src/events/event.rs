//! # Runtime events emitted by the engine and its workers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task events**: admission and execution (enqueued, starting, done, failed)
//! - **Worker events**: worker lifecycle and queue malfunction
//! - **Shutdown events**: the drain protocol (requested, all stopped, aborted)
//!
//! The [`Event`] struct carries metadata such as timestamps, task ID/name, worker ID and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use taskdispatch::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task_id(7)
//!     .with_task("resize")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task_id, Some(7));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::queue::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task events ===
    /// Task admitted to the queue.
    ///
    /// Sets: `task_id`, `task`
    TaskEnqueued,

    /// A worker picked the task up and is about to run it.
    ///
    /// Sets: `task_id`, `task`, `worker`
    TaskStarting,

    /// Task finished successfully (`on_success` already ran).
    ///
    /// Sets: `task_id`, `task`, `worker`
    TaskDone,

    /// Task finished with an error (`on_failure` already ran).
    ///
    /// Sets: `task_id`, `task`, `worker`, `reason`
    TaskFailed,

    // === Worker events ===
    /// Worker became ready to receive wake-ups.
    ///
    /// Sets: `worker`
    WorkerStarted,

    /// Worker reached its terminal `Stopped` status.
    ///
    /// Sets: `worker`
    WorkerStopped,

    /// Dequeue failed with something other than "empty".
    ///
    /// Sets: `worker`, `reason`
    DequeueFailed,

    // === Shutdown events ===
    /// Shutdown started; `reason` is `"wait"` or `"now"`.
    ShutdownRequested,

    /// Every worker reported `Stopped`.
    AllStopped,

    /// Shutdown gave up (deadline or scope cancellation); `reason` carries the label.
    ShutdownAborted,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// ID assigned at enqueue time, if applicable.
    pub task_id: Option<TaskId>,
    /// Task (or subscriber) name, if applicable.
    pub task: Option<Arc<str>>,
    /// Worker ID, if applicable.
    pub worker: Option<u64>,
    /// Human-readable reason (errors, shutdown mode, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task_id: None,
            task: None,
            worker: None,
            reason: None,
        }
    }

    /// Attaches the task ID.
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a worker ID.
    #[inline]
    pub fn with_worker(mut self, worker: u64) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskEnqueued);
        let b = Event::new(EventKind::TaskEnqueued);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_subscriber_events_are_internal() {
        assert!(Event::subscriber_overflow("log", "full").is_internal());
        assert!(!Event::new(EventKind::TaskDone).is_internal());
    }
}
