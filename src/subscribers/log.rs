//! # LogWriter: event renderer over `tracing`
//!
//! A minimal subscriber that turns every [`Event`] into one `tracing` record.
//! Handy in tests and demos; enabled by the `logging` feature.
//!
//! ## Example output (with a `fmt` subscriber installed)
//! ```text
//! DEBUG enqueued seq=1 id=Some(1) task="fetch"
//! DEBUG starting seq=3 id=Some(1) task="fetch" worker=Some(0)
//!  WARN failed seq=4 id=Some(1) task="fetch" worker=Some(0) reason="connection refused"
//!  INFO shutdown requested mode="wait"
//!  INFO all workers stopped
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber rendering every event through `tracing`.
///
/// Failures and overflow go to `warn`, the rest to `debug`/`info`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TaskEnqueued => {
                tracing::debug!(seq = e.seq, id = ?e.task_id, task, "enqueued");
            }
            EventKind::TaskStarting => {
                tracing::debug!(seq = e.seq, id = ?e.task_id, task, worker = ?e.worker, "starting");
            }
            EventKind::TaskDone => {
                tracing::info!(seq = e.seq, id = ?e.task_id, task, worker = ?e.worker, "done");
            }
            EventKind::TaskFailed => {
                tracing::warn!(seq = e.seq, id = ?e.task_id, task, worker = ?e.worker, reason, "failed");
            }
            EventKind::WorkerStarted => tracing::debug!(worker = ?e.worker, "worker started"),
            EventKind::WorkerStopped => tracing::debug!(worker = ?e.worker, "worker stopped"),
            EventKind::DequeueFailed => {
                tracing::warn!(worker = ?e.worker, reason, "dequeue failed");
            }
            EventKind::ShutdownRequested => tracing::info!(mode = reason, "shutdown requested"),
            EventKind::AllStopped => tracing::info!("all workers stopped"),
            EventKind::ShutdownAborted => tracing::warn!(reason, "shutdown aborted"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = task, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = task, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
