//! Error types used by the dispatch engine, its queues and tasks.
//!
//! This module defines three enums:
//!
//! - [`DispatchError`]: errors raised by the engine itself (admission, state machine, shutdown).
//! - [`QueueError`]: errors raised by a backing [`Queue`](crate::Queue), including the
//!   [`QueueError::Empty`] control signal.
//! - [`TaskError`]: errors raised by individual task executions.
//!
//! All of them provide `as_label` for logs/metrics.

use thiserror::Error;

/// # Errors produced by the dispatch engine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Enqueue was called without a task.
    #[error("nil task")]
    NilTask,

    /// The engine is past its admission window (closing or closed).
    #[error("engine closed")]
    Closed,

    /// `start` was called on an engine that is already running.
    #[error("engine already running")]
    AlreadyRunning,

    /// `shutdown` was called while another shutdown is in progress.
    #[error("engine already closing")]
    AlreadyClosing,

    /// The backing queue rejected the operation.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The shutdown deadline elapsed before all workers stopped.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The shutdown scope was cancelled before all workers stopped.
    #[error("shutdown cancelled")]
    Canceled,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskdispatch::DispatchError;
    ///
    /// assert_eq!(DispatchError::Closed.as_label(), "dispatch_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::NilTask => "dispatch_nil_task",
            DispatchError::Closed => "dispatch_closed",
            DispatchError::AlreadyRunning => "dispatch_already_running",
            DispatchError::AlreadyClosing => "dispatch_already_closing",
            DispatchError::Queue(_) => "dispatch_queue",
            DispatchError::DeadlineExceeded => "dispatch_deadline_exceeded",
            DispatchError::Canceled => "dispatch_canceled",
        }
    }
}

/// # Errors produced by a backing queue.
///
/// [`QueueError::Empty`] is not a failure: it tells a worker there is nothing
/// to dequeue right now and it should go back to idle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No task is available right now.
    #[error("queue is empty")]
    Empty,

    /// The queue no longer accepts or yields tasks.
    #[error("queue closed")]
    Closed,

    /// The caller's token was cancelled while waiting for capacity.
    #[error("queue operation cancelled")]
    Canceled,

    /// Backend-specific failure (network, serialization, ...).
    #[error("queue backend failed: {error}")]
    Backend {
        /// The underlying error message.
        error: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Empty => "queue_empty",
            QueueError::Closed => "queue_closed",
            QueueError::Canceled => "queue_canceled",
            QueueError::Backend { .. } => "queue_backend",
        }
    }

    /// True for the "nothing to dequeue" control signal.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueError::Empty)
    }
}

/// # Errors produced by task execution.
///
/// Task errors stay local to the task: they reach its `on_failure` hook and the
/// engine's failure callback, never other tasks or the worker itself.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; a [`Retry`](crate::Retry) wrapper never re-runs it.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The task asks to be attempted again (honored by [`Retry`](crate::Retry)).
    #[error("retry requested: {reason}")]
    Retry {
        /// Why the attempt should be repeated.
        reason: String,
    },

    /// A [`Retry`](crate::Retry) wrapper used up its attempts.
    #[error("max retries exceeded after {retries} attempts; last: {last}")]
    MaxRetriesExceeded {
        /// Number of attempts made.
        retries: u32,
        /// Message of the last retryable error (empty if no attempt ran).
        last: String,
    },

    /// The task body panicked; the worker caught it and kept running.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// Task observed its cancellation token and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`TaskError::Retry`].
    pub fn retry(reason: impl Into<String>) -> Self {
        TaskError::Retry {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskdispatch::TaskError;
    ///
    /// assert_eq!(TaskError::retry("busy").as_label(), "task_retry");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Retry { .. } => "task_retry",
            TaskError::MaxRetriesExceeded { .. } => "task_max_retries",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether a [`Retry`](crate::Retry) wrapper should attempt the task again.
    ///
    /// # Example
    /// ```
    /// use taskdispatch::TaskError;
    ///
    /// assert!(TaskError::retry("busy").is_retryable());
    /// assert!(!TaskError::fail("boom").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Retry { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_converts_into_dispatch_error() {
        let err: DispatchError = QueueError::Backend {
            error: "redis down".into(),
        }
        .into();
        assert_eq!(err.as_label(), "dispatch_queue");
        assert_eq!(err.to_string(), "queue error: queue backend failed: redis down");
    }

    #[test]
    fn test_only_empty_is_empty() {
        assert!(QueueError::Empty.is_empty());
        assert!(!QueueError::Closed.is_empty());
    }

    #[test]
    fn test_max_retries_message_carries_last_error() {
        let err = TaskError::MaxRetriesExceeded {
            retries: 3,
            last: "retry requested: busy".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("busy"));
    }
}
