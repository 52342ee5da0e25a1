//! # Task abstraction.
//!
//! This module defines the [`Task`] trait (async, cancelable, with optional completion hooks).
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` shared between the caller,
//! the queue and the worker that eventually executes it.
//!
//! A task receives a [`CancellationToken`] and should periodically check it to
//! stop cooperatively during a fast shutdown. The engine never interrupts a running task.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// Only [`spawn`](Task::spawn) is mandatory. The hooks default to no-ops; the engine calls
/// exactly one of them after each execution:
/// - [`on_success`](Task::on_success) when the future resolved to `Ok(())`,
/// - [`on_failure`](Task::on_failure) otherwise (including a caught panic).
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use taskdispatch::{BoxTaskFuture, Task, TaskError};
///
/// struct Demo;
///
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(TaskError::Canceled);
///             }
///             Ok(())
///         })
///     }
///
///     fn on_failure(&self, _ctx: &CancellationToken, err: &TaskError) {
///         eprintln!("demo failed: {err}");
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a human-readable task name (used in events and logs).
    fn name(&self) -> &str {
        "task"
    }

    /// Creates a fresh future executing the task once.
    ///
    /// Must be callable from any worker; each call produces an independent attempt.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;

    /// Called once after a successful execution.
    fn on_success(&self, _ctx: &CancellationToken) {}

    /// Called once after a failed execution, with the error.
    fn on_failure(&self, _ctx: &CancellationToken, _err: &TaskError) {}
}
