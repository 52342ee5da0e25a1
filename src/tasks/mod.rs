//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for async cancelable tasks with optional completion hooks
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`Retry`] - decorator re-running a task on [`TaskError::Retry`](crate::TaskError::Retry)

mod retry;
mod task;
mod task_fn;

pub use retry::Retry;
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;
