//! # Pending-task storage.
//!
//! The engine stores submitted tasks in a [`Queue`] and never introspects it beyond
//! the two operations of the contract:
//!
//! - [`Queue::enqueue`] appends a task and returns a unique, ascending [`TaskId`];
//! - [`Queue::dequeue`] removes the oldest task, or fails with [`QueueError::Empty`]
//!   immediately when nothing is pending. It must never wait for future tasks:
//!   wake-up signalling, not queue blocking, drives the workers.
//!
//! ## Implementations
//! | Type            | Storage                       | `enqueue` when full           |
//! |-----------------|-------------------------------|-------------------------------|
//! | [`MemoryQueue`] | `VecDeque` behind a mutex     | never full                    |
//! | [`BoundedQueue`]| `tokio::sync::mpsc` channel   | waits for capacity (cancellable) |
//!
//! External backends (network stores, databases) implement the same trait and must
//! map "nothing pending" to [`QueueError::Empty`].

mod bounded;
mod memory;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::tasks::TaskRef;

pub use bounded::BoundedQueue;
pub use memory::MemoryQueue;

/// Identifier assigned to a task at enqueue time (starts at 1).
pub type TaskId = u64;

/// A task removed from the queue, paired with the ID it was enqueued under.
#[derive(Clone)]
pub struct Pending {
    /// ID returned by [`Queue::enqueue`].
    pub id: TaskId,
    /// The submitted task.
    pub task: TaskRef,
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("id", &self.id)
            .field("task", &self.task.name())
            .finish()
    }
}

/// Contract for pending-task storage.
///
/// Both operations must be safe for concurrent callers.
#[async_trait]
pub trait Queue: Send + Sync + 'static {
    /// Appends `task` and returns its ID.
    async fn enqueue(&self, ctx: &CancellationToken, task: TaskRef) -> Result<TaskId, QueueError>;

    /// Removes and returns the oldest pending task, or [`QueueError::Empty`].
    async fn dequeue(&self, ctx: &CancellationToken) -> Result<Pending, QueueError>;
}
