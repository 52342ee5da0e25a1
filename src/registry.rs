//! # Task registry: look submitted tasks up by ID.
//!
//! [`TaskRegistry`] submits through an [`Engine`] and remembers `id → task` together
//! with a live [`TaskStatus`]. Entries are never evicted: memory grows with the number
//! of submitted tasks, so long-lived callers should drop the registry (or manage their
//! own eviction) when that matters.
//!
//! ```text
//! submit(task) ─► Tracked(task, status) ─► engine.enqueue ─► id ─► entries[id] = Entry
//!                      │
//!                      └─ spawn:      Pending    ─► InProgress
//!                         on_success: InProgress ─► Done
//!                         on_failure: InProgress ─► Failed
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, TaskError};
use crate::queue::TaskId;
use crate::tasks::{BoxTaskFuture, Task, TaskRef};
use crate::Engine;

/// Lifecycle status of a submitted task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending = 0,
    /// Picked up by a worker.
    InProgress = 1,
    /// Finished successfully.
    Done = 2,
    /// Finished with an error.
    Failed = 3,
}

impl TaskStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskStatus::Pending,
            1 => TaskStatus::InProgress,
            2 => TaskStatus::Done,
            _ => TaskStatus::Failed,
        }
    }

    /// True for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}

/// Registry record for one submitted task.
#[derive(Clone)]
pub struct Entry {
    task: TaskRef,
    status: Arc<AtomicU8>,
}

impl Entry {
    /// The task as it was submitted.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("task", &self.task.name())
            .field("status", &self.status())
            .finish()
    }
}

/// Status-updating decorator enqueued in place of the submitted task.
struct Tracked {
    inner: TaskRef,
    status: Arc<AtomicU8>,
}

impl Tracked {
    fn set(&self, status: TaskStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

impl Task for Tracked {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        self.set(TaskStatus::InProgress);
        self.inner.spawn(ctx)
    }

    fn on_success(&self, ctx: &CancellationToken) {
        self.set(TaskStatus::Done);
        self.inner.on_success(ctx);
    }

    fn on_failure(&self, ctx: &CancellationToken, err: &TaskError) {
        self.set(TaskStatus::Failed);
        self.inner.on_failure(ctx, err);
    }
}

/// Engine wrapper recording every submitted task by ID.
///
/// # Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use taskdispatch::{Engine, ShutdownScope, TaskFn, TaskRef, TaskError, TaskRegistry, TaskStatus};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = TaskRegistry::new(Engine::new(1));
///     let task: TaskRef = TaskFn::arc("report", |_ctx: CancellationToken| async {
///         Ok::<(), TaskError>(())
///     });
///
///     let id = registry.submit(task).await?;
///     assert_eq!(registry.lookup(id).await.map(|e| e.status()), Some(TaskStatus::Pending));
///
///     registry.engine().start().await?;
///     registry.engine().shutdown(ShutdownScope::new().with_wait()).await?;
///     assert_eq!(registry.lookup(id).await.map(|e| e.status()), Some(TaskStatus::Done));
///     Ok(())
/// }
/// ```
pub struct TaskRegistry {
    engine: Arc<Engine>,
    entries: RwLock<HashMap<TaskId, Entry>>,
}

impl TaskRegistry {
    /// Wraps `engine`.
    pub fn new(engine: Engine) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    /// Wraps an engine that is shared with other owners.
    pub fn from_shared(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The wrapped engine (for `start` / `shutdown`).
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Enqueues `task` and records it under the returned ID.
    ///
    /// Errors are those of [`Engine::enqueue`]; nothing is recorded on failure.
    pub async fn submit(&self, task: impl Into<Option<TaskRef>>) -> Result<TaskId, DispatchError> {
        let Some(task) = task.into() else {
            return Err(DispatchError::NilTask);
        };
        let status = Arc::new(AtomicU8::new(TaskStatus::Pending as u8));
        let tracked: TaskRef = Arc::new(Tracked {
            inner: Arc::clone(&task),
            status: Arc::clone(&status),
        });

        let id = self.engine.enqueue(tracked).await?;
        self.entries.write().await.insert(id, Entry { task, status });
        Ok(id)
    }

    /// Returns the entry for `id`, if it was submitted through this registry.
    pub async fn lookup(&self, id: TaskId) -> Option<Entry> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Number of recorded tasks.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if nothing was submitted yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{ShutdownScope, TaskFn};

    fn failing() -> TaskRef {
        TaskFn::arc("failing", |_ctx: CancellationToken| async {
            Err::<(), _>(TaskError::fail("nope"))
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lookup_tracks_status_to_completion() {
        let registry = TaskRegistry::new(Engine::new(2));
        let ok: TaskRef = TaskFn::arc("ok", |_ctx: CancellationToken| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<(), TaskError>(())
        });

        let ok_id = registry.submit(Arc::clone(&ok)).await.unwrap();
        let bad_id = registry.submit(failing()).await.unwrap();
        assert_eq!(registry.len().await, 2);

        let entry = registry.lookup(ok_id).await.unwrap();
        assert!(Arc::ptr_eq(entry.task(), &ok));
        assert_eq!(entry.status(), TaskStatus::Pending);

        registry.engine().start().await.unwrap();
        registry
            .engine()
            .shutdown(ShutdownScope::new().with_wait())
            .await
            .unwrap();

        assert_eq!(entry.status(), TaskStatus::Done);
        assert_eq!(
            registry.lookup(bad_id).await.map(|e| e.status()),
            Some(TaskStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_rejected_submit_records_nothing() {
        let registry = TaskRegistry::new(Engine::new(1));
        assert!(matches!(
            registry.submit(None::<TaskRef>).await,
            Err(DispatchError::NilTask)
        ));

        registry.engine().close().await.unwrap();
        assert!(matches!(
            registry.submit(failing()).await,
            Err(DispatchError::Closed)
        ));
        assert!(registry.is_empty().await);
        assert!(registry.lookup(1).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_hook_still_reaches_terminal_status() {
        let registry = TaskRegistry::new(Engine::new(1));
        let ok: TaskRef = Arc::new(
            TaskFn::new("ok", |_ctx: CancellationToken| async { Ok::<(), TaskError>(()) })
                .with_on_success(|_ctx: &CancellationToken| panic!("success hook exploded")),
        );
        let bad: TaskRef = Arc::new(
            TaskFn::new("bad", |_ctx: CancellationToken| async {
                Err::<(), _>(TaskError::fail("nope"))
            })
            .with_on_failure(|_ctx: &CancellationToken, _err: &TaskError| {
                panic!("failure hook exploded")
            }),
        );

        let ok_id = registry.submit(ok).await.unwrap();
        let bad_id = registry.submit(bad).await.unwrap();
        registry.engine().start().await.unwrap();
        registry
            .engine()
            .shutdown(ShutdownScope::new().with_wait())
            .await
            .unwrap();

        assert_eq!(
            registry.lookup(ok_id).await.map(|e| e.status()),
            Some(TaskStatus::Done)
        );
        assert_eq!(
            registry.lookup(bad_id).await.map(|e| e.status()),
            Some(TaskStatus::Failed)
        );
    }
}
