//! # Wait group: block until every submitted task finished.
//!
//! [`WaitGroup`] wraps an [`Engine`]. Each [`WaitGroup::enqueue`] bumps a counter and
//! submits a wrapper that releases it exactly once, after the task's own hook ran,
//! whether the task succeeded or failed. [`WaitGroup::wait`] resolves when the counter
//! is back to zero, independently of engine shutdown.
//!
//! A task that is dropped without running also releases the counter: rejected at
//! admission, or discarded from the queue by a fast or aborted shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, TaskError};
use crate::queue::TaskId;
use crate::tasks::{BoxTaskFuture, Task, TaskRef};
use crate::Engine;

#[derive(Default)]
struct Counter {
    pending: AtomicUsize,
    zero: Notify,
}

impl Counter {
    fn add(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    fn done(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.zero.notify_waiters();
        }
    }

    fn get(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Wrapper releasing the counter once, after the inner task's hook.
struct Guarded {
    inner: TaskRef,
    counter: Arc<Counter>,
    released: AtomicBool,
}

impl Guarded {
    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.counter.done();
        }
    }
}

impl Drop for Guarded {
    fn drop(&mut self) {
        self.release();
    }
}

impl Task for Guarded {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        self.inner.spawn(ctx)
    }

    fn on_success(&self, ctx: &CancellationToken) {
        self.inner.on_success(ctx);
        self.release();
    }

    fn on_failure(&self, ctx: &CancellationToken, err: &TaskError) {
        self.inner.on_failure(ctx, err);
        self.release();
    }
}

/// Completion barrier over an [`Engine`].
///
/// # Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use taskdispatch::{TaskFn, TaskRef, TaskError, WaitGroup};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let wg = WaitGroup::start(4).await?;
///     for n in 0..8u64 {
///         let task: TaskRef = TaskFn::arc("square", move |_ctx: CancellationToken| async move {
///             let _ = n * n;
///             Ok::<(), TaskError>(())
///         });
///         wg.enqueue(task).await?;
///     }
///
///     wg.wait().await;
///     assert_eq!(wg.pending(), 0);
///     wg.engine().close().await?;
///     Ok(())
/// }
/// ```
pub struct WaitGroup {
    engine: Arc<Engine>,
    counter: Arc<Counter>,
}

impl WaitGroup {
    /// Wraps `engine`; starting and stopping it stays with the caller.
    pub fn new(engine: Engine) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    /// Wraps an engine that is shared with other owners.
    pub fn from_shared(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            counter: Arc::new(Counter::default()),
        }
    }

    /// Builds and starts a pool engine with `concurrency` workers.
    pub async fn start(concurrency: usize) -> Result<Self, DispatchError> {
        let wg = Self::new(Engine::new(concurrency));
        wg.engine.start().await?;
        Ok(wg)
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Counts `task` and submits it; errors are those of [`Engine::enqueue`].
    pub async fn enqueue(&self, task: impl Into<Option<TaskRef>>) -> Result<TaskId, DispatchError> {
        let Some(task) = task.into() else {
            return Err(DispatchError::NilTask);
        };
        self.counter.add();
        let guarded: TaskRef = Arc::new(Guarded {
            inner: task,
            counter: Arc::clone(&self.counter),
            released: AtomicBool::new(false),
        });
        self.engine.enqueue(guarded).await
    }

    /// Number of counted tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.counter.get()
    }

    /// Resolves once every counted task finished.
    pub async fn wait(&self) {
        loop {
            let zero = self.counter.zero.notified();
            tokio::pin!(zero);
            zero.as_mut().enable();

            if self.counter.get() == 0 {
                return;
            }
            zero.await;
        }
    }
}
