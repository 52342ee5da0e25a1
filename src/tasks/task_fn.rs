//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per execution. Completion hooks are optional closures attached with
//! [`TaskFn::with_on_success`] / [`TaskFn::with_on_failure`] and only invoked when present.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use taskdispatch::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = Arc::new(
//!     TaskFn::new("worker", |_ctx: CancellationToken| async move { Ok::<_, TaskError>(()) })
//!         .with_on_success(|_ctx| println!("done")),
//! );
//!
//! assert_eq!(t.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

type SuccessHook = Box<dyn Fn(&CancellationToken) + Send + Sync>;
type FailureHook = Box<dyn Fn(&CancellationToken, &TaskError) + Send + Sync>;

/// Function-backed task implementation.
///
/// Wraps a closure that *creates* a new future per execution. Shared state between
/// executions must be captured explicitly (e.g. an `Arc<AtomicUsize>`).
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
    success: Option<SuccessHook>,
    failure: Option<FailureHook>,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task without hooks.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            success: None,
            failure: None,
        }
    }

    /// Creates the task and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use tokio_util::sync::CancellationToken;
    /// use taskdispatch::{TaskFn, TaskRef, TaskError};
    ///
    /// let t: TaskRef = TaskFn::arc("hello", |_ctx: CancellationToken| async {
    ///     Ok::<_, TaskError>(())
    /// });
    /// assert_eq!(t.name(), "hello");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Attaches a hook invoked after a successful execution.
    pub fn with_on_success(
        mut self,
        hook: impl Fn(&CancellationToken) + Send + Sync + 'static,
    ) -> Self {
        self.success = Some(Box::new(hook));
        self
    }

    /// Attaches a hook invoked after a failed execution.
    pub fn with_on_failure(
        mut self,
        hook: impl Fn(&CancellationToken, &TaskError) + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(Box::new(hook));
        self
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }

    fn on_success(&self, ctx: &CancellationToken) {
        if let Some(hook) = &self.success {
            hook(ctx);
        }
    }

    fn on_failure(&self, ctx: &CancellationToken, err: &TaskError) {
        if let Some(hook) = &self.failure {
            hook(ctx, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_spawn_creates_fresh_future_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let task = TaskFn::new("count", move |_ctx: CancellationToken| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        });

        task.spawn(CancellationToken::new()).await.unwrap();
        task.spawn(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hooks_only_fire_when_present() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let with_hook = TaskFn::new("hooked", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        })
        .with_on_failure(move |_ctx, _err| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let bare = TaskFn::new("bare", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        });

        let ctx = CancellationToken::new();
        let err = TaskError::fail("boom");
        with_hook.on_failure(&ctx, &err);
        with_hook.on_success(&ctx);
        bare.on_failure(&ctx, &err);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
