//! # Retry decorator.
//!
//! [`Retry`] wraps another task and re-runs it while it returns a retryable error
//! ([`TaskError::Retry`]).
//!
//! ## Rules
//! - At most `max_retries` attempts are made in total.
//! - `Ok(())` at any attempt short-circuits successfully.
//! - Any non-retryable error short-circuits and is returned as-is.
//! - When every attempt asked for a retry, the result is
//!   [`TaskError::MaxRetriesExceeded`] carrying the last retryable error message.
//! - With a [`BackoffPolicy`] attached, the wrapper sleeps `backoff.next(n)` between
//!   attempts; cancellation of the task token aborts the sleep with [`TaskError::Canceled`].
//!
//! ```text
//! attempt 0 ──► Err(Retry) ──► [sleep] ──► attempt 1 ──► Err(Retry) ──► ... ──► MaxRetriesExceeded
//!                                              └──► Ok(()) ──► done
//! ```

use std::sync::Arc;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::policies::BackoffPolicy;
use crate::tasks::task::{BoxTaskFuture, Task, TaskRef};

/// Task wrapper re-invoking its inner task on [`TaskError::Retry`].
///
/// Hooks are forwarded to the inner task, so `on_success` / `on_failure` still fire
/// exactly once per execution of the wrapper, not per attempt.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use taskdispatch::{Retry, TaskFn, TaskRef, TaskError};
///
/// let flaky: TaskRef = TaskFn::arc("flaky", |_ctx: CancellationToken| async {
///     Err::<(), _>(TaskError::retry("upstream busy"))
/// });
/// let task: TaskRef = Retry::arc(flaky, 3);
/// assert_eq!(task.name(), "flaky");
/// ```
pub struct Retry {
    inner: TaskRef,
    max_retries: u32,
    backoff: Option<BackoffPolicy>,
}

impl Retry {
    /// Wraps `inner`, allowing at most `max_retries` attempts.
    pub fn new(inner: TaskRef, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            backoff: None,
        }
    }

    /// Same as [`Retry::new`], returned as a shared handle.
    pub fn arc(inner: TaskRef, max_retries: u32) -> Arc<Self> {
        Arc::new(Self::new(inner, max_retries))
    }

    /// Sleeps according to `backoff` between attempts.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Maximum number of attempts.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Task for Retry {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        let inner = Arc::clone(&self.inner);
        let max = self.max_retries;
        let backoff = self.backoff;

        Box::pin(async move {
            let mut last = String::new();

            for attempt in 0..max {
                match inner.spawn(ctx.clone()).await {
                    Ok(()) => return Ok(()),
                    Err(e) if e.is_retryable() => last = e.to_string(),
                    Err(e) => return Err(e),
                }
                tracing::debug!(task = inner.name(), attempt, "retry requested");

                let Some(backoff) = backoff.filter(|_| attempt + 1 < max) else {
                    continue;
                };
                select! {
                    _ = time::sleep(backoff.next(attempt)) => {}
                    _ = ctx.cancelled() => return Err(TaskError::Canceled),
                }
            }

            Err(TaskError::MaxRetriesExceeded { retries: max, last })
        })
    }

    fn on_success(&self, ctx: &CancellationToken) {
        self.inner.on_success(ctx);
    }

    fn on_failure(&self, ctx: &CancellationToken, err: &TaskError) {
        self.inner.on_failure(ctx, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::JitterPolicy;
    use crate::tasks::TaskFn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Returns `Retry` for the first `k` calls, then `Ok(())`.
    fn flaky(k: u32, calls: Arc<AtomicU32>) -> TaskRef {
        TaskFn::arc("flaky", move |_ctx: CancellationToken| {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < k {
                    Err(TaskError::retry("again"))
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test]
    async fn test_succeeds_when_budget_exceeds_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = Retry::new(flaky(2, calls.clone()), 3);

        assert_eq!(task.spawn(CancellationToken::new()).await, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_reports_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = Retry::new(flaky(3, calls.clone()), 3);

        let err = task.spawn(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, TaskError::MaxRetriesExceeded { retries: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let inner: TaskRef = TaskFn::arc("broken", move |_ctx: CancellationToken| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(TaskError::fail("boom"))
            }
        });

        let err = Retry::new(inner, 5)
            .spawn(CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::fail("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleep_is_cancellable() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = Retry::new(flaky(10, calls.clone()), 10).with_backoff(BackoffPolicy {
            first: Duration::from_secs(60),
            max: Duration::from_secs(60),
            factor: 1.0,
            jitter: JitterPolicy::None,
        });

        let ctx = CancellationToken::new();
        let fut = task.spawn(ctx.clone());
        ctx.cancel();
        assert_eq!(fut.await, Err(TaskError::Canceled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
