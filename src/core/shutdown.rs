//! # Shutdown scope and the wait-until-stopped loop.
//!
//! [`ShutdownScope`] tells [`Engine::shutdown`](crate::Engine::shutdown) how to stop:
//! - **wait flag**: drain queued tasks first (`with_wait`) or abandon them (default);
//! - **deadline**: give up with [`DispatchError::DeadlineExceeded`] once it passes;
//! - **token**: give up with [`DispatchError::Canceled`] once it fires.
//!
//! Waiting is a poll with growing delay (see [`BackoffPolicy::poll`]), woken early
//! whenever a worker reports `Stopped`.

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::strategy::Workers;
use crate::error::DispatchError;
use crate::policies::BackoffPolicy;

/// Cancellation and deadline scope of one shutdown call.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use taskdispatch::ShutdownScope;
///
/// let scope = ShutdownScope::new()
///     .with_wait()
///     .with_timeout(Duration::from_secs(30));
/// assert!(scope.waits());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ShutdownScope {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
    wait: bool,
}

impl ShutdownScope {
    /// Fast scope: no deadline, no token, queued tasks are abandoned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain every queued task before stopping.
    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }

    /// Gives up after `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Gives up at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Gives up when `token` is cancelled.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// True if this scope asks for a graceful drain.
    pub fn waits(&self) -> bool {
        self.wait
    }

    /// The error this scope has already resolved to, if any.
    pub(crate) fn expired(&self) -> Option<DispatchError> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(DispatchError::Canceled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(DispatchError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the deadline passes or the token fires; pending forever otherwise.
    pub(crate) async fn done(&self) -> DispatchError {
        let deadline = async {
            match self.deadline {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancelled => DispatchError::Canceled,
            _ = deadline => DispatchError::DeadlineExceeded,
        }
    }
}

/// Polls `workers` until all of them are stopped or `scope` expires.
pub(crate) async fn wait_stopped(
    workers: &dyn Workers,
    stopped: &tokio::sync::Notify,
    scope: &ShutdownScope,
    poll: BackoffPolicy,
) -> Result<(), DispatchError> {
    let mut step = 0u32;
    loop {
        let notified = stopped.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if workers.all_stopped() {
            return Ok(());
        }
        if let Some(err) = scope.expired() {
            return Err(err);
        }

        tokio::select! {
            err = scope.done() => return Err(err),
            _ = &mut notified => {}
            _ = time::sleep(poll.next(step)) => step = step.saturating_add(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::core::worker::WorkerStatus;

    #[derive(Default)]
    struct Flag {
        stopped: AtomicBool,
    }

    #[async_trait]
    impl Workers for Flag {
        fn notify(&self) -> bool {
            false
        }
        async fn start(&self, _runtime: CancellationToken) {}
        fn stop(&self) {}
        fn all_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }
        fn snapshot(&self) -> Vec<(u64, WorkerStatus)> {
            Vec::new()
        }
    }

    #[test]
    fn test_default_scope_is_fast_and_unbounded() {
        let scope = ShutdownScope::new();
        assert!(!scope.waits());
        assert!(scope.expired().is_none());
    }

    #[test]
    fn test_cancelled_token_expires_scope() {
        let token = CancellationToken::new();
        let scope = ShutdownScope::new().with_token(token.clone());
        token.cancel();
        assert!(matches!(scope.expired(), Some(DispatchError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_deadline_error() {
        let workers = Flag::default();
        let notify = tokio::sync::Notify::new();
        let scope = ShutdownScope::new().with_timeout(Duration::from_secs(1));

        let started = Instant::now();
        let res = wait_stopped(&workers, &notify, &scope, BackoffPolicy::poll()).await;

        assert!(matches!(res, Err(DispatchError::DeadlineExceeded)));
        assert!(started.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_signal_wakes_wait_early() {
        let workers = std::sync::Arc::new(Flag::default());
        let notify = std::sync::Arc::new(tokio::sync::Notify::new());

        let (w, n) = (workers.clone(), notify.clone());
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(10)).await;
            w.stopped.store(true, Ordering::SeqCst);
            n.notify_waiters();
        });

        let started = Instant::now();
        let res = wait_stopped(
            workers.as_ref(),
            &notify,
            &ShutdownScope::new(),
            BackoffPolicy::poll(),
        )
        .await;

        assert!(res.is_ok());
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
