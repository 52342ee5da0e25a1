//! # Worker-management strategies: the shared plumbing.
//!
//! Both strategies ([`Pool`](super::pool::Pool) and [`Spawner`](super::spawner::Spawner))
//! implement [`Workers`] and share an [`Env`]: queue, bus, hooks, the stop mode and the
//! "a worker stopped" signal used by the shutdown wait loop.
//!
//! Persistent workers (pool workers and spawner dispatchers) run [`persistent_loop`]:
//!
//! ```text
//!   Registered ─► Idle ─► ready ─► notify()
//!                  │
//!        ┌─────────┴──────────────────────────┐
//!        ▼                                    ▼
//!   stop fired                           wake-up received
//!   ├─ Drain   ─► Live ─► drain ─► exit    Live ─► drain ─┬─ Empty ─► Idle (loop)
//!   └─ Abandon ─────────────────► exit                    └─ Halt  ─► exit
//!
//!   drain: dequeue ─► notify() sibling ─► handle(pending) ─► dequeue ...
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio_util::sync::CancellationToken;

use super::worker::{Worker, WorkerStatus};
use crate::config::{EngineConfig, Strategy};
use crate::error::{QueueError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::queue::{Pending, Queue, TaskId};
use crate::tasks::TaskRef;

/// Called with `(runtime token, worker id, error)` on a non-empty dequeue error.
pub type DequeueErrorHook = Arc<dyn Fn(&CancellationToken, u64, &QueueError) + Send + Sync>;
/// Called with `(task id, task)` after a task and its own hooks succeeded.
pub type TaskDoneHook = Arc<dyn Fn(TaskId, &TaskRef) + Send + Sync>;
/// Called with `(task id, task, error)` after a task failed and `on_failure` ran.
pub type TaskFailedHook = Arc<dyn Fn(TaskId, &TaskRef, &TaskError) + Send + Sync>;

/// Engine-level callbacks, each optional.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) on_dequeue_error: Option<DequeueErrorHook>,
    pub(crate) on_task_done: Option<TaskDoneHook>,
    pub(crate) on_task_failed: Option<TaskFailedHook>,
}

/// How workers leave once their stop token fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum StopMode {
    /// Still accepting work.
    Run = 0,
    /// Drain the queue to empty, then stop.
    Drain = 1,
    /// Stop after the current task; leave queued tasks behind.
    Abandon = 2,
}

impl StopMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            StopMode::Run => "run",
            StopMode::Drain => "wait",
            StopMode::Abandon => "now",
        }
    }
}

/// What a worker does after draining.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Go back to idle and wait for the next wake-up.
    Idle,
    /// Leave the loop permanently.
    Halt,
}

/// State shared by the engine and every worker of its strategy.
pub(crate) struct Env {
    pub(crate) queue: Arc<dyn Queue>,
    pub(crate) bus: Bus,
    pub(crate) hooks: Hooks,
    mode: AtomicU8,
    stopped: Notify,
}

impl Env {
    pub(crate) fn new(queue: Arc<dyn Queue>, bus: Bus, hooks: Hooks) -> Self {
        Self {
            queue,
            bus,
            hooks,
            mode: AtomicU8::new(StopMode::Run as u8),
            stopped: Notify::new(),
        }
    }

    pub(crate) fn mode(&self) -> StopMode {
        match self.mode.load(Ordering::Acquire) {
            0 => StopMode::Run,
            1 => StopMode::Drain,
            _ => StopMode::Abandon,
        }
    }

    /// Switches the stop mode. `Abandon` is sticky.
    pub(crate) fn set_mode(&self, mode: StopMode) {
        let _ = self
            .mode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur != StopMode::Abandon as u8).then_some(mode as u8)
            });
    }

    pub(crate) fn abandoned(&self) -> bool {
        self.mode() == StopMode::Abandon
    }

    /// Signal fired every time a worker reaches `Stopped`.
    pub(crate) fn stopped_signal(&self) -> &Notify {
        &self.stopped
    }

    /// Marks `worker` stopped and wakes the shutdown wait loop.
    pub(crate) fn worker_stopped(&self, worker: &Worker) {
        worker.set_status(WorkerStatus::Stopped);
        self.bus
            .publish(Event::new(EventKind::WorkerStopped).with_worker(worker.id()));
        self.stopped.notify_waiters();
    }

    /// Reports a non-empty dequeue error and decides whether the worker survives it.
    pub(crate) fn dequeue_failed(
        &self,
        runtime: &CancellationToken,
        worker: u64,
        err: &QueueError,
    ) -> Flow {
        self.bus.publish(
            Event::new(EventKind::DequeueFailed)
                .with_worker(worker)
                .with_reason(err.to_string()),
        );
        match &self.hooks.on_dequeue_error {
            Some(hook) => {
                hook(runtime, worker, err);
                Flow::Idle
            }
            None => {
                tracing::warn!(worker, error = %err, "dequeue failed, stopping worker");
                Flow::Halt
            }
        }
    }
}

/// Non-blocking wake-up channel shared by the persistent workers of a strategy.
///
/// The buffer holds at most one pending wake-up per worker; surplus signals are dropped.
pub(crate) struct Wakeup {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
}

impl Wakeup {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Returns `false` when the signal was dropped (buffer already full).
    pub(crate) fn notify(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }

    async fn wait(&self) -> bool {
        self.rx.lock().await.recv().await.is_some()
    }
}

/// Capability set of a worker-management strategy.
#[async_trait]
pub(crate) trait Workers: Send + Sync + 'static {
    /// Signals that work is pending. Best-effort and non-blocking.
    fn notify(&self) -> bool;

    /// Starts the workers and returns once all of them left `Registered`.
    async fn start(&self, runtime: CancellationToken);

    /// Fires the stop token of every persistent worker.
    fn stop(&self);

    /// True once every worker known to the strategy is `Stopped`.
    fn all_stopped(&self) -> bool;

    /// `(worker id, status)` for every worker known to the strategy.
    fn snapshot(&self) -> Vec<(u64, WorkerStatus)>;
}

/// Builds the strategy selected by `cfg`.
pub(crate) fn build(cfg: &EngineConfig, env: Arc<Env>) -> Arc<dyn Workers> {
    match cfg.strategy {
        Strategy::Pool => Arc::new(super::pool::Pool::new(env, cfg.pool_size())),
        Strategy::Spawner => Arc::new(super::spawner::Spawner::new(env, cfg.spawn_limit())),
    }
}

/// Main loop of a persistent worker. `handle` executes (or hands off) one dequeued task.
pub(crate) async fn persistent_loop<F, Fut>(
    env: &Env,
    wake: &Wakeup,
    worker: &Worker,
    runtime: &CancellationToken,
    ready: mpsc::Sender<u64>,
    mut handle: F,
) where
    F: FnMut(Pending) -> Fut,
    Fut: Future<Output = Flow>,
{
    worker.set_status(WorkerStatus::Idle);
    env.bus
        .publish(Event::new(EventKind::WorkerStarted).with_worker(worker.id()));
    let _ = ready.send(worker.id()).await;
    drop(ready);

    // tasks enqueued before start have no wake-up of their own
    wake.notify();

    loop {
        let woke = tokio::select! {
            biased;
            _ = worker.stop_token().cancelled() => false,
            got = wake.wait() => got,
        };

        if !woke {
            if env.mode() == StopMode::Drain {
                worker.set_status(WorkerStatus::Live);
                drain(env, wake, worker, runtime, &mut handle).await;
            }
            break;
        }

        worker.set_status(WorkerStatus::Live);
        if drain(env, wake, worker, runtime, &mut handle).await == Flow::Halt {
            break;
        }
        worker.set_status(WorkerStatus::Idle);
    }

    env.worker_stopped(worker);
}

async fn drain<F, Fut>(
    env: &Env,
    wake: &Wakeup,
    worker: &Worker,
    runtime: &CancellationToken,
    handle: &mut F,
) -> Flow
where
    F: FnMut(Pending) -> Fut,
    Fut: Future<Output = Flow>,
{
    loop {
        if env.abandoned() {
            return Flow::Halt;
        }
        match env.queue.dequeue(runtime).await {
            Ok(pending) => {
                wake.notify();
                if handle(pending).await == Flow::Halt {
                    return Flow::Halt;
                }
            }
            Err(e) if e.is_empty() => return Flow::Idle,
            Err(e) => return env.dequeue_failed(runtime, worker.id(), &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;

    fn env() -> Env {
        Env::new(Arc::new(MemoryQueue::new()), Bus::new(8), Hooks::default())
    }

    #[test]
    fn test_abandon_is_sticky() {
        let env = env();
        env.set_mode(StopMode::Drain);
        assert_eq!(env.mode(), StopMode::Drain);
        env.set_mode(StopMode::Abandon);
        env.set_mode(StopMode::Drain);
        assert!(env.abandoned());
    }

    #[test]
    fn test_wakeup_drops_surplus_signals() {
        let wake = Wakeup::new(2);
        assert!(wake.notify());
        assert!(wake.notify());
        assert!(!wake.notify());
    }

    #[test]
    fn test_dequeue_error_without_hook_halts() {
        let env = env();
        let flow = env.dequeue_failed(&CancellationToken::new(), 0, &QueueError::Closed);
        assert_eq!(flow, Flow::Halt);
    }

    #[test]
    fn test_dequeue_error_with_hook_goes_idle() {
        let mut env = env();
        let seen = Arc::new(std::sync::atomic::AtomicU64::new(u64::MAX));
        let s = Arc::clone(&seen);
        env.hooks.on_dequeue_error = Some(Arc::new(
            move |_ctx: &CancellationToken, worker: u64, _err: &QueueError| {
                s.store(worker, Ordering::SeqCst);
            },
        ));

        let flow = env.dequeue_failed(&CancellationToken::new(), 3, &QueueError::Closed);
        assert_eq!(flow, Flow::Idle);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
