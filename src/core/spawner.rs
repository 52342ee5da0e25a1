//! # Spawner strategy: a fresh worker per task.
//!
//! Two persistent dispatchers drain the queue exactly like pool workers, but instead
//! of running a task themselves they hand it to a newly spawned worker. An optional
//! semaphore caps how many spawned workers run at once; a dispatcher waits for a
//! free slot before spawning.
//!
//! ```text
//! notify() ──► [wakeup] ──► dispatcher ─► dequeue ─► acquire slot ─► spawn worker #k
//!                                                                     Registered
//!                                                                        │ stop fired? ──► Stopped
//!                                                                        ▼
//!                                                                      Live ─► run ─► Stopped
//! ```
//!
//! Shutdown is complete once both dispatchers are stopped and no spawned worker remains.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use super::runner;
use super::strategy::{Env, Flow, Wakeup, Workers, persistent_loop};
use super::worker::{Worker, WorkerStatus};
use crate::events::{Event, EventKind};
use crate::queue::Pending;

/// Number of persistent dispatchers.
const DISPATCHERS: u64 = 2;

pub(crate) struct Spawner {
    inner: Arc<SpawnerInner>,
}

struct SpawnerInner {
    env: Arc<Env>,
    limit: Option<Arc<Semaphore>>,
    wake: Wakeup,
    dispatchers: OnceLock<Vec<Arc<Worker>>>,
    spawned: Mutex<HashMap<u64, Arc<Worker>>>,
    next_id: AtomicU64,
}

impl Spawner {
    pub(crate) fn new(env: Arc<Env>, limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(SpawnerInner {
                env,
                limit: limit.map(|n| Arc::new(Semaphore::new(n.max(1)))),
                wake: Wakeup::new(DISPATCHERS as usize),
                dispatchers: OnceLock::new(),
                spawned: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(DISPATCHERS),
            }),
        }
    }
}

impl SpawnerInner {
    fn spawned(&self) -> MutexGuard<'_, HashMap<u64, Arc<Worker>>> {
        self.spawned.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn dispatch(
        self: Arc<Self>,
        worker: Arc<Worker>,
        runtime: CancellationToken,
        ready: mpsc::Sender<u64>,
    ) {
        let this = Arc::clone(&self);
        let ctx = runtime.clone();
        persistent_loop(&self.env, &self.wake, &worker, &runtime, ready, |pending| {
            let (this, ctx) = (Arc::clone(&this), ctx.clone());
            async move { this.hand_off(pending, ctx).await }
        })
        .await;
    }

    /// Waits for a free slot, then runs `pending` on a new worker.
    async fn hand_off(self: Arc<Self>, pending: Pending, runtime: CancellationToken) -> Flow {
        let permit = match &self.limit {
            Some(sem) => tokio::select! {
                biased;
                _ = runtime.cancelled() => return Flow::Halt,
                permit = Arc::clone(sem).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => return Flow::Halt,
                },
            },
            None => None,
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let worker = Arc::new(Worker::new(id, runtime.child_token()));
        self.spawned().insert(id, Arc::clone(&worker));

        tokio::spawn(self.work(worker, runtime, pending, permit));
        Flow::Idle
    }

    async fn work(
        self: Arc<Self>,
        worker: Arc<Worker>,
        runtime: CancellationToken,
        pending: Pending,
        _permit: Option<OwnedSemaphorePermit>,
    ) {
        if !worker.stop_token().is_cancelled() && !self.env.abandoned() {
            worker.set_status(WorkerStatus::Live);
            self.env
                .bus
                .publish(Event::new(EventKind::WorkerStarted).with_worker(worker.id()));
            runner::run(&self.env, &runtime, worker.id(), pending).await;
        }

        self.spawned().remove(&worker.id());
        self.env.worker_stopped(&worker);
    }
}

#[async_trait]
impl Workers for Spawner {
    fn notify(&self) -> bool {
        self.inner.wake.notify()
    }

    async fn start(&self, runtime: CancellationToken) {
        let dispatchers: Vec<Arc<Worker>> = (0..DISPATCHERS)
            .map(|id| Arc::new(Worker::new(id, CancellationToken::new())))
            .collect();
        if self.inner.dispatchers.set(dispatchers.clone()).is_err() {
            return;
        }

        let (ready_tx, mut ready_rx) = mpsc::channel(DISPATCHERS as usize);
        for worker in dispatchers {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(inner.dispatch(worker, runtime.clone(), ready_tx.clone()));
        }
        drop(ready_tx);

        while ready_rx.recv().await.is_some() {}
        tracing::debug!(
            limit = ?self.inner.limit.as_ref().map(|s| s.available_permits()),
            "spawner started"
        );
    }

    fn stop(&self) {
        for worker in self.inner.dispatchers.get().into_iter().flatten() {
            worker.stop();
        }
    }

    fn all_stopped(&self) -> bool {
        let dispatchers_done = self
            .inner
            .dispatchers
            .get()
            .into_iter()
            .flatten()
            .all(|w| w.is(WorkerStatus::Stopped));
        dispatchers_done && self.inner.spawned().is_empty()
    }

    fn snapshot(&self) -> Vec<(u64, WorkerStatus)> {
        let mut out: Vec<(u64, WorkerStatus)> = self
            .inner
            .dispatchers
            .get()
            .into_iter()
            .flatten()
            .map(|w| (w.id(), w.status()))
            .collect();
        out.extend(self.inner.spawned().values().map(|w| (w.id(), w.status())));
        out.sort_unstable_by_key(|(id, _)| *id);
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::core::strategy::{Hooks, StopMode};
    use crate::error::TaskError;
    use crate::events::Bus;
    use crate::queue::{MemoryQueue, Queue};
    use crate::tasks::{TaskFn, TaskRef};

    /// Task tracking the highest number of concurrent executions.
    fn gauge(current: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> TaskRef {
        let (cur, peak) = (Arc::clone(current), Arc::clone(peak));
        TaskFn::arc("gauge", move |_ctx: CancellationToken| {
            let (cur, peak) = (Arc::clone(&cur), Arc::clone(&peak));
            async move {
                let now = cur.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                cur.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_caps_concurrent_workers() {
        let queue = Arc::new(MemoryQueue::new());
        let (current, peak) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));
        let ctx = CancellationToken::new();
        for _ in 0..12 {
            queue.enqueue(&ctx, gauge(&current, &peak)).await.unwrap();
        }

        let env = Arc::new(Env::new(queue.clone(), Bus::new(64), Hooks::default()));
        let spawner = Spawner::new(Arc::clone(&env), Some(3));
        spawner.start(CancellationToken::new()).await;

        env.set_mode(StopMode::Drain);
        spawner.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !spawner.all_stopped() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(queue.is_empty().await);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawned_worker_ids_follow_dispatchers() {
        let env = Arc::new(Env::new(
            Arc::new(MemoryQueue::new()),
            Bus::new(8),
            Hooks::default(),
        ));
        let spawner = Spawner::new(env, None);
        spawner.start(CancellationToken::new()).await;

        let ids: Vec<u64> = spawner.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1]);
        spawner.stop();
    }

    fn flagged(ran: &Arc<AtomicUsize>) -> TaskRef {
        let ran = Arc::clone(ran);
        TaskFn::arc("flagged", move |_ctx: CancellationToken| {
            let ran = Arc::clone(&ran);
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        })
    }

    #[tokio::test]
    async fn test_hand_off_halts_when_runtime_cancelled_while_waiting_for_slot() {
        let env = Arc::new(Env::new(
            Arc::new(MemoryQueue::new()),
            Bus::new(8),
            Hooks::default(),
        ));
        let spawner = Spawner::new(env, Some(1));
        let held = spawner
            .inner
            .limit
            .as_ref()
            .map(|sem| Arc::clone(sem).try_acquire_owned().unwrap());
        assert!(held.is_some());

        let ran = Arc::new(AtomicUsize::new(0));
        let task = flagged(&ran);
        let runtime = CancellationToken::new();
        let trigger = runtime.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let pending = Pending { id: 1, task: Arc::clone(&task) };
        let flow = Arc::clone(&spawner.inner).hand_off(pending, runtime).await;

        assert_eq!(flow, Flow::Halt);
        assert!(spawner.inner.spawned().is_empty());
        assert_eq!(Arc::strong_count(&task), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_spawned_worker_skips_task_once_abandoned() {
        let env = Arc::new(Env::new(
            Arc::new(MemoryQueue::new()),
            Bus::new(8),
            Hooks::default(),
        ));
        let spawner = Spawner::new(Arc::clone(&env), None);
        let runtime = CancellationToken::new();
        let worker = Arc::new(Worker::new(DISPATCHERS, runtime.child_token()));
        spawner.inner.spawned().insert(worker.id(), Arc::clone(&worker));

        env.set_mode(StopMode::Abandon);
        let ran = Arc::new(AtomicUsize::new(0));
        let pending = Pending { id: 1, task: flagged(&ran) };
        Arc::clone(&spawner.inner)
            .work(Arc::clone(&worker), runtime, pending, None)
            .await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(worker.is(WorkerStatus::Stopped));
        assert!(spawner.inner.spawned().is_empty());
    }
}
