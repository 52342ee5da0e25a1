//! # Pool strategy: a fixed set of persistent workers.
//!
//! `start` spawns N workers that share one [`Wakeup`] channel of capacity N. Every
//! worker drains the queue in a tight loop after a wake-up and re-arms a wake-up
//! for a sibling after each dequeue, so idle workers join in while work remains.
//!
//! ```text
//! notify() ──► [wakeup (cap N)] ──► worker 0 ─► dequeue ─► run ─► dequeue ... ─► Empty ─► Idle
//!                     ▲                │
//!                     └─── notify() ◄──┘ (one per dequeue)
//! ```

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::runner;
use super::strategy::{Env, Flow, Wakeup, Workers, persistent_loop};
use super::worker::{Worker, WorkerStatus};

pub(crate) struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    env: Arc<Env>,
    size: usize,
    wake: Wakeup,
    workers: OnceLock<Vec<Arc<Worker>>>,
}

impl Pool {
    pub(crate) fn new(env: Arc<Env>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                env,
                size,
                wake: Wakeup::new(size),
                workers: OnceLock::new(),
            }),
        }
    }
}

impl PoolInner {
    async fn work(
        self: Arc<Self>,
        worker: Arc<Worker>,
        runtime: CancellationToken,
        ready: mpsc::Sender<u64>,
    ) {
        let id = worker.id();
        let (env, ctx) = (Arc::clone(&self.env), runtime.clone());
        persistent_loop(&self.env, &self.wake, &worker, &runtime, ready, |pending| {
            let (env, ctx) = (Arc::clone(&env), ctx.clone());
            async move {
                runner::run(&env, &ctx, id, pending).await;
                Flow::Idle
            }
        })
        .await;
    }
}

#[async_trait]
impl Workers for Pool {
    fn notify(&self) -> bool {
        self.inner.wake.notify()
    }

    async fn start(&self, runtime: CancellationToken) {
        let workers: Vec<Arc<Worker>> = (0..self.inner.size as u64)
            .map(|id| Arc::new(Worker::new(id, CancellationToken::new())))
            .collect();
        if self.inner.workers.set(workers.clone()).is_err() {
            return;
        }

        let (ready_tx, mut ready_rx) = mpsc::channel(self.inner.size);
        for worker in workers {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(inner.work(worker, runtime.clone(), ready_tx.clone()));
        }
        drop(ready_tx);

        let mut ready = 0;
        while ready < self.inner.size && ready_rx.recv().await.is_some() {
            ready += 1;
        }
        tracing::debug!(workers = ready, "pool started");
    }

    fn stop(&self) {
        for worker in self.inner.workers.get().into_iter().flatten() {
            worker.stop();
        }
    }

    fn all_stopped(&self) -> bool {
        self.inner
            .workers
            .get()
            .into_iter()
            .flatten()
            .all(|w| w.is(WorkerStatus::Stopped))
    }

    fn snapshot(&self) -> Vec<(u64, WorkerStatus)> {
        self.inner
            .workers
            .get()
            .into_iter()
            .flatten()
            .map(|w| (w.id(), w.status()))
            .collect()
    }
}
