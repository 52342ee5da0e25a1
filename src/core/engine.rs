//! # Engine: admission, start-up and the shutdown protocol.
//!
//! The [`Engine`] owns the queue, the event bus and the selected worker-management
//! strategy. It never touches worker state directly; it only signals the strategy.
//!
//! ## State machine
//! ```text
//! running:    not-started ──start()──► running
//! lifecycle:  Open ──shutdown()──► Closing ──(stopped | deadline | cancel)──► Closed
//! ```
//!
//! ## Admission
//! ```text
//! enqueue(task)
//!   ├─ None                 ─► Err(NilTask)
//!   ├─ lifecycle != Open    ─► Err(Closed)
//!   └─ queue.enqueue(task)  ─► id ─► publish TaskEnqueued ─► strategy.notify() ─► Ok(id)
//! ```
//!
//! ## Shutdown
//! ```text
//! shutdown(scope)
//!   ├─ CAS Open → Closing (else AlreadyClosing / Closed)
//!   ├─ publish ShutdownRequested("wait" | "now")
//!   ├─ scope.waits() ? mode = Drain : (mode = Abandon, cancel runtime token)
//!   ├─ strategy.stop()
//!   └─ wait_stopped(scope)
//!        ├─ Ok            ─► publish AllStopped
//!        └─ Err(deadline) ─► escalate to Abandon, publish ShutdownAborted, return Err
//! ```
//!
//! Tasks enqueued before [`Engine::start`] wait in the queue and are drained once
//! the workers come up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::EngineBuilder;
use super::shutdown::{self, ShutdownScope};
use super::strategy::{Env, StopMode, Workers};
use super::worker::WorkerStatus;
use crate::config::EngineConfig;
use crate::error::DispatchError;
use crate::events::{Bus, Event, EventKind};
use crate::queue::{Queue, TaskId};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::TaskRef;

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// In-process task-dispatch engine.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use taskdispatch::{Engine, ShutdownScope, TaskFn, TaskRef, TaskError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = Engine::new(2);
///     engine.start().await?;
///
///     let hello: TaskRef = TaskFn::arc("hello", |_ctx: CancellationToken| async {
///         println!("hello from a worker");
///         Ok::<(), TaskError>(())
///     });
///     let id = engine.enqueue(hello).await?;
///     assert_eq!(id, 1);
///
///     engine
///         .shutdown(ShutdownScope::new().with_wait().with_timeout(Duration::from_secs(5)))
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Engine {
    cfg: EngineConfig,
    env: Arc<Env>,
    workers: Arc<dyn Workers>,
    lifecycle: AtomicU8,
    control: Mutex<Control>,
}

/// Start/shutdown state, serialized behind one lock.
struct Control {
    subscribers: Vec<Arc<dyn Subscribe>>,
    running: Option<Running>,
}

struct Running {
    runtime: CancellationToken,
    listener: Option<Listener>,
}

struct Listener {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Listener {
    /// Waits for subscribers to catch up, but no longer than `scope` allows.
    async fn flush(mut self, scope: &ShutdownScope) {
        tokio::select! {
            _ = &mut self.handle => {}
            err = scope.done() => {
                tracing::warn!(error = %err, "subscribers still busy at shutdown, detaching them");
                self.handle.abort();
            }
        }
    }
}

impl Engine {
    /// Pool engine with `concurrency` workers over an in-memory queue.
    ///
    /// `0` means one worker per available CPU.
    pub fn new(concurrency: usize) -> Self {
        EngineBuilder::new(EngineConfig::pool(concurrency)).build()
    }

    /// Pool engine with `concurrency` workers over a caller-supplied queue.
    pub fn with_queue(concurrency: usize, queue: Arc<dyn Queue>) -> Self {
        EngineBuilder::new(EngineConfig::pool(concurrency))
            .with_queue(queue)
            .build()
    }

    /// Starts a builder with the given configuration.
    pub fn builder(cfg: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: EngineConfig,
        env: Arc<Env>,
        workers: Arc<dyn Workers>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            cfg,
            env,
            workers,
            lifecycle: AtomicU8::new(OPEN),
            control: Mutex::new(Control {
                subscribers,
                running: None,
            }),
        }
    }

    /// Submits `task` with a background (never cancelled) admission token.
    ///
    /// See [`Engine::enqueue_with`].
    pub async fn enqueue(&self, task: impl Into<Option<TaskRef>>) -> Result<TaskId, DispatchError> {
        self.enqueue_with(&CancellationToken::new(), task).await
    }

    /// Submits `task` and returns its ID.
    ///
    /// `ctx` bounds how long a backpressured queue may keep the caller waiting.
    ///
    /// ### Errors
    /// - [`DispatchError::NilTask`] when `task` is `None` (the queue is not touched);
    /// - [`DispatchError::Closed`] once shutdown has started;
    /// - [`DispatchError::Queue`] when the backing queue rejects the task.
    pub async fn enqueue_with(
        &self,
        ctx: &CancellationToken,
        task: impl Into<Option<TaskRef>>,
    ) -> Result<TaskId, DispatchError> {
        let Some(task) = task.into() else {
            return Err(DispatchError::NilTask);
        };
        if self.lifecycle.load(Ordering::Acquire) != OPEN {
            return Err(DispatchError::Closed);
        }

        let name: Arc<str> = Arc::from(task.name());
        let id = self.env.queue.enqueue(ctx, task).await?;

        self.env.bus.publish(
            Event::new(EventKind::TaskEnqueued)
                .with_task_id(id)
                .with_task(name),
        );
        self.workers.notify();
        Ok(id)
    }

    /// Starts the workers; returns once every worker is ready for wake-ups.
    ///
    /// Subscribers registered on the builder start receiving events from here on.
    pub async fn start(&self) -> Result<(), DispatchError> {
        let mut control = self.control.lock().await;
        if self.lifecycle.load(Ordering::Acquire) != OPEN {
            return Err(DispatchError::Closed);
        }
        if control.running.is_some() {
            return Err(DispatchError::AlreadyRunning);
        }

        let subscribers = std::mem::take(&mut control.subscribers);
        let listener = (!subscribers.is_empty()).then(|| self.spawn_listener(subscribers));

        let runtime = CancellationToken::new();
        self.workers.start(runtime.clone()).await;
        control.running = Some(Running { runtime, listener });

        tracing::debug!(
            strategy = ?self.cfg.strategy,
            concurrency = self.cfg.concurrency,
            "engine started"
        );
        Ok(())
    }

    /// Stops the engine according to `scope`.
    ///
    /// No task is admitted once this is called. With [`ShutdownScope::with_wait`] every
    /// queued task still runs; otherwise queued tasks are abandoned and running tasks
    /// see their token cancelled. If the scope expires first, the shutdown escalates to
    /// abandoning and its error is returned.
    ///
    /// ### Errors
    /// - [`DispatchError::AlreadyClosing`] while another shutdown is in progress;
    /// - [`DispatchError::Closed`] after a completed shutdown;
    /// - [`DispatchError::DeadlineExceeded`] / [`DispatchError::Canceled`] from `scope`.
    pub async fn shutdown(&self, scope: ShutdownScope) -> Result<(), DispatchError> {
        if let Err(state) =
            self.lifecycle
                .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(match state {
                CLOSING => DispatchError::AlreadyClosing,
                _ => DispatchError::Closed,
            });
        }

        let mode = if scope.waits() {
            StopMode::Drain
        } else {
            StopMode::Abandon
        };
        self.env
            .bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(mode.as_str()));

        let mut control = self.control.lock().await;
        let Some(running) = control.running.take() else {
            self.lifecycle.store(CLOSED, Ordering::Release);
            self.discard_queued().await;
            return Ok(());
        };

        self.env.set_mode(mode);
        if mode == StopMode::Abandon {
            running.runtime.cancel();
        }
        self.workers.stop();

        let res = shutdown::wait_stopped(
            self.workers.as_ref(),
            self.env.stopped_signal(),
            &scope,
            self.cfg.poll,
        )
        .await;

        match &res {
            Ok(()) => {
                self.env.bus.publish(Event::new(EventKind::AllStopped));
            }
            Err(err) => {
                self.env.set_mode(StopMode::Abandon);
                running.runtime.cancel();
                tracing::warn!(error = %err, "shutdown aborted, abandoning remaining work");
                self.env
                    .bus
                    .publish(Event::new(EventKind::ShutdownAborted).with_reason(err.as_label()));
            }
        }
        self.lifecycle.store(CLOSED, Ordering::Release);
        if self.env.abandoned() {
            self.discard_queued().await;
        }

        if let Some(listener) = running.listener {
            listener.stop.cancel();
            if res.is_ok() {
                listener.flush(&scope).await;
            }
        }
        res
    }

    /// Drops every task left in the queue once no worker will pick it up.
    async fn discard_queued(&self) {
        let ctx = CancellationToken::new();
        let mut dropped = 0usize;
        while self.env.queue.dequeue(&ctx).await.is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded queued tasks");
        }
    }

    /// Fast shutdown without deadline: queued tasks are abandoned.
    pub async fn close(&self) -> Result<(), DispatchError> {
        self.shutdown(ShutdownScope::new()).await
    }

    /// `(worker id, status)` of every worker the strategy currently knows.
    pub fn workers(&self) -> Vec<(u64, WorkerStatus)> {
        self.workers.snapshot()
    }

    /// True once shutdown has started.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) != OPEN
    }

    /// Event bus of this engine.
    pub fn bus(&self) -> &Bus {
        &self.env.bus
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Forwards bus events to a [`SubscriberSet`] until `stop` fires.
    fn spawn_listener(&self, subscribers: Vec<Arc<dyn Subscribe>>) -> Listener {
        let mut rx = self.env.bus.subscribe();
        let set = SubscriberSet::new(subscribers, self.env.bus.clone());
        let stop = CancellationToken::new();
        let token = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });

        Listener { stop, handle }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if let Some(running) = control.running.take() {
            self.env.set_mode(StopMode::Abandon);
            running.runtime.cancel();
            self.workers.stop();
            if let Some(listener) = running.listener {
                listener.stop.cancel();
            }
        }
    }
}
