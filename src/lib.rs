//! # taskdispatch
//!
//! **taskdispatch** is an in-process task-dispatch engine for tokio.
//!
//! Callers submit units of work ("tasks"); a pool of workers executes them
//! asynchronously. The engine enforces admission rules, tracks per-task lifecycle
//! and offers a cancellable shutdown that either drains queued work or abandons it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ──► Engine::enqueue(task)
//!                 │
//!                 ├─► Queue::enqueue ──► id        (MemoryQueue | BoundedQueue | custom)
//!                 ├─► Bus.publish(TaskEnqueued)
//!                 └─► Workers::notify()            (non-blocking wake-up)
//!                          │
//!        ┌─────────────────┴─────────────────┐
//!        ▼                                   ▼
//!  ┌────────────────────┐          ┌──────────────────────────┐
//!  │ Pool               │          │ Spawner                  │
//!  │ N persistent       │          │ 2 dispatchers            │
//!  │ workers            │          │   └─► fresh worker/task  │
//!  └─────────┬──────────┘          │       (optional ceiling) │
//!            │                     └────────────┬─────────────┘
//!            └───────────────┬──────────────────┘
//!                            ▼
//!            Queue::dequeue ─► run task ─► on_success | on_failure
//!                            │               └─► on_task_done | on_task_failed
//!                            ▼
//!  ┌───────────────────────────────────────────────────────────────┐
//!  │                 Bus (broadcast channel)                       │
//!  └───────────────────────────────┬───────────────────────────────┘
//!                                  ▼
//!                         listener (Engine::start)
//!                                  ▼
//!                            SubscriberSet
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                    sub1.on   sub2.on   subN.on
//!                    _event()  _event()  _event()
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! pool worker:     Registered ─► Idle ─► (wake-up) ─► Live ─► drain ─► Idle ...
//!                                  └─► (stop) ─► [drain if graceful] ─► Stopped
//!
//! spawned worker:  Registered ─► Live ─► run one task ─► Stopped
//!                      └─► (fast shutdown before start) ─► Stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Dispatch**      | Admission, start-up and graceful or fast shutdown.           | [`Engine`], [`EngineBuilder`], [`ShutdownScope`] |
//! | **Tasks**         | Tasks as closures, with optional hooks and retries.          | [`Task`], [`TaskRef`], [`TaskFn`], [`Retry`] |
//! | **Queues**        | Pluggable FIFO storage with an explicit "empty" signal.      | [`Queue`], [`MemoryQueue`], [`BoundedQueue`] |
//! | **Combinators**   | Lookup by ID and "all submitted work finished" barrier.      | [`TaskRegistry`], [`WaitGroup`]             |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, audit).        | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Policies**      | Delay policies for shutdown polling and retry backoff.       | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Errors**        | Typed errors for dispatch, queues and task execution.        | [`DispatchError`], [`QueueError`], [`TaskError`] |
//! | **Configuration** | Centralize engine settings.                                  | [`EngineConfig`], [`Strategy`]              |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber rendering events via `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use taskdispatch::{Engine, EngineConfig, Retry, ShutdownScope, Strategy, TaskFn, TaskRef, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskdispatch::Subscribe>> = vec![Arc::new(taskdispatch::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskdispatch::Subscribe>> = Vec::new();
//!
//!     let engine = Engine::builder(EngineConfig::pool(4))
//!         .with_strategy(Strategy::Spawner)
//!         .with_subscribers(subs)
//!         .build();
//!     engine.start().await?;
//!
//!     let fetch: TaskRef = TaskFn::arc("fetch", |ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() {
//!             return Err(TaskError::Canceled);
//!         }
//!         Ok(())
//!     });
//!     engine.enqueue(Retry::arc(fetch, 3) as TaskRef).await?;
//!
//!     engine
//!         .shutdown(ShutdownScope::new().with_wait().with_timeout(Duration::from_secs(5)))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod queue;
mod registry;
mod subscribers;
mod tasks;
mod wait_group;

// ---- Public re-exports ----

pub use config::{EngineConfig, Strategy};
pub use core::{
    DequeueErrorHook, Engine, EngineBuilder, ShutdownScope, TaskDoneHook, TaskFailedHook,
    WorkerStatus,
};
pub use error::{DispatchError, QueueError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use queue::{BoundedQueue, MemoryQueue, Pending, Queue, TaskId};
pub use registry::{Entry, TaskRegistry, TaskStatus};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Retry, Task, TaskFn, TaskRef};
pub use wait_group::WaitGroup;

// Optional: expose a simple built-in logger subscriber.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
