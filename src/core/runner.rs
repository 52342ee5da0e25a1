//! # Run a single dequeued task.
//!
//! Executes one [`Pending`] task on behalf of a worker and publishes its lifecycle.
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   publish TaskStarting → task.spawn() → Ok(())  → task.on_success → on_task_done   → publish TaskDone
//!
//! Failure:
//!   publish TaskStarting → task.spawn() → Err(e)  → task.on_failure → on_task_failed → publish TaskFailed
//!
//! Panic:
//!   publish TaskStarting → task.spawn() → panic   → Err(Panicked)   → (failure path)
//! ```
//!
//! ## Rules
//! - Exactly one of `on_success` / `on_failure` runs, once, after the body.
//! - Always publishes **exactly one** terminal event: `TaskDone` or `TaskFailed`.
//! - Derives a **child token** of the runtime token per task.
//! - A panicking body or hook never takes the worker down with it.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::strategy::Env;
use crate::{
    error::TaskError,
    events::{Event, EventKind},
    queue::Pending,
    subscribers::panic_message,
};

/// Executes `pending` on worker `worker`, then runs hooks and publishes the outcome.
pub(crate) async fn run(env: &Env, runtime: &CancellationToken, worker: u64, pending: Pending) {
    let Pending { id, task } = pending;
    let child = runtime.child_token();

    env.bus.publish(
        Event::new(EventKind::TaskStarting)
            .with_task_id(id)
            .with_task(task.name())
            .with_worker(worker),
    );

    let body = AssertUnwindSafe(async { task.spawn(child.clone()).await });
    let res = match body.catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(TaskError::Panicked {
            info: panic_message(payload.as_ref()),
        }),
    };

    match res {
        Ok(()) => {
            guarded(task.name(), || task.on_success(&child));
            if let Some(hook) = &env.hooks.on_task_done {
                guarded(task.name(), || hook(id, &task));
            }
            env.bus.publish(
                Event::new(EventKind::TaskDone)
                    .with_task_id(id)
                    .with_task(task.name())
                    .with_worker(worker),
            );
        }
        Err(err) => {
            guarded(task.name(), || task.on_failure(&child, &err));
            if let Some(hook) = &env.hooks.on_task_failed {
                guarded(task.name(), || hook(id, &task, &err));
            }
            env.bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task_id(id)
                    .with_task(task.name())
                    .with_worker(worker)
                    .with_reason(err.to_string()),
            );
        }
    }
}

/// Runs a synchronous hook, logging instead of unwinding on panic.
fn guarded(task: &str, hook: impl FnOnce()) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(hook)) {
        let info = panic_message(payload.as_ref());
        tracing::warn!(task, %info, "task hook panicked");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::core::strategy::Hooks;
    use crate::events::Bus;
    use crate::queue::{MemoryQueue, TaskId};
    use crate::tasks::{TaskFn, TaskRef};

    fn env_with(hooks: Hooks) -> (Env, Bus) {
        let bus = Bus::new(16);
        (
            Env::new(Arc::new(MemoryQueue::new()), bus.clone(), hooks),
            bus,
        )
    }

    #[tokio::test]
    async fn test_success_runs_hooks_then_publishes_done() {
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        let hooks = Hooks {
            on_task_done: Some(Arc::new(move |id: TaskId, _task: &TaskRef| {
                d.store(id as usize, Ordering::SeqCst);
            })),
            ..Hooks::default()
        };
        let (env, bus) = env_with(hooks);
        let mut rx = bus.subscribe();

        let own = Arc::new(AtomicUsize::new(0));
        let o = Arc::clone(&own);
        let task: TaskRef = Arc::new(
            TaskFn::new("ok", |_ctx: CancellationToken| async { Ok::<(), TaskError>(()) })
                .with_on_success(move |_ctx| {
                    o.fetch_add(1, Ordering::SeqCst);
                }),
        );

        run(&env, &CancellationToken::new(), 0, Pending { id: 9, task }).await;

        assert_eq!(own.load(Ordering::SeqCst), 1);
        assert_eq!(done.load(Ordering::SeqCst), 9);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskStarting);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskDone);
        assert_eq!(ev.task_id, Some(9));
        assert_eq!(ev.worker, Some(0));
    }

    #[tokio::test]
    async fn test_panicking_body_is_reported_as_failure() {
        let failed = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&failed);
        let hooks = Hooks {
            on_task_failed: Some(Arc::new(
                move |_id: TaskId, _task: &TaskRef, err: &TaskError| {
                    assert!(matches!(err, TaskError::Panicked { .. }));
                    f.fetch_add(1, Ordering::SeqCst);
                },
            )),
            ..Hooks::default()
        };
        let (env, bus) = env_with(hooks);
        let mut rx = bus.subscribe();

        let task: TaskRef = TaskFn::arc("boom", |_ctx: CancellationToken| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), TaskError>(())
        });

        run(&env, &CancellationToken::new(), 1, Pending { id: 1, task }).await;

        assert_eq!(failed.load(Ordering::SeqCst), 1);
        let _starting = rx.recv().await.unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskFailed);
        assert!(ev.reason.as_deref().unwrap_or_default().contains("kaboom"));
    }
}
