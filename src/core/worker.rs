//! # Worker: one execution slot.
//!
//! A [`Worker`] is owned by a worker-management strategy. Its status is an atomic
//! cell written only by the worker's own tokio task; the strategy may only trigger
//! its `stop` token.
//!
//! ```text
//! pool:     Registered ──► Idle ◄──► Live ──► Stopped
//! spawner:  Registered ──────────► Live ──► Stopped
//!                 └─────────────────────────► Stopped   (stop fired before start)
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

/// Observable lifecycle status of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerStatus {
    /// Created, not yet accepting wake-ups.
    Registered = 0,
    /// Waiting for a wake-up.
    Idle = 1,
    /// Draining the queue or running a task.
    Live = 2,
    /// Exited permanently.
    Stopped = 3,
}

impl WorkerStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerStatus::Registered,
            1 => WorkerStatus::Idle,
            2 => WorkerStatus::Live,
            _ => WorkerStatus::Stopped,
        }
    }
}

/// One execution slot with an observable status and a stop trigger.
#[derive(Debug)]
pub(crate) struct Worker {
    id: u64,
    status: AtomicU8,
    stop: CancellationToken,
}

impl Worker {
    pub(crate) fn new(id: u64, stop: CancellationToken) -> Self {
        Self {
            id,
            status: AtomicU8::new(WorkerStatus::Registered as u8),
            stop,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn is(&self, status: WorkerStatus) -> bool {
        self.status() == status
    }

    pub(crate) fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Token fired when this worker must leave its loop.
    pub(crate) fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    pub(crate) fn stop(&self) {
        self.stop.cancel();
    }
}
