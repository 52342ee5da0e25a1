//! Bounded FIFO queue backed by a tokio channel, offering backpressure.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::{Pending, Queue, TaskId};
use crate::error::QueueError;
use crate::tasks::TaskRef;

/// Queue holding at most `capacity` pending tasks.
///
/// `enqueue` waits for a free slot once the bound is reached; cancelling the caller's
/// token aborts the wait with [`QueueError::Canceled`]. `dequeue` never waits.
pub struct BoundedQueue {
    last_id: AtomicU64,
    capacity: usize,
    tx: mpsc::Sender<Pending>,
    rx: Mutex<mpsc::Receiver<Pending>>,
}

impl BoundedQueue {
    /// Creates a queue with the given bound (clamped to at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            last_id: AtomicU64::new(0),
            capacity,
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Maximum number of pending tasks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl Queue for BoundedQueue {
    async fn enqueue(&self, ctx: &CancellationToken, task: TaskRef) -> Result<TaskId, QueueError> {
        let permit = tokio::select! {
            permit = self.tx.reserve() => permit.map_err(|_| QueueError::Closed)?,
            _ = ctx.cancelled() => return Err(QueueError::Canceled),
        };
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        permit.send(Pending { id, task });
        Ok(id)
    }

    async fn dequeue(&self, _ctx: &CancellationToken) -> Result<Pending, QueueError> {
        match self.rx.lock().await.try_recv() {
            Ok(pending) => Ok(pending),
            Err(mpsc::error::TryRecvError::Empty) => Err(QueueError::Empty),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(QueueError::Closed),
        }
    }
}
