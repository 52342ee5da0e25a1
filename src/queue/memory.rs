//! Unbounded FIFO queue backed by a `VecDeque`.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{Pending, Queue, TaskId};
use crate::error::QueueError;
use crate::tasks::TaskRef;

#[derive(Default)]
struct State {
    last_id: TaskId,
    items: VecDeque<Pending>,
}

/// Default queue: mutex-guarded FIFO, IDs assigned under the same lock.
///
/// Because the ID counter and the sequence share one lock, dequeue order always
/// matches ID order.
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending tasks.
    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// True if nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn enqueue(&self, _ctx: &CancellationToken, task: TaskRef) -> Result<TaskId, QueueError> {
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let id = state.last_id;
        state.items.push_back(Pending { id, task });
        Ok(id)
    }

    async fn dequeue(&self, _ctx: &CancellationToken) -> Result<Pending, QueueError> {
        self.state
            .lock()
            .await
            .items
            .pop_front()
            .ok_or(QueueError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;

    fn noop() -> TaskRef {
        TaskFn::arc("noop", |_ctx: CancellationToken| async {
            Ok::<(), TaskError>(())
        })
    }

    #[tokio::test]
    async fn test_enqueue_assigns_ascending_ids() {
        let q = MemoryQueue::new();
        let ctx = CancellationToken::new();
        let mut prev = 0;
        for _ in 0..10 {
            let id = q.enqueue(&ctx, noop()).await.unwrap();
            assert!(id > prev);
            prev = id;
        }
        assert_eq!(q.len().await, 10);
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo_then_empty() {
        let q = MemoryQueue::new();
        let ctx = CancellationToken::new();
        let a = q.enqueue(&ctx, noop()).await.unwrap();
        let b = q.enqueue(&ctx, noop()).await.unwrap();

        assert_eq!(q.dequeue(&ctx).await.unwrap().id, a);
        assert_eq!(q.dequeue(&ctx).await.unwrap().id, b);
        assert_eq!(q.dequeue(&ctx).await.unwrap_err(), QueueError::Empty);
        assert!(q.is_empty().await);
    }
}
