//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the engine,
//! its workers and the subscriber machinery publish without blocking.
//!
//! ```text
//! Publishers (many):                 Subscriber (one):
//!   Engine   ──┐
//!   Worker 1 ──┼──────► Bus ───────► listener ────► SubscriberSet
//!   Worker N ──┘  (broadcast chan)  (spawned by Engine::start)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)` and skip `n` events.
//! - **No persistence**: events published with no receiver are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_events_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::TaskEnqueued));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::TaskDone).with_task_id(3));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskDone);
        assert_eq!(ev.task_id, Some(3));
    }
}
