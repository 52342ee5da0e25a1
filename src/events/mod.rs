//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine` (enqueue, shutdown), pool and spawner workers,
//!   `runner::run`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the listener spawned by `Engine::start`, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
