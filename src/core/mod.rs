//! Runtime core: dispatch and worker lifecycle.
//!
//! The public API of this module is [`Engine`] (with [`EngineBuilder`]),
//! [`ShutdownScope`] and [`WorkerStatus`].
//!
//! Internal modules:
//! - [`engine`]: admission, start-up and the shutdown protocol;
//! - [`strategy`]: the `Workers` capability set and the persistent worker loop;
//! - [`pool`]: fixed set of persistent workers;
//! - [`spawner`]: one fresh worker per task, optionally capped;
//! - [`runner`]: executes one task, runs hooks and publishes its outcome;
//! - [`shutdown`]: shutdown scope and the wait-until-stopped loop;
//! - [`worker`]: one execution slot with an atomic status.

mod builder;
mod engine;
mod pool;
mod runner;
mod shutdown;
mod spawner;
mod strategy;
mod worker;

pub use builder::EngineBuilder;
pub use engine::Engine;
pub use shutdown::ShutdownScope;
pub use strategy::{DequeueErrorHook, TaskDoneHook, TaskFailedHook};
pub use worker::WorkerStatus;
