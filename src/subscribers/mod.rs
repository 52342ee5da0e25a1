//! Event subscribers.
//!
//! - [`Subscribe`] trait implemented by user observers (metrics, audit, logs)
//! - [`SubscriberSet`] fan-out with per-subscriber queues and panic isolation
//! - `LogWriter` (feature `logging`) renders events via `tracing`

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
