//! Delay policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized wake-ups
//!
//! ## Wiring
//! ```text
//! EngineConfig { poll: BackoffPolicy }  ──► shutdown loop: sleep(poll.next(n)) between status checks
//! Retry::with_backoff(BackoffPolicy)     ──► sleep(backoff.next(n)) between attempts
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
