//! # Engine configuration.
//!
//! [`EngineConfig`] centralizes the knobs of an [`Engine`](crate::Engine):
//! worker count, worker-management strategy, event bus capacity and the
//! shutdown polling policy.
//!
//! ## Sentinel values
//! - `concurrency = 0` → number of available CPUs for [`Strategy::Pool`],
//!   no concurrency ceiling for [`Strategy::Spawner`]
//!
//! # Example
//! ```
//! use taskdispatch::{EngineConfig, Strategy};
//!
//! let mut cfg = EngineConfig::default();
//! cfg.concurrency = 4;
//! cfg.strategy = Strategy::Spawner;
//!
//! assert_eq!(cfg.spawn_limit(), Some(4));
//! ```

use std::num::NonZeroUsize;

use crate::policies::BackoffPolicy;

/// Worker-management strategy, selected at construction time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Fixed set of persistent workers reused across tasks.
    #[default]
    Pool,
    /// A fresh worker per task, optionally capped by `concurrency`.
    Spawner,
}

/// Configuration of a dispatch engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Worker count (pool) or concurrency ceiling (spawner). `0` = automatic.
    pub concurrency: usize,

    /// Which worker-management strategy to run.
    pub strategy: Strategy,

    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,

    /// Delay policy for the shutdown status poll.
    pub poll: BackoffPolicy,
}

impl EngineConfig {
    /// Pool configuration with the given worker count.
    pub fn pool(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// Spawner configuration with the given ceiling (`0` = unlimited).
    pub fn spawner(limit: usize) -> Self {
        Self {
            concurrency: limit,
            strategy: Strategy::Spawner,
            ..Self::default()
        }
    }

    /// Number of persistent workers for the pool strategy.
    ///
    /// `0` resolves to the number of available CPUs.
    pub fn pool_size(&self) -> usize {
        match self.concurrency {
            0 => available_cpus(),
            n => n,
        }
    }

    /// Concurrency ceiling for the spawner strategy (`None` = unlimited).
    #[inline]
    pub fn spawn_limit(&self) -> Option<usize> {
        match self.concurrency {
            0 => None,
            n => Some(n),
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// - `concurrency = 0` (automatic)
    /// - `strategy = Strategy::Pool`
    /// - `bus_capacity = 1024`
    /// - `poll = BackoffPolicy::poll()` (500ms ×1.1, capped at 5s)
    fn default() -> Self {
        Self {
            concurrency: 0,
            strategy: Strategy::Pool,
            bus_capacity: 1024,
            poll: BackoffPolicy::poll(),
        }
    }
}

/// Number of CPUs visible to the process, at least 1.
pub(crate) fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_concurrency_resolves_per_strategy() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.pool_size(), available_cpus());
        assert_eq!(cfg.spawn_limit(), None);
    }

    #[test]
    fn test_explicit_concurrency_is_kept() {
        assert_eq!(EngineConfig::pool(3).pool_size(), 3);
        let spawner = EngineConfig::spawner(7);
        assert_eq!(spawner.strategy, Strategy::Spawner);
        assert_eq!(spawner.spawn_limit(), Some(7));
    }
}
