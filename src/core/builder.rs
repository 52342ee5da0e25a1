use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::engine::Engine;
use super::strategy::{self, Env, Hooks};
use crate::{
    config::{EngineConfig, Strategy},
    error::{QueueError, TaskError},
    events::Bus,
    queue::{MemoryQueue, Queue, TaskId},
    subscribers::Subscribe,
    tasks::TaskRef,
};

/// Builder for constructing an [`Engine`] with optional features.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use taskdispatch::{BoundedQueue, Engine, EngineConfig, Strategy};
///
/// let engine = Engine::builder(EngineConfig::spawner(8))
///     .with_queue(Arc::new(BoundedQueue::new(1_000)))
///     .on_task_failed(|id, task, err| eprintln!("#{id} {} failed: {err}", task.name()))
///     .build();
///
/// assert_eq!(engine.config().strategy, Strategy::Spawner);
/// ```
pub struct EngineBuilder {
    cfg: EngineConfig,
    queue: Option<Arc<dyn Queue>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hooks: Hooks,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            queue: None,
            subscribers: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    /// Replaces the default [`MemoryQueue`] with a caller-supplied backend.
    pub fn with_queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded
    /// queues, from [`Engine::start`] until shutdown completes.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Selects the worker-management strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.cfg.strategy = strategy;
        self
    }

    /// Handles non-empty dequeue errors instead of stopping the affected worker.
    pub fn on_dequeue_error(
        mut self,
        hook: impl Fn(&CancellationToken, u64, &QueueError) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_dequeue_error = Some(Arc::new(hook));
        self
    }

    /// Called after every successful task, once its own `on_success` ran.
    pub fn on_task_done(mut self, hook: impl Fn(TaskId, &TaskRef) + Send + Sync + 'static) -> Self {
        self.hooks.on_task_done = Some(Arc::new(hook));
        self
    }

    /// Called after every failed task, once its own `on_failure` ran.
    pub fn on_task_failed(
        mut self,
        hook: impl Fn(TaskId, &TaskRef, &TaskError) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.on_task_failed = Some(Arc::new(hook));
        self
    }

    /// Builds the engine. Does not need a running runtime; nothing is spawned
    /// before [`Engine::start`].
    pub fn build(self) -> Engine {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let queue = self
            .queue
            .unwrap_or_else(|| Arc::new(MemoryQueue::new()) as Arc<dyn Queue>);

        let env = Arc::new(Env::new(queue, bus, self.hooks));
        let workers = strategy::build(&self.cfg, Arc::clone(&env));
        Engine::from_parts(self.cfg, env, workers, self.subscribers)
    }
}
