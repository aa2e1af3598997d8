use crate::bus::{BusStatistics, MessageBus};
use crate::task_queue::{QueueStatistics, TaskQueue, TaskSnapshot};
use crate::worker::{Worker, WorkerHandle, WorkerState, WorkerStatus};
use fleet_core::{CapabilityRegistry, FleetResult, Task, TaskPriority, TaskSpec};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Tunables for the orchestrator and its workers.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Back-off interval between empty queue polls.
    pub poll_interval: Duration,
    /// Broadcast capacity of the message bus.
    pub bus_capacity: usize,
    /// Interval of the periodic cleanup job.
    pub cleanup_interval: Duration,
    /// How long terminal tasks are retained before eviction.
    pub retain_terminal_for: chrono::Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            bus_capacity: MessageBus::DEFAULT_CAPACITY,
            cleanup_interval: Duration::from_secs(60),
            retain_terminal_for: chrono::Duration::minutes(5),
        }
    }
}

/// Lifecycle-owned resources, guarded by one async mutex so `start` and
/// `stop` never race each other.
#[derive(Default)]
struct Lifecycle {
    workers: Vec<WorkerHandle>,
    cleanup: Option<JoinHandle<()>>,
}

/// Single owner of one task queue, one message bus, and the worker set.
///
/// Instance-owned and constructed explicitly — no process-wide singletons, so
/// multiple orchestrators can coexist in tests. The queue and bus are never
/// exposed for direct external mutation; callers go through the operations
/// below.
pub struct Orchestrator {
    registry: CapabilityRegistry,
    queue: Arc<RwLock<TaskQueue>>,
    bus: Arc<MessageBus>,
    lifecycle: Mutex<Lifecycle>,
    running: AtomicBool,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates an orchestrator over the given capability registry with
    /// default configuration.
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self::with_config(registry, OrchestratorConfig::default())
    }

    /// Creates an orchestrator with explicit configuration.
    pub fn with_config(registry: CapabilityRegistry, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            queue: Arc::new(RwLock::new(TaskQueue::new())),
            bus: Arc::new(MessageBus::with_capacity(config.bus_capacity)),
            lifecycle: Mutex::new(Lifecycle::default()),
            running: AtomicBool::new(false),
            config,
        }
    }

    /// Starts one worker per registered capability plus the cleanup job.
    ///
    /// Idempotent: calling `start` while running returns without creating
    /// duplicate workers. Zero registered capabilities is valid and yields
    /// zero workers.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Orchestrator already running; start is a no-op");
            return;
        }

        // Drop handles from a previous run before spawning fresh workers.
        lifecycle.workers.clear();

        for agent_id in self.registry.agent_ids() {
            // The registry only hands out ids it holds capabilities for.
            let Some(capability) = self.registry.get(&agent_id) else {
                continue;
            };
            let worker = Worker::new(
                Arc::clone(capability),
                Arc::clone(&self.queue),
                Arc::clone(&self.bus),
                self.config.poll_interval,
            );
            lifecycle.workers.push(worker.spawn());
        }

        lifecycle.cleanup = Some(self.spawn_cleanup());

        info!(workers = lifecycle.workers.len(), "Orchestrator started");
    }

    /// Stops every worker and the cleanup job.
    ///
    /// Idempotent: safe to call when not running. Workers transition to
    /// their final `Stopped` state; in-flight capability calls are not
    /// waited out.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Orchestrator not running; stop is a no-op");
            return;
        }

        for worker in &lifecycle.workers {
            worker.stop();
        }
        if let Some(cleanup) = lifecycle.cleanup.take() {
            cleanup.abort();
        }

        // Aborted workers never report an outcome for a claimed task;
        // return anything still in flight to the pending set so a restart
        // can drain it.
        let requeued = {
            let mut queue = self.queue.write().await;
            queue.requeue_in_flight()
        };
        if requeued > 0 {
            info!(requeued, "Requeued in-flight tasks from stopped workers");
        }

        info!(workers = lifecycle.workers.len(), "Orchestrator stopped");
    }

    /// Whether the orchestrator is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Validates the spec and enqueues a task at the given priority.
    ///
    /// Valid before `start()` — tasks queue up and wait for workers to
    /// appear. The only synchronous rejection is a malformed spec.
    pub async fn create_task(
        &self,
        spec: TaskSpec,
        priority: TaskPriority,
    ) -> FleetResult<Task> {
        let mut queue = self.queue.write().await;
        queue.enqueue(spec, priority)
    }

    /// Creates a task using the priority requested in the spec, defaulting
    /// to medium.
    pub async fn create_task_from_spec(&self, spec: TaskSpec) -> FleetResult<Task> {
        let priority = spec.priority.unwrap_or_default();
        self.create_task(spec, priority).await
    }

    /// Cancels a pending task. A no-op for processing, terminal, or unknown
    /// ids.
    pub async fn cancel_task(&self, id: Uuid, reason: Option<&str>) {
        let mut queue = self.queue.write().await;
        queue.cancel(id, reason);
    }

    /// Looks up a task by id.
    pub async fn get_task(&self, id: Uuid) -> Option<Task> {
        self.queue.read().await.get(id)
    }

    /// Point-in-time snapshot of all tasks, bucketed by status.
    pub async fn get_tasks(&self) -> TaskSnapshot {
        self.queue.read().await.snapshot()
    }

    /// Point-in-time queue statistics.
    pub async fn get_queue_statistics(&self) -> QueueStatistics {
        self.queue.read().await.statistics()
    }

    /// Status of every worker, in start order.
    pub async fn get_workers_status(&self) -> Vec<WorkerStatus> {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle.workers.iter().map(WorkerHandle::status).collect()
    }

    /// Number of workers that have not reached their final state.
    pub async fn get_active_workers_count(&self) -> usize {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle
            .workers
            .iter()
            .filter(|w| w.status().state != WorkerState::Stopped)
            .count()
    }

    /// Monotonic message bus statistics.
    pub fn get_bus_statistics(&self) -> BusStatistics {
        self.bus.statistics()
    }

    /// Spawns the periodic cleanup job that evicts aged-out terminal tasks.
    fn spawn_cleanup(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let interval = self.config.cleanup_interval;
        let retention = self.config.retain_terminal_for;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = {
                    let mut queue = queue.write().await;
                    queue.purge_terminal(retention)
                };
                if evicted > 0 {
                    debug!(evicted, "Cleanup evicted terminal tasks");
                }
            }
        })
    }
}
