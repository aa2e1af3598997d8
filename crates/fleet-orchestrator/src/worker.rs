use crate::bus::{BusMessage, MessageBus};
use crate::task_queue::TaskQueue;
use fleet_core::{AgentCapability, FleetResult, Task};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// State of a worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Between tasks, about to poll.
    Idle,
    /// Executing a claimed task.
    Working,
    /// Quiescent after an empty poll, waiting out the poll interval.
    Monitoring,
    /// Shut down; final, no further claims.
    Stopped,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Working => write!(f, "working"),
            WorkerState::Monitoring => write!(f, "monitoring"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Point-in-time snapshot of a worker, as exposed by the monitoring facade.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    /// Agent this worker is bound to.
    pub agent_id: String,
    /// Current loop state.
    pub state: WorkerState,
    /// Task currently being executed, if any.
    pub current_task: Option<Task>,
    /// Convenience flag: `state == Working`.
    pub is_working: bool,
}

/// Status fields shared between the worker loop and the monitoring facade.
///
/// Behind synchronous locks so status reads never await and never block
/// behind an in-flight capability call.
struct WorkerShared {
    state: parking_lot::RwLock<WorkerState>,
    current_task: parking_lot::RwLock<Option<Task>>,
}

impl WorkerShared {
    fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
    }

    fn set_current(&self, task: Option<Task>) {
        *self.current_task.write() = task;
    }
}

/// Handle to a spawned worker, owned by the orchestrator.
pub struct WorkerHandle {
    agent_id: String,
    shared: Arc<WorkerShared>,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Agent this worker is bound to.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Current status snapshot.
    pub fn status(&self) -> WorkerStatus {
        let state = *self.shared.state.read();
        WorkerStatus {
            agent_id: self.agent_id.clone(),
            state,
            current_task: self.shared.current_task.read().clone(),
            is_working: state == WorkerState::Working,
        }
    }

    /// Whether the worker has reached its final state.
    pub fn is_stopped(&self) -> bool {
        *self.shared.state.read() == WorkerState::Stopped
    }

    /// Stops the worker: signals shutdown, aborts the loop, and marks the
    /// final state. Does not wait out an in-flight capability call.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        self.join.abort();
        self.shared.set_state(WorkerState::Stopped);
        self.shared.set_current(None);
    }
}

/// The per-agent execution loop.
///
/// Polls the queue, claims the highest-priority eligible task, announces the
/// claim on the bus, delegates to the bound capability, and reports the
/// outcome back through the queue. An empty poll parks the worker in
/// [`WorkerState::Monitoring`] for one poll interval.
pub struct Worker {
    agent_id: String,
    capability: Arc<dyn AgentCapability>,
    queue: Arc<RwLock<TaskQueue>>,
    bus: Arc<MessageBus>,
    poll_interval: Duration,
}

impl Worker {
    /// Creates a worker bound to the given capability and shared queue/bus.
    pub fn new(
        capability: Arc<dyn AgentCapability>,
        queue: Arc<RwLock<TaskQueue>>,
        bus: Arc<MessageBus>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            agent_id: capability.agent_id().to_string(),
            capability,
            queue,
            bus,
            poll_interval,
        }
    }

    /// Spawns the worker loop onto the runtime and returns its handle.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(WorkerShared {
            state: parking_lot::RwLock::new(WorkerState::Idle),
            current_task: parking_lot::RwLock::new(None),
        });

        let agent_id = self.agent_id.clone();
        let loop_shared = Arc::clone(&shared);
        let join = tokio::spawn(self.run(loop_shared, shutdown_rx));

        WorkerHandle {
            agent_id,
            shared,
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(self, shared: Arc<WorkerShared>, mut shutdown: watch::Receiver<bool>) {
        info!(agent = %self.agent_id, "Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let claimed = {
                let mut queue = self.queue.write().await;
                queue.claim_next(&self.agent_id)
            };

            match claimed {
                Some(task) => {
                    shared.set_state(WorkerState::Working);
                    shared.set_current(Some(task.clone()));
                    self.bus
                        .publish(BusMessage::task_claimed(&self.agent_id, task.id));

                    self.execute(&task).await;

                    shared.set_current(None);
                    shared.set_state(WorkerState::Idle);
                }
                None => {
                    shared.set_state(WorkerState::Monitoring);
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        () = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }

        shared.set_state(WorkerState::Stopped);
        shared.set_current(None);
        info!(agent = %self.agent_id, "Worker stopped");
    }

    /// Runs the capability pipeline for a claimed task and reports the
    /// outcome through the queue and the bus.
    async fn execute(&self, task: &Task) {
        debug!(agent = %self.agent_id, task_id = %task.id, "Executing task");

        match self.run_capability(task).await {
            Ok(result) => {
                {
                    let mut queue = self.queue.write().await;
                    queue.complete(task.id, result);
                }
                self.bus
                    .publish(BusMessage::task_completed(&self.agent_id, task.id));
                info!(agent = %self.agent_id, task_id = %task.id, "Task completed");
            }
            Err(e) => {
                let reason = e.to_string();
                {
                    let mut queue = self.queue.write().await;
                    queue.fail(task.id, reason.clone());
                }
                self.bus
                    .publish(BusMessage::task_failed(&self.agent_id, task.id, &reason));
                error!(agent = %self.agent_id, task_id = %task.id, error = %reason, "Task failed");
            }
        }
    }

    async fn run_capability(&self, task: &Task) -> FleetResult<String> {
        let analysis = self.capability.think(task).await?;
        let proposal = self.capability.propose_solution(task, &analysis).await?;
        self.capability.execute_solution(task, &proposal).await
    }
}
