use crate::error::{FleetError, FleetResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority of a task in the execution queue.
///
/// `Immediate` outranks `High`, which outranks `Medium`, which outranks
/// `Low`. Ties within a level are broken first-enqueued-first-claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Claimed before everything else.
    Immediate,
    /// Claimed before medium and low priority work.
    High,
    /// The default priority.
    Medium,
    /// Claimed only when nothing else is pending.
    Low,
}

impl TaskPriority {
    /// Ordering rank; lower ranks are claimed first.
    pub fn rank(self) -> u8 {
        match self {
            TaskPriority::Immediate => 0,
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::Immediate => write!(f, "immediate"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::Low => write!(f, "low"),
        }
    }
}

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Fix a defect.
    Bug,
    /// Implement new functionality.
    Feature,
    /// Restructure existing code without changing behavior.
    Refactor,
    /// Investigate or analyze without producing code.
    Analysis,
    /// Build, release, or infrastructure work.
    Deployment,
    /// Write or extend tests.
    Testing,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Bug => write!(f, "bug"),
            TaskKind::Feature => write!(f, "feature"),
            TaskKind::Refactor => write!(f, "refactor"),
            TaskKind::Analysis => write!(f, "analysis"),
            TaskKind::Deployment => write!(f, "deployment"),
            TaskKind::Testing => write!(f, "testing"),
        }
    }
}

/// Status of a task over its lifetime.
///
/// Tasks only ever move `Pending → Processing → {Completed | Cancelled}`.
/// A failed capability call lands in `Cancelled` with the error recorded on
/// the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue, claimable.
    Pending,
    /// Claimed by a worker and in flight.
    Processing,
    /// Finished successfully.
    Completed,
    /// Cancelled before being claimed, or failed while processing.
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// Caller-supplied input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Human-readable description of the work.
    pub description: String,
    /// Kind of work.
    pub kind: TaskKind,
    /// Requested priority; defaults to [`TaskPriority::Medium`] when unset.
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// Restrict the task to a specific agent; any eligible worker may claim
    /// it when unset.
    #[serde(default)]
    pub assigned_agent: Option<String>,
}

impl TaskSpec {
    /// Creates a spec with the given description and kind.
    pub fn new(description: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            description: description.into(),
            kind,
            priority: None,
            assigned_agent: None,
        }
    }

    /// Sets the requested priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Restricts the task to the given agent.
    pub fn assigned_to(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent_id.into());
        self
    }

    /// Validates the spec. An empty or blank description is the only
    /// synchronous rejection in the public API.
    pub fn validate(&self) -> FleetResult<()> {
        if self.description.trim().is_empty() {
            return Err(FleetError::Task(
                "task description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A unit of work tracked by the coordination core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned at enqueue time.
    pub id: Uuid,
    /// Human-readable description of the work.
    pub description: String,
    /// Kind of work.
    pub kind: TaskKind,
    /// Effective priority.
    pub priority: TaskPriority,
    /// Agent this task is restricted to, if any.
    pub assigned_agent: Option<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Output recorded on completion.
    pub result: Option<String>,
    /// Error or cancellation reason recorded on a terminal `Cancelled`.
    pub error: Option<String>,
    /// UTC timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// UTC timestamp of reaching a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a pending task from a validated spec.
    pub fn from_spec(spec: TaskSpec, priority: TaskPriority) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: spec.description,
            kind: spec.kind,
            priority,
            assigned_agent: spec.assigned_agent,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
