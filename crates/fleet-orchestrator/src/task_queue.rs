use chrono::{Duration, Utc};
use fleet_core::{FleetResult, Task, TaskPriority, TaskSpec, TaskStatus};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Queue-internal record: the task plus claim bookkeeping.
///
/// Never leaves the queue; callers and workers only ever receive [`Task`]
/// clones.
#[derive(Debug, Clone)]
struct QueuedTask {
    task: Task,
    /// Monotonic insertion sequence, the FIFO tie-break within a priority.
    sequence: u64,
    /// Worker that claimed the task, once processing.
    claimed_by: Option<String>,
}

/// Pending-task counts broken down by priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    /// Pending tasks at immediate priority.
    pub immediate: usize,
    /// Pending tasks at high priority.
    pub high: usize,
    /// Pending tasks at medium priority.
    pub medium: usize,
    /// Pending tasks at low priority.
    pub low: usize,
}

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatistics {
    /// Tasks waiting to be claimed.
    pub pending: usize,
    /// Tasks claimed and in flight.
    pub processing: usize,
    /// Tasks in a terminal state (completed or cancelled).
    pub completed: usize,
    /// Pending tasks per priority level.
    pub by_priority: PriorityCounts,
}

/// Point-in-time snapshot of the queue contents, bucketed by status.
///
/// Cancelled tasks report in the `completed` bucket alongside successful
/// completions; both are terminal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskSnapshot {
    /// Pending tasks in claim order (priority, then FIFO).
    pub pending: Vec<Task>,
    /// In-flight tasks.
    pub processing: Vec<Task>,
    /// Terminal tasks.
    pub completed: Vec<Task>,
}

/// Priority task queue with atomic claim semantics.
///
/// The queue is the single piece of shared mutable state in the coordination
/// core. It is not internally synchronized; the orchestrator wraps it in an
/// `Arc<RwLock<_>>` so that `claim_next` runs under the write lock and is
/// atomic by construction — no two workers can observe the same pending task
/// as claimable.
pub struct TaskQueue {
    tasks: HashMap<Uuid, QueuedTask>,
    next_sequence: u64,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// Validates the spec, assigns a unique id, and inserts the task as
    /// pending. Never fails for well-formed input.
    pub fn enqueue(&mut self, spec: TaskSpec, priority: TaskPriority) -> FleetResult<Task> {
        spec.validate()?;

        let task = Task::from_spec(spec, priority);
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        tracing::debug!(task_id = %task.id, priority = %priority, sequence, "Task enqueued");

        self.tasks.insert(
            task.id,
            QueuedTask {
                task: task.clone(),
                sequence,
                claimed_by: None,
            },
        );
        Ok(task)
    }

    /// Atomically claims the highest-priority eligible pending task for the
    /// given agent, transitioning it to processing.
    ///
    /// A task is eligible when its `assigned_agent` is unset or matches
    /// `agent_id`. Returns `None` when nothing is claimable; never blocks —
    /// polling workers back off and retry.
    pub fn claim_next(&mut self, agent_id: &str) -> Option<Task> {
        let id = self
            .tasks
            .values()
            .filter(|qt| qt.task.status == TaskStatus::Pending)
            .filter(|qt| {
                qt.task
                    .assigned_agent
                    .as_deref()
                    .map_or(true, |a| a == agent_id)
            })
            .min_by_key(|qt| (qt.task.priority.rank(), qt.sequence))
            .map(|qt| qt.task.id)?;

        let qt = self.tasks.get_mut(&id)?;
        qt.task.status = TaskStatus::Processing;
        qt.claimed_by = Some(agent_id.to_string());

        tracing::debug!(task_id = %id, agent = %agent_id, "Task claimed");
        Some(qt.task.clone())
    }

    /// Cancels a pending task, recording the reason.
    ///
    /// A task that is already processing, terminal, or unknown is left
    /// untouched — cancellation is advisory, not a preemption signal to an
    /// in-flight worker. Returns whether a task was actually cancelled.
    pub fn cancel(&mut self, id: Uuid, reason: Option<&str>) -> bool {
        match self.tasks.get_mut(&id) {
            Some(qt) if qt.task.status == TaskStatus::Pending => {
                qt.task.status = TaskStatus::Cancelled;
                qt.task.error = reason.map(str::to_string);
                qt.task.completed_at = Some(Utc::now());
                tracing::debug!(task_id = %id, "Task cancelled");
                true
            }
            _ => false,
        }
    }

    /// Transitions a processing task to completed, attaching the result.
    /// Returns false for any other state or an unknown id.
    pub fn complete(&mut self, id: Uuid, result: impl Into<String>) -> bool {
        match self.tasks.get_mut(&id) {
            Some(qt) if qt.task.status == TaskStatus::Processing => {
                qt.task.status = TaskStatus::Completed;
                qt.task.result = Some(result.into());
                qt.task.completed_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Transitions a processing task to cancelled, attaching the error.
    /// Returns false for any other state or an unknown id.
    pub fn fail(&mut self, id: Uuid, error: impl Into<String>) -> bool {
        match self.tasks.get_mut(&id) {
            Some(qt) if qt.task.status == TaskStatus::Processing => {
                qt.task.status = TaskStatus::Cancelled;
                qt.task.error = Some(error.into());
                qt.task.completed_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Gets a copy of a task by id.
    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.get(&id).map(|qt| qt.task.clone())
    }

    /// Worker that claimed the given task, if it is or was processing.
    pub fn claimant(&self, id: Uuid) -> Option<String> {
        self.tasks.get(&id).and_then(|qt| qt.claimed_by.clone())
    }

    /// Consistent point-in-time snapshot of all tasks, bucketed by status.
    pub fn snapshot(&self) -> TaskSnapshot {
        let mut snapshot = TaskSnapshot::default();
        let mut pending: Vec<&QueuedTask> = Vec::new();

        for qt in self.tasks.values() {
            match qt.task.status {
                TaskStatus::Pending => pending.push(qt),
                TaskStatus::Processing => snapshot.processing.push(qt.task.clone()),
                TaskStatus::Completed | TaskStatus::Cancelled => {
                    snapshot.completed.push(qt.task.clone());
                }
            }
        }

        pending.sort_by_key(|qt| (qt.task.priority.rank(), qt.sequence));
        snapshot.pending = pending.into_iter().map(|qt| qt.task.clone()).collect();
        snapshot
    }

    /// Point-in-time statistics derived from the current queue contents.
    pub fn statistics(&self) -> QueueStatistics {
        let mut stats = QueueStatistics::default();
        for qt in self.tasks.values() {
            match qt.task.status {
                TaskStatus::Pending => {
                    stats.pending += 1;
                    match qt.task.priority {
                        TaskPriority::Immediate => stats.by_priority.immediate += 1,
                        TaskPriority::High => stats.by_priority.high += 1,
                        TaskPriority::Medium => stats.by_priority.medium += 1,
                        TaskPriority::Low => stats.by_priority.low += 1,
                    }
                }
                TaskStatus::Processing => stats.processing += 1,
                TaskStatus::Completed | TaskStatus::Cancelled => stats.completed += 1,
            }
        }
        stats
    }

    /// Returns every in-flight task to pending, clearing its claim.
    ///
    /// Used when the worker set is torn down: an aborted worker never
    /// reports an outcome for its claimed task, so the task re-enters the
    /// pending set (original FIFO position preserved) and a later restart
    /// can drain it. Returns the number of requeued tasks.
    pub fn requeue_in_flight(&mut self) -> usize {
        let mut requeued = 0;
        for qt in self.tasks.values_mut() {
            if qt.task.status == TaskStatus::Processing {
                qt.task.status = TaskStatus::Pending;
                qt.claimed_by = None;
                requeued += 1;
            }
        }
        requeued
    }

    /// Evicts terminal tasks whose `completed_at` is older than the given
    /// retention window. Returns the number of evicted tasks.
    pub fn purge_terminal(&mut self, older_than: Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let before = self.tasks.len();
        self.tasks.retain(|_, qt| {
            !(qt.task.status.is_terminal()
                && qt.task.completed_at.is_some_and(|t| t < cutoff))
        });
        before - self.tasks.len()
    }

    /// Count of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.count_status(TaskStatus::Pending)
    }

    /// Count of in-flight tasks.
    pub fn processing_count(&self) -> usize {
        self.count_status(TaskStatus::Processing)
    }

    /// Count of terminal tasks still held in the queue.
    pub fn completed_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|qt| qt.task.status.is_terminal())
            .count()
    }

    /// Total number of tasks held, terminal included.
    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    fn count_status(&self, status: TaskStatus) -> usize {
        self.tasks
            .values()
            .filter(|qt| qt.task.status == status)
            .count()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use fleet_core::TaskKind;

    fn spec(description: &str) -> TaskSpec {
        TaskSpec::new(description, TaskKind::Feature)
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = TaskQueue::new();
        assert_eq!(queue.total_count(), 0);
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.claim_next("backend").is_none());
    }

    #[test]
    fn test_enqueue_assigns_unique_ids() {
        let mut queue = TaskQueue::new();
        let a = queue.enqueue(spec("A"), TaskPriority::Medium).unwrap();
        let b = queue.enqueue(spec("B"), TaskPriority::Medium).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, TaskStatus::Pending);
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn test_enqueue_rejects_blank_description() {
        let mut queue = TaskQueue::new();
        assert!(queue.enqueue(spec("  "), TaskPriority::Low).is_err());
        assert_eq!(queue.total_count(), 0);
    }

    #[test]
    fn test_claim_respects_priority_order() {
        let mut queue = TaskQueue::new();
        queue.enqueue(spec("low"), TaskPriority::Low).unwrap();
        queue.enqueue(spec("high"), TaskPriority::High).unwrap();
        queue
            .enqueue(spec("immediate"), TaskPriority::Immediate)
            .unwrap();
        queue.enqueue(spec("medium"), TaskPriority::Medium).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| queue.claim_next("backend"))
            .map(|t| t.description)
            .collect();
        assert_eq!(order, vec!["immediate", "high", "medium", "low"]);
    }

    #[test]
    fn test_claim_fifo_within_priority() {
        let mut queue = TaskQueue::new();
        queue.enqueue(spec("first"), TaskPriority::High).unwrap();
        queue.enqueue(spec("second"), TaskPriority::High).unwrap();
        queue.enqueue(spec("third"), TaskPriority::High).unwrap();

        assert_eq!(queue.claim_next("qa").unwrap().description, "first");
        assert_eq!(queue.claim_next("qa").unwrap().description, "second");
        assert_eq!(queue.claim_next("qa").unwrap().description, "third");
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut queue = TaskQueue::new();
        let task = queue.enqueue(spec("only"), TaskPriority::Medium).unwrap();

        let claimed = queue.claim_next("backend").unwrap();
        assert_eq!(claimed.id, task.id);
        assert_eq!(claimed.status, TaskStatus::Processing);
        assert_eq!(queue.claimant(task.id).as_deref(), Some("backend"));

        // A second claimant finds nothing.
        assert!(queue.claim_next("frontend").is_none());
    }

    #[test]
    fn test_claim_honours_assigned_agent() {
        let mut queue = TaskQueue::new();
        queue
            .enqueue(
                spec("backend only").assigned_to("backend"),
                TaskPriority::Immediate,
            )
            .unwrap();
        queue.enqueue(spec("anyone"), TaskPriority::Low).unwrap();

        // frontend skips the backend-affine task even though it outranks.
        let claimed = queue.claim_next("frontend").unwrap();
        assert_eq!(claimed.description, "anyone");

        let claimed = queue.claim_next("backend").unwrap();
        assert_eq!(claimed.description, "backend only");
    }

    #[test]
    fn test_cancel_pending() {
        let mut queue = TaskQueue::new();
        let task = queue.enqueue(spec("drop me"), TaskPriority::Low).unwrap();

        assert!(queue.cancel(task.id, Some("superseded")));
        let cancelled = queue.get(task.id).unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
        assert_eq!(cancelled.error.as_deref(), Some("superseded"));
        assert!(cancelled.completed_at.is_some());
        assert!(queue.claim_next("backend").is_none());
    }

    #[test]
    fn test_cancel_processing_is_noop() {
        let mut queue = TaskQueue::new();
        let task = queue.enqueue(spec("in flight"), TaskPriority::High).unwrap();
        queue.claim_next("devops").unwrap();

        assert!(!queue.cancel(task.id, None));
        assert_eq!(queue.get(task.id).unwrap().status, TaskStatus::Processing);
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let mut queue = TaskQueue::new();
        queue.enqueue(spec("keep"), TaskPriority::Medium).unwrap();
        let stats_before = queue.statistics();

        assert!(!queue.cancel(Uuid::new_v4(), Some("no such task")));
        assert_eq!(queue.statistics(), stats_before);
    }

    #[test]
    fn test_complete_transitions_and_attaches_result() {
        let mut queue = TaskQueue::new();
        let task = queue.enqueue(spec("work"), TaskPriority::Medium).unwrap();
        queue.claim_next("qa").unwrap();

        assert!(queue.complete(task.id, "all green"));
        let done = queue.get(task.id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("all green"));

        // Completing twice is rejected.
        assert!(!queue.complete(task.id, "again"));
    }

    #[test]
    fn test_fail_records_error() {
        let mut queue = TaskQueue::new();
        let task = queue.enqueue(spec("doomed"), TaskPriority::Medium).unwrap();
        queue.claim_next("backend").unwrap();

        assert!(queue.fail(task.id, "compilation error"));
        let failed = queue.get(task.id).unwrap();
        assert_eq!(failed.status, TaskStatus::Cancelled);
        assert_eq!(failed.error.as_deref(), Some("compilation error"));
    }

    #[test]
    fn test_complete_pending_is_rejected() {
        let mut queue = TaskQueue::new();
        let task = queue.enqueue(spec("not claimed"), TaskPriority::Low).unwrap();
        assert!(!queue.complete(task.id, "skipped the claim"));
        assert_eq!(queue.get(task.id).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_statistics_by_priority() {
        let mut queue = TaskQueue::new();
        queue.enqueue(spec("a"), TaskPriority::Immediate).unwrap();
        queue.enqueue(spec("b"), TaskPriority::High).unwrap();
        queue.enqueue(spec("c"), TaskPriority::High).unwrap();
        queue.enqueue(spec("d"), TaskPriority::Low).unwrap();

        let stats = queue.statistics();
        assert_eq!(stats.pending, 4);
        assert_eq!(stats.by_priority.immediate, 1);
        assert_eq!(stats.by_priority.high, 2);
        assert_eq!(stats.by_priority.medium, 0);
        assert_eq!(stats.by_priority.low, 1);

        queue.claim_next("backend").unwrap();
        let stats = queue.statistics();
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.by_priority.immediate, 0);
    }

    #[test]
    fn test_snapshot_buckets_and_order() {
        let mut queue = TaskQueue::new();
        queue.enqueue(spec("low"), TaskPriority::Low).unwrap();
        queue.enqueue(spec("urgent"), TaskPriority::Immediate).unwrap();
        let claimed = queue.claim_next("backend").unwrap();
        queue.complete(claimed.id, "done");
        queue.enqueue(spec("high"), TaskPriority::High).unwrap();
        queue.claim_next("qa").unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.pending.len(), 1);
        assert_eq!(snapshot.pending[0].description, "low");
        assert_eq!(snapshot.processing.len(), 1);
        assert_eq!(snapshot.processing[0].description, "high");
        assert_eq!(snapshot.completed.len(), 1);
        assert_eq!(snapshot.completed[0].description, "urgent");
    }

    #[test]
    fn test_requeue_in_flight_restores_pending() {
        let mut queue = TaskQueue::new();
        let first = queue.enqueue(spec("first"), TaskPriority::High).unwrap();
        queue.enqueue(spec("second"), TaskPriority::High).unwrap();
        let done = queue.enqueue(spec("done"), TaskPriority::Low).unwrap();

        queue.claim_next("backend").unwrap();
        queue.claim_next("backend").unwrap();
        queue.claim_next("backend").unwrap();
        queue.complete(done.id, "finished");

        // Only the two still-processing tasks go back to pending.
        assert_eq!(queue.requeue_in_flight(), 2);
        assert_eq!(queue.pending_count(), 2);
        assert_eq!(queue.processing_count(), 0);
        assert!(queue.claimant(first.id).is_none());
        assert_eq!(queue.get(done.id).unwrap().status, TaskStatus::Completed);

        // FIFO position within the priority level is preserved.
        assert_eq!(queue.claim_next("qa").unwrap().description, "first");
        assert_eq!(queue.claim_next("qa").unwrap().description, "second");
    }

    #[test]
    fn test_purge_terminal_respects_retention() {
        let mut queue = TaskQueue::new();
        let done = queue.enqueue(spec("old"), TaskPriority::Medium).unwrap();
        queue.claim_next("backend").unwrap();
        queue.complete(done.id, "done");
        queue.enqueue(spec("still pending"), TaskPriority::Medium).unwrap();

        // Within the retention window nothing is evicted.
        assert_eq!(queue.purge_terminal(Duration::hours(1)), 0);
        assert_eq!(queue.total_count(), 2);

        // A zero-width window evicts the terminal task but not the pending one.
        assert_eq!(queue.purge_terminal(Duration::seconds(-1)), 1);
        assert_eq!(queue.total_count(), 1);
        assert!(queue.get(done.id).is_none());
    }
}
