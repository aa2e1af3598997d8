//! Coordination core for a fleet of specialized software agents.
//!
//! Implements the queue-and-workers pattern: callers create prioritized
//! tasks through the [`Orchestrator`], idle [`Worker`]s atomically claim the
//! highest-priority eligible task, delegate execution to an opaque agent
//! capability, and report the outcome back through the [`TaskQueue`]. The
//! [`MessageBus`] lets workers broadcast claims and results so the rest of
//! the fleet can observe progress without sharing state.
//!
//! # Main types
//!
//! - [`Orchestrator`] — Owns the queue, the bus, and the worker set; the sole
//!   public entry point (lifecycle, task CRUD, monitoring facades).
//! - [`TaskQueue`] — Priority queue with atomic claim semantics and
//!   point-in-time statistics.
//! - [`MessageBus`] — Best-effort pub/sub channel for coordination signals.
//! - [`Worker`] — The per-agent claim/execute/report loop.

/// Inter-worker message bus.
pub mod bus;
/// Orchestrator lifecycle, task CRUD, and monitoring facades.
pub mod engine;
/// Priority task queue with atomic claims.
pub mod task_queue;
/// Per-agent worker loop.
pub mod worker;

pub use bus::{BusMessage, BusStatistics, MessageBus};
pub use engine::{Orchestrator, OrchestratorConfig};
pub use task_queue::{PriorityCounts, QueueStatistics, TaskQueue, TaskSnapshot};
pub use worker::{Worker, WorkerHandle, WorkerState, WorkerStatus};
