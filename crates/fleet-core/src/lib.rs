//! Core types and error definitions for the Fleet coordination framework.
//!
//! This crate provides the foundational types shared across all Fleet crates:
//! error handling, agent roles, the task data model, and the capability seam
//! through which workers delegate actual task execution.
//!
//! # Main types
//!
//! - [`FleetError`] — Unified error enum for all Fleet subsystems.
//! - [`FleetResult`] — Convenience alias for `Result<T, FleetError>`.
//! - [`AgentRole`] — The fixed set of specialized agent roles.
//! - [`Task`] / [`TaskSpec`] — A unit of work and the caller-supplied input it
//!   is created from.
//! - [`AgentCapability`] — The trait a concrete agent implementation exposes
//!   to the worker loop.
//! - [`CapabilityRegistry`] — Capability lookup keyed by agent id.

/// Agent capability trait and registry.
pub mod capability;
/// Error types.
pub mod error;
/// Agent role definitions.
pub mod role;
/// Task data model.
pub mod task;

pub use capability::{AgentCapability, CapabilityRegistry};
pub use error::{FleetError, FleetResult};
pub use role::AgentRole;
pub use task::{Task, TaskKind, TaskPriority, TaskSpec, TaskStatus};
