/// Top-level error type for the Fleet framework.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// A malformed or otherwise rejected task specification.
    #[error("Task error: {0}")]
    Task(String),

    /// An error from the task queue.
    #[error("Queue error: {0}")]
    Queue(String),

    /// An error from a worker loop.
    #[error("Worker error: {0}")]
    Worker(String),

    /// An error raised by an agent capability during execution.
    #[error("Capability error: {0}")]
    Capability(String),

    /// An error from the orchestrator lifecycle or facade.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`FleetError`].
pub type FleetResult<T> = Result<T, FleetError>;
