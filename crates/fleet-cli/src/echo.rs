use async_trait::async_trait;
use fleet_core::{AgentCapability, AgentRole, FleetResult, Task};

/// Deterministic built-in capability used by the `fleet` binary.
///
/// Echoes each pipeline stage back as text so the orchestrator is runnable
/// end to end without any external model provider.
pub struct EchoCapability {
    id: String,
    role: AgentRole,
}

impl EchoCapability {
    /// Creates an echo capability for the given role, using the role name as
    /// the agent id.
    pub fn new(role: AgentRole) -> Self {
        Self {
            id: role.to_string(),
            role,
        }
    }
}

#[async_trait]
impl AgentCapability for EchoCapability {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        self.role
    }

    async fn think(&self, task: &Task) -> FleetResult<String> {
        Ok(format!(
            "{} analyzed {} task: {}",
            self.role, task.kind, task.description
        ))
    }

    async fn propose_solution(&self, _task: &Task, analysis: &str) -> FleetResult<String> {
        Ok(format!("{analysis} -> proposed a solution"))
    }

    async fn execute_solution(&self, _task: &Task, proposal: &str) -> FleetResult<String> {
        Ok(format!("{proposal} -> executed"))
    }
}
