use crate::error::FleetResult;
use crate::role::AgentRole;
use crate::task::Task;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// The seam between the worker loop and a concrete agent implementation.
///
/// A capability is an opaque, potentially long-running collaborator: the
/// worker invokes `think`, feeds the analysis into `propose_solution`, and
/// executes the proposal. The coordination core imposes no timeout and treats
/// the result or failure as opaque input to the task queue's
/// `complete`/`fail` transitions.
#[async_trait]
pub trait AgentCapability: Send + Sync {
    /// Stable identifier of the agent this capability backs.
    fn agent_id(&self) -> &str;

    /// Role of the agent.
    fn role(&self) -> AgentRole;

    /// Analyze the task and produce a working understanding of it.
    async fn think(&self, task: &Task) -> FleetResult<String>;

    /// Turn an analysis into a concrete solution proposal.
    async fn propose_solution(&self, task: &Task, analysis: &str) -> FleetResult<String>;

    /// Carry out a proposal, returning the final result text.
    async fn execute_solution(&self, task: &Task, proposal: &str) -> FleetResult<String>;
}

/// Capability lookup keyed by agent id.
///
/// Bound at orchestrator construction time; one concrete implementation per
/// agent role. Registering zero capabilities is valid and yields an
/// orchestrator with zero workers.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn AgentCapability>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Registers a capability under its own agent id, replacing any previous
    /// registration for that id.
    pub fn register(&mut self, capability: Arc<dyn AgentCapability>) {
        self.capabilities
            .insert(capability.agent_id().to_string(), capability);
    }

    /// Looks up a capability by agent id.
    pub fn get(&self, agent_id: &str) -> Option<&Arc<dyn AgentCapability>> {
        self.capabilities.get(agent_id)
    }

    /// Registered agent ids, in a stable sorted order.
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.capabilities.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Iterates over all registered capabilities.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn AgentCapability>)> {
        self.capabilities.iter().map(|(id, cap)| (id.as_str(), cap))
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::task::{TaskKind, TaskSpec};

    struct StubCapability {
        id: String,
        role: AgentRole,
    }

    #[async_trait]
    impl AgentCapability for StubCapability {
        fn agent_id(&self) -> &str {
            &self.id
        }

        fn role(&self) -> AgentRole {
            self.role
        }

        async fn think(&self, task: &Task) -> FleetResult<String> {
            Ok(format!("analysis of {}", task.description))
        }

        async fn propose_solution(&self, _task: &Task, analysis: &str) -> FleetResult<String> {
            Ok(format!("proposal from {analysis}"))
        }

        async fn execute_solution(&self, _task: &Task, proposal: &str) -> FleetResult<String> {
            Ok(format!("executed {proposal}"))
        }
    }

    fn stub(id: &str, role: AgentRole) -> Arc<dyn AgentCapability> {
        Arc::new(StubCapability {
            id: id.to_string(),
            role,
        })
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.is_empty());

        registry.register(stub("backend", AgentRole::Backend));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("backend").is_some());
        assert!(registry.get("frontend").is_none());
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = CapabilityRegistry::new();
        registry.register(stub("qa", AgentRole::Qa));
        registry.register(stub("qa", AgentRole::Qa));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_agent_ids_sorted() {
        let mut registry = CapabilityRegistry::new();
        registry.register(stub("qa", AgentRole::Qa));
        registry.register(stub("backend", AgentRole::Backend));
        registry.register(stub("devops", AgentRole::Devops));
        assert_eq!(registry.agent_ids(), vec!["backend", "devops", "qa"]);
    }

    #[tokio::test]
    async fn test_capability_pipeline() {
        let cap = stub("analyst", AgentRole::Analyst);
        let task = Task::from_spec(
            TaskSpec::new("measure impact", TaskKind::Analysis),
            crate::task::TaskPriority::Medium,
        );

        let analysis = cap.think(&task).await.unwrap();
        let proposal = cap.propose_solution(&task, &analysis).await.unwrap();
        let result = cap.execute_solution(&task, &proposal).await.unwrap();
        assert!(result.contains("measure impact"));
    }
}
