use crate::error::FleetError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role of each specialized agent in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Server-side implementation work.
    Backend,
    /// Client-side implementation work.
    Frontend,
    /// System design and structural decisions.
    Architect,
    /// Requirements and impact analysis.
    Analyst,
    /// Build, deployment, and infrastructure work.
    Devops,
    /// Testing and quality assurance.
    Qa,
}

impl AgentRole {
    /// The full fixed set of roles, in a stable order.
    pub fn all() -> [AgentRole; 6] {
        [
            AgentRole::Backend,
            AgentRole::Frontend,
            AgentRole::Architect,
            AgentRole::Analyst,
            AgentRole::Devops,
            AgentRole::Qa,
        ]
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Backend => write!(f, "backend"),
            AgentRole::Frontend => write!(f, "frontend"),
            AgentRole::Architect => write!(f, "architect"),
            AgentRole::Analyst => write!(f, "analyst"),
            AgentRole::Devops => write!(f, "devops"),
            AgentRole::Qa => write!(f, "qa"),
        }
    }
}

impl FromStr for AgentRole {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backend" => Ok(AgentRole::Backend),
            "frontend" => Ok(AgentRole::Frontend),
            "architect" => Ok(AgentRole::Architect),
            "analyst" => Ok(AgentRole::Analyst),
            "devops" => Ok(AgentRole::Devops),
            "qa" => Ok(AgentRole::Qa),
            other => Err(FleetError::Config(format!("unknown agent role: '{other}'"))),
        }
    }
}
