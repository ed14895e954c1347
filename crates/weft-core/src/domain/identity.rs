//! Caller identity as resolved by the trust registry.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::AgentId;

/// Ordered trust levels; comparisons use declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Untrusted,
    Low,
    Standard,
    Elevated,
    Admin,
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrustLevel::Untrusted => "untrusted",
            TrustLevel::Low => "low",
            TrustLevel::Standard => "standard",
            TrustLevel::Elevated => "elevated",
            TrustLevel::Admin => "admin",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// CLI process on a developer machine.
    Local,
    /// Remote worker reaching the kernel over HTTP.
    Cloud,
    /// Orchestrator/supervisor acting for a human operator.
    Orchestrator,
    Unknown,
}

/// Read-only input to the policy gate, resolved per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub agent_id: AgentId,
    pub agent_type: AgentType,
    pub trust_level: TrustLevel,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl Identity {
    pub fn new(agent_id: impl Into<AgentId>, agent_type: AgentType, trust_level: TrustLevel) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type,
            trust_level,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_levels_are_ordered() {
        assert!(TrustLevel::Untrusted < TrustLevel::Low);
        assert!(TrustLevel::Standard < TrustLevel::Elevated);
        assert!(TrustLevel::Elevated < TrustLevel::Admin);
    }

    #[test]
    fn trust_level_parses_from_snake_case() {
        let level: TrustLevel = serde_json::from_str("\"elevated\"").unwrap();
        assert_eq!(level, TrustLevel::Elevated);
        assert_eq!(level.to_string(), "elevated");
    }

    #[test]
    fn capabilities_are_queried_by_name() {
        let id = Identity::new("a", AgentType::Local, TrustLevel::Standard).with_capability("git.push");
        assert!(id.has_capability("git.push"));
        assert!(!id.has_capability("db.write"));
    }
}
