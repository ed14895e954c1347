//! StaticTrustRegistry - trust profiles fixed at startup.

use std::collections::HashMap;

use crate::config::{TrustConfig, TrustProfile};
use crate::domain::{AgentId, AgentType, Identity, TrustLevel};
use crate::ports::TrustRegistry;

pub struct StaticTrustRegistry {
    profiles: HashMap<AgentId, TrustProfile>,
    default_trust: TrustLevel,
}

impl StaticTrustRegistry {
    pub fn new(default_trust: TrustLevel) -> Self {
        Self {
            profiles: HashMap::new(),
            default_trust,
        }
    }

    pub fn from_config(config: &TrustConfig) -> Self {
        config
            .profiles
            .iter()
            .cloned()
            .fold(Self::new(config.default_trust), Self::with_profile)
    }

    /// Later profiles for the same agent replace earlier ones.
    pub fn with_profile(mut self, profile: TrustProfile) -> Self {
        self.profiles.insert(profile.agent_id.clone(), profile);
        self
    }

    pub fn with_agent(self, agent_id: impl Into<AgentId>, agent_type: AgentType, trust_level: TrustLevel) -> Self {
        self.with_profile(TrustProfile {
            agent_id: agent_id.into(),
            agent_type,
            trust_level,
            capabilities: Default::default(),
        })
    }
}

impl TrustRegistry for StaticTrustRegistry {
    fn resolve(&self, agent_id: &AgentId) -> Identity {
        match self.profiles.get(agent_id) {
            Some(profile) => Identity {
                agent_id: agent_id.clone(),
                agent_type: profile.agent_type.clone(),
                trust_level: profile.trust_level,
                capabilities: profile.capabilities.clone(),
            },
            None => Identity::new(agent_id.clone(), AgentType::Unknown, self.default_trust),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_agent_gets_its_profile() {
        let registry = StaticTrustRegistry::new(TrustLevel::Low).with_profile(TrustProfile {
            agent_id: "supervisor".into(),
            agent_type: AgentType::Orchestrator,
            trust_level: TrustLevel::Admin,
            capabilities: ["cancel_any".to_string()].into(),
        });

        let identity = registry.resolve(&"supervisor".into());
        assert_eq!(identity.trust_level, TrustLevel::Admin);
        assert_eq!(identity.agent_type, AgentType::Orchestrator);
        assert!(identity.has_capability("cancel_any"));
    }

    #[test]
    fn unknown_agent_gets_default_trust_and_no_capabilities() {
        let registry = StaticTrustRegistry::new(TrustLevel::Untrusted)
            .with_agent("a", AgentType::Local, TrustLevel::Standard);

        let identity = registry.resolve(&"stranger".into());
        assert_eq!(identity.trust_level, TrustLevel::Untrusted);
        assert_eq!(identity.agent_type, AgentType::Unknown);
        assert!(identity.capabilities.is_empty());
    }

    #[test]
    fn from_config_uses_default_trust() {
        let config = TrustConfig {
            default_trust: TrustLevel::Standard,
            profiles: vec![],
        };
        let registry = StaticTrustRegistry::from_config(&config);
        assert_eq!(registry.resolve(&"x".into()).trust_level, TrustLevel::Standard);
    }
}
