//! Native policy backends.
//!
//! - `RuleTableEvaluator`: ordered first-match rule table from config.
//! - `StaticEvaluator`: constant verdict, for tests and trusted single-user setups.

use crate::config::{PolicyConfig, PolicyRule};
use crate::domain::{Action, Effect, Identity, KernelError, Verdict};
use crate::ports::PolicyEvaluator;

struct CompiledRule {
    rule: PolicyRule,
    resource: glob::Pattern,
}

impl CompiledRule {
    fn applies_to(&self, action: &Action, resource: &str) -> bool {
        self.rule.actions.iter().any(|a| a == "*" || a == action.as_str()) && self.resource.matches(resource)
    }

    fn admits(&self, identity: &Identity) -> bool {
        self.rule.min_trust.is_none_or(|min| identity.trust_level >= min)
            && self
                .rule
                .required_capabilities
                .iter()
                .all(|c| identity.has_capability(c))
    }

    fn verdict(&self) -> Verdict {
        let reason = match (&self.rule.reason, &self.rule.name) {
            (Some(reason), _) => reason.clone(),
            (None, Some(name)) => format!("rule '{name}'"),
            (None, None) => format!("rule for {:?}", self.rule.actions),
        };
        Verdict {
            effect: self.rule.effect,
            reason,
        }
    }
}

pub struct RuleTableEvaluator {
    version: String,
    default_effect: Effect,
    rules: Vec<CompiledRule>,
}

impl RuleTableEvaluator {
    pub fn from_config(config: &PolicyConfig) -> Result<Self, KernelError> {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let resource = glob::Pattern::new(&rule.resource).map_err(|e| {
                    KernelError::Config(format!("policy resource '{}': {e}", rule.resource))
                })?;
                Ok(CompiledRule {
                    rule: rule.clone(),
                    resource,
                })
            })
            .collect::<Result<Vec<_>, KernelError>>()?;
        Ok(Self {
            version: config.version.clone(),
            default_effect: config.default_effect,
            rules,
        })
    }
}

impl PolicyEvaluator for RuleTableEvaluator {
    fn evaluate(&self, identity: &Identity, action: &Action, resource: &str, policy_version: &str) -> Verdict {
        if policy_version != self.version {
            return Verdict::deny(format!(
                "policy version {policy_version} is not loaded (have {})",
                self.version
            ));
        }

        // A rule whose trust or capability requirement is unmet does not
        // match; evaluation falls through to later rules.
        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.applies_to(action, resource) && r.admits(identity))
        {
            return rule.verdict();
        }

        Verdict {
            effect: self.default_effect,
            reason: format!(
                "no rule permits {action} on '{resource}' at trust {}",
                identity.trust_level
            ),
        }
    }

    fn version(&self) -> &str {
        &self.version
    }
}

pub struct StaticEvaluator {
    verdict: Verdict,
}

impl StaticEvaluator {
    pub fn allow_all() -> Self {
        Self {
            verdict: Verdict::allow("allow-all policy"),
        }
    }

    pub fn deny_all() -> Self {
        Self {
            verdict: Verdict::deny("deny-all policy"),
        }
    }
}

impl PolicyEvaluator for StaticEvaluator {
    fn evaluate(&self, _identity: &Identity, _action: &Action, _resource: &str, _policy_version: &str) -> Verdict {
        self.verdict.clone()
    }

    fn version(&self) -> &str {
        "static"
    }
}
