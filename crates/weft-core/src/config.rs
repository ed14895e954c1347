//! Kernel configuration.
//!
//! Loaded from YAML; every section has defaults, so an empty document is a
//! valid (and safe) configuration.
//!
//! ```yaml
//! locks:
//!   default_ttl: 5m
//!   max_ttl: 2h
//!   sweep_interval: 30s
//! policy:
//!   version: "2026-01"
//!   default_effect: deny
//!   rules:
//!     - actions: ["*"]
//!       min_trust: standard
//!       effect: allow
//! trust:
//!   default_trust: low
//!   profiles:
//!     - agent_id: claude-local
//!       agent_type: local
//!       trust_level: standard
//! guardrails:
//!   builtin: true
//! audit:
//!   path: /var/lib/weft/audit.jsonl
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Action, AgentId, AgentType, Effect, KernelError, TrustLevel};
use crate::policy::guardrails::{GuardrailPattern, Severity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// TTL used when a caller does not pass one.
    #[serde(default = "default_lock_ttl", with = "humantime_serde")]
    pub default_ttl: Duration,
    #[serde(default = "default_max_lock_ttl", with = "humantime_serde")]
    pub max_ttl: Duration,
    /// When set, the builder can spawn a background sweeper.
    #[serde(default, with = "humantime_serde")]
    pub sweep_interval: Option<Duration>,
}

fn default_lock_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_lock_ttl() -> Duration {
    Duration::from_secs(2 * 60 * 60)
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_lock_ttl(),
            max_ttl: default_max_lock_ttl(),
            sweep_interval: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_version")]
    pub version: String,
    /// Effect when no rule matches.
    #[serde(default = "default_effect")]
    pub default_effect: Effect,
    #[serde(default = "default_rules")]
    pub rules: Vec<PolicyRule>,
}

fn default_policy_version() -> String {
    "builtin-1".to_string()
}

fn default_effect() -> Effect {
    Effect::Deny
}

/// Elevated agents cancel, reschedule and hold pause locks; standard agents
/// do everything else the kernel offers. Anything unlisted (custom actions
/// included) falls through to the default effect.
fn default_rules() -> Vec<PolicyRule> {
    let kernel = |actions: &[Action]| -> Vec<String> { actions.iter().map(|a| a.as_str().to_string()).collect() };
    vec![
        PolicyRule {
            name: Some("pause-locks".into()),
            actions: kernel(&[Action::AcquireLock, Action::ReleaseLock]),
            resource: "feature:*:pause".into(),
            min_trust: Some(TrustLevel::Elevated),
            required_capabilities: Vec::new(),
            effect: Effect::Allow,
            reason: Some("elevated agents may pause features".into()),
        },
        PolicyRule {
            name: Some("pause-locks-deny".into()),
            actions: kernel(&[Action::AcquireLock, Action::ReleaseLock]),
            resource: "feature:*:pause".into(),
            min_trust: None,
            required_capabilities: Vec::new(),
            effect: Effect::Deny,
            reason: Some("pausing a feature requires elevated trust".into()),
        },
        PolicyRule {
            name: Some("supervision".into()),
            actions: kernel(&[Action::CancelWork, Action::RescheduleWork]),
            resource: "*".into(),
            min_trust: Some(TrustLevel::Elevated),
            required_capabilities: Vec::new(),
            effect: Effect::Allow,
            reason: Some("elevated agents supervise the queue".into()),
        },
        PolicyRule {
            name: Some("standard-work".into()),
            actions: kernel(&[
                Action::AcquireLock,
                Action::ReleaseLock,
                Action::SubmitWork,
                Action::ClaimWork,
                Action::CompleteWork,
                Action::FailWork,
            ]),
            resource: "*".into(),
            min_trust: Some(TrustLevel::Standard),
            required_capabilities: Vec::new(),
            effect: Effect::Allow,
            reason: Some("standard agents coordinate work".into()),
        },
    ]
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: default_policy_version(),
            default_effect: default_effect(),
            rules: default_rules(),
        }
    }
}

/// One row of the native rule table. Rules are evaluated in order and the
/// first match decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    #[serde(default)]
    pub name: Option<String>,
    /// Action names; `*` matches any action.
    pub actions: Vec<String>,
    /// Glob over the resource string.
    #[serde(default = "any_resource")]
    pub resource: String,
    /// A rule only matches callers at or above this level.
    #[serde(default)]
    pub min_trust: Option<TrustLevel>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    pub effect: Effect,
    #[serde(default)]
    pub reason: Option<String>,
}

fn any_resource() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Trust given to agents without a profile.
    #[serde(default = "default_trust")]
    pub default_trust: TrustLevel,
    #[serde(default)]
    pub profiles: Vec<TrustProfile>,
}

fn default_trust() -> TrustLevel {
    TrustLevel::Low
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            default_trust: default_trust(),
            profiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustProfile {
    pub agent_id: AgentId,
    #[serde(default = "unknown_agent_type")]
    pub agent_type: AgentType,
    pub trust_level: TrustLevel,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

fn unknown_agent_type() -> AgentType {
    AgentType::Unknown
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_true")]
    pub builtin: bool,
    #[serde(default)]
    pub patterns: Vec<GuardrailPatternConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailPatternConfig {
    pub name: String,
    #[serde(default = "custom_category")]
    pub category: String,
    pub severity: Severity,
    pub regex: String,
}

fn custom_category() -> String {
    "custom".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines file; absent means an in-memory log.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl KernelConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, KernelError> {
        serde_yaml::from_str(yaml).map_err(|e| KernelError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String, KernelError> {
        serde_yaml::to_string(self).map_err(|e| KernelError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), KernelError> {
        let locks = &self.locks;
        if locks.default_ttl.is_zero() {
            return Err(KernelError::Config("locks.default_ttl must be positive".into()));
        }
        if locks.default_ttl > locks.max_ttl {
            return Err(KernelError::Config(format!(
                "locks.default_ttl ({:?}) exceeds locks.max_ttl ({:?})",
                locks.default_ttl, locks.max_ttl
            )));
        }
        if locks.sweep_interval.is_some_and(|i| i.is_zero()) {
            return Err(KernelError::Config("locks.sweep_interval must be positive".into()));
        }

        if self.policy.version.trim().is_empty() {
            return Err(KernelError::Config("policy.version cannot be empty".into()));
        }
        for (i, rule) in self.policy.rules.iter().enumerate() {
            if rule.actions.is_empty() {
                return Err(KernelError::Config(format!("policy.rules[{i}] has no actions")));
            }
            glob::Pattern::new(&rule.resource).map_err(|e| {
                KernelError::Config(format!("policy.rules[{i}].resource '{}': {e}", rule.resource))
            })?;
        }

        let mut seen = HashSet::new();
        for profile in &self.trust.profiles {
            if !seen.insert(&profile.agent_id) {
                return Err(KernelError::Config(format!(
                    "duplicate trust profile for agent '{}'",
                    profile.agent_id
                )));
            }
        }

        for p in &self.guardrails.patterns {
            GuardrailPattern::new(p.name.clone(), p.category.clone(), p.severity, &p.regex)?;
        }
        Ok(())
    }
}
