//! Policy ports: identity resolution and decision evaluation.
//!
//! Both are pure lookups from the kernel's point of view. Neither may touch
//! lock or task state.

use crate::domain::{Action, AgentId, Identity, Verdict};

/// Resolves a caller id to its trust level and capabilities.
pub trait TrustRegistry: Send + Sync {
    /// Unknown agents still resolve (to the registry's default profile), so
    /// the policy evaluator always sees an identity.
    fn resolve(&self, agent_id: &AgentId) -> Identity;
}

/// Decision backend: a native rule table, an external policy engine, ...
///
/// Must be a pure function of its inputs and the policy version.
pub trait PolicyEvaluator: Send + Sync {
    fn evaluate(&self, identity: &Identity, action: &Action, resource: &str, policy_version: &str) -> Verdict;

    /// Version of the policy currently loaded.
    fn version(&self) -> &str;
}
