//! PolicyGate - the single authorization point in front of every mutation.
//!
//! `authorize` evaluates and records; it never touches lock or task state.
//! The decision is appended before it is returned, so an unreachable audit
//! sink fails the request closed even when the verdict was Allow.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::app::audit_trail::AuditTrail;
use crate::domain::{Action, AgentId, AuditEvent, Identity, KernelError, PolicyDecision};
use crate::policy::guardrails::{GuardrailReport, Guardrails};
use crate::ports::{Clock, PolicyEvaluator, TrustRegistry};

pub struct PolicyGate {
    trust: Arc<dyn TrustRegistry>,
    evaluator: Arc<dyn PolicyEvaluator>,
    guardrails: Guardrails,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
}

impl PolicyGate {
    pub fn new(
        trust: Arc<dyn TrustRegistry>,
        evaluator: Arc<dyn PolicyEvaluator>,
        guardrails: Guardrails,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            trust,
            evaluator,
            guardrails,
            audit,
            clock,
        }
    }

    pub fn resolve(&self, agent_id: &AgentId) -> Identity {
        self.trust.resolve(agent_id)
    }

    pub fn policy_version(&self) -> &str {
        self.evaluator.version()
    }

    pub async fn authorize(
        &self,
        identity: &Identity,
        action: &Action,
        resource: &str,
    ) -> Result<PolicyDecision, KernelError> {
        let version = self.evaluator.version();
        let verdict = self.evaluator.evaluate(identity, action, resource, version);
        let decision = PolicyDecision {
            actor: identity.agent_id.clone(),
            trust_level: identity.trust_level,
            action: action.clone(),
            resource: resource.to_string(),
            decision: verdict.effect,
            reason: verdict.reason,
            policy_version: version.to_string(),
            timestamp: self.clock.now(),
        };

        self.audit
            .record(&identity.agent_id, AuditEvent::Decision(decision.clone()))
            .await?;

        if decision.is_allowed() {
            debug!(agent = %identity.agent_id, %action, resource, "authorized");
        } else {
            warn!(
                agent = %identity.agent_id,
                trust = %identity.trust_level,
                %action,
                resource,
                reason = %decision.reason,
                "policy denied"
            );
        }
        Ok(decision)
    }

    /// `authorize`, with Deny mapped to `PolicyDenied`.
    pub async fn enforce(
        &self,
        identity: &Identity,
        action: &Action,
        resource: &str,
    ) -> Result<PolicyDecision, KernelError> {
        let decision = self.authorize(identity, action, resource).await?;
        if !decision.is_allowed() {
            return Err(KernelError::PolicyDenied {
                action: decision.action.to_string(),
                resource: decision.resource,
                reason: decision.reason,
            });
        }
        Ok(decision)
    }

    /// Advisory. Hits are logged and audited but nothing is blocked here.
    pub async fn check_guardrails(&self, identity: &Identity, description: &str) -> GuardrailReport {
        let report = self.guardrails.check(description);
        if report.is_clean() {
            debug!(agent = %identity.agent_id, "guardrails clean");
            return report;
        }

        let patterns = report.pattern_names();
        warn!(
            agent = %identity.agent_id,
            patterns = ?patterns,
            severity = ?report.max_severity(),
            "guardrail violations"
        );
        self.audit
            .record_committed(
                &identity.agent_id,
                AuditEvent::GuardrailViolations {
                    description: description.to_string(),
                    patterns,
                },
            )
            .await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentType, AuditFilter, AuditRecord, Effect, TrustLevel};
    use crate::impls::{InMemoryAuditLog, StaticEvaluator};
    use crate::ports::{AuditSink, SystemClock, UlidGenerator};
    use async_trait::async_trait;

    struct UnreachableSink;

    #[async_trait]
    impl AuditSink for UnreachableSink {
        async fn append(&self, _record: AuditRecord) -> Result<(), KernelError> {
            Err(KernelError::StoreUnavailable("connection refused".into()))
        }

        async fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditRecord>, KernelError> {
            Err(KernelError::StoreUnavailable("connection refused".into()))
        }
    }

    struct NoProfiles;

    impl TrustRegistry for NoProfiles {
        fn resolve(&self, agent_id: &AgentId) -> Identity {
            Identity::new(agent_id.clone(), AgentType::Unknown, TrustLevel::Low)
        }
    }

    fn gate(evaluator: StaticEvaluator, sink: Arc<dyn AuditSink>) -> PolicyGate {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        PolicyGate::new(
            Arc::new(NoProfiles),
            Arc::new(evaluator),
            Guardrails::builtin(),
            AuditTrail::new(sink, Arc::clone(&clock), ids),
            clock,
        )
    }

    #[tokio::test]
    async fn deny_is_returned_and_audited() {
        let log = Arc::new(InMemoryAuditLog::new());
        let gate = gate(StaticEvaluator::deny_all(), log.clone());
        let who = gate.resolve(&"low".into());

        let decision = gate.authorize(&who, &Action::from("delete_table"), "users").await.unwrap();
        assert_eq!(decision.decision, Effect::Deny);

        let denied = log.query(&AuditFilter::default().decision(Effect::Deny)).await.unwrap();
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].actor, AgentId::new("low"));
    }

    #[tokio::test]
    async fn enforce_maps_deny_to_policy_denied() {
        let log = Arc::new(InMemoryAuditLog::new());
        let gate = gate(StaticEvaluator::deny_all(), log.clone());
        let who = gate.resolve(&"low".into());

        let err = gate.enforce(&who, &Action::AcquireLock, "file.py").await.unwrap_err();
        assert!(matches!(
            err,
            KernelError::PolicyDenied { ref action, ref resource, .. } if action == "acquire_lock" && resource == "file.py"
        ));
    }

    #[tokio::test]
    async fn unreachable_audit_fails_closed_even_on_allow() {
        let gate = gate(StaticEvaluator::allow_all(), Arc::new(UnreachableSink));
        let who = gate.resolve(&"a".into());

        let err = gate.enforce(&who, &Action::ClaimWork, "queue").await.unwrap_err();
        assert!(matches!(err, KernelError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn guardrail_hits_are_audited_but_not_blocking() {
        let log = Arc::new(InMemoryAuditLog::new());
        let gate = gate(StaticEvaluator::allow_all(), log.clone());
        let who = gate.resolve(&"a".into());

        let report = gate.check_guardrails(&who, "rm -rf build/").await;
        assert!(!report.is_clean());
        let hits = log.query(&AuditFilter::default().kind("guardrail_violations")).await.unwrap();
        assert_eq!(hits.len(), 1);

        let clean = gate.check_guardrails(&who, "cargo fmt").await;
        assert!(clean.is_clean());
        assert_eq!(log.len().await, 1);
    }
}
