//! Kernel - the public face of the coordination kernel.
//!
//! Every state-changing operation here calls `PolicyGate::enforce` before it
//! reaches the lock service or the task queue; a Deny returns `PolicyDenied`
//! with the decision already in the audit trail and no state touched.
//!
//! Pause fence: claims hold a read guard while they read the pause set and
//! claim, and pause-lock mutations hold the write guard, so a claim never
//! acts on a pause set that changed under it.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use crate::app::audit_trail::AuditTrail;
use crate::app::lock_service::LockService;
use crate::app::pause::PauseCoordinator;
use crate::app::status::KernelStatus;
use crate::app::sweeper::LockSweeper;
use crate::app::task_queue::{QUEUE_RESOURCE, TaskQueue};
use crate::domain::{
    Action, AgentId, AuditFilter, AuditRecord, Identity, KernelError, Lock, LockGrant, PolicyDecision,
    ReleaseOutcome, TaskCounts, TaskDraft, TaskId, TaskRecord, TaskStatus, pause_feature, pause_key,
};
use crate::policy::{GuardrailReport, PolicyGate};

pub struct Kernel {
    gate: PolicyGate,
    locks: Arc<LockService>,
    tasks: TaskQueue,
    pause: PauseCoordinator,
    audit: AuditTrail,
    pause_fence: RwLock<()>,
    sweep_interval: Option<Duration>,
}

impl Kernel {
    pub(crate) fn new(
        gate: PolicyGate,
        locks: Arc<LockService>,
        tasks: TaskQueue,
        audit: AuditTrail,
        sweep_interval: Option<Duration>,
    ) -> Self {
        Self {
            gate,
            pause: PauseCoordinator::new(Arc::clone(&locks)),
            locks,
            tasks,
            audit,
            pause_fence: RwLock::new(()),
            sweep_interval,
        }
    }

    // ----- identity & policy -----

    pub fn resolve(&self, agent_id: &AgentId) -> Identity {
        self.gate.resolve(agent_id)
    }

    /// Pre-clears an arbitrary action. The decision is audited either way.
    pub async fn authorize(
        &self,
        identity: &Identity,
        action: &Action,
        resource: &str,
    ) -> Result<PolicyDecision, KernelError> {
        self.gate.authorize(identity, action, resource).await
    }

    pub async fn check_guardrails(&self, identity: &Identity, description: &str) -> GuardrailReport {
        self.gate.check_guardrails(identity, description).await
    }

    // ----- locks -----

    /// `ttl` of `None` uses the configured default.
    pub async fn acquire_lock(
        &self,
        identity: &Identity,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<LockGrant, KernelError> {
        self.gate.enforce(identity, &Action::AcquireLock, key).await?;
        if pause_feature(key).is_some() {
            let _fence = self.pause_fence.write().await;
            return self.locks.acquire(key, &identity.agent_id, ttl).await;
        }
        self.locks.acquire(key, &identity.agent_id, ttl).await
    }

    pub async fn release_lock(&self, identity: &Identity, key: &str) -> Result<ReleaseOutcome, KernelError> {
        self.gate.enforce(identity, &Action::ReleaseLock, key).await?;
        if pause_feature(key).is_some() {
            let _fence = self.pause_fence.write().await;
            return self.locks.release(key, &identity.agent_id).await;
        }
        self.locks.release(key, &identity.agent_id).await
    }

    pub async fn lock_status(&self, key: &str) -> Result<Option<Lock>, KernelError> {
        self.locks.status(key).await
    }

    pub async fn list_locks(&self) -> Result<Vec<Lock>, KernelError> {
        self.locks.list().await
    }

    // ----- pause -----

    pub async fn pause_feature(
        &self,
        identity: &Identity,
        feature: &str,
        ttl: Option<Duration>,
    ) -> Result<LockGrant, KernelError> {
        let grant = self.acquire_lock(identity, &pause_key(feature), ttl).await?;
        info!(feature, agent = %identity.agent_id, until = %grant.expires_at(), "feature paused");
        Ok(grant)
    }

    pub async fn resume_feature(&self, identity: &Identity, feature: &str) -> Result<ReleaseOutcome, KernelError> {
        let outcome = self.release_lock(identity, &pause_key(feature)).await?;
        if outcome.released() {
            info!(feature, agent = %identity.agent_id, "feature resumed");
        }
        Ok(outcome)
    }

    /// Sorted ids of currently paused features.
    pub async fn paused_features(&self) -> Result<Vec<String>, KernelError> {
        let mut features: Vec<String> = self.pause.paused_features().await?.into_iter().collect();
        features.sort();
        Ok(features)
    }

    pub async fn is_paused(&self, feature: &str) -> Result<bool, KernelError> {
        self.pause.is_paused(feature).await
    }

    // ----- tasks -----

    pub async fn submit(&self, identity: &Identity, draft: TaskDraft) -> Result<TaskRecord, KernelError> {
        let mut records = self.submit_batch(identity, vec![draft]).await?;
        records
            .pop()
            .ok_or_else(|| KernelError::StoreUnavailable("store returned an empty batch".into()))
    }

    /// Each distinct task type in the batch is authorized before anything
    /// is inserted.
    pub async fn submit_batch(
        &self,
        identity: &Identity,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<TaskRecord>, KernelError> {
        let task_types: BTreeSet<String> = drafts.iter().map(|d| d.task_type.clone()).collect();
        for task_type in &task_types {
            self.gate.enforce(identity, &Action::SubmitWork, task_type).await?;
        }
        self.tasks.submit_batch(&identity.agent_id, drafts).await
    }

    /// `Ok(None)` when nothing is eligible: deps unfinished, feature paused,
    /// or an empty queue.
    pub async fn claim(&self, identity: &Identity) -> Result<Option<TaskRecord>, KernelError> {
        self.gate.enforce(identity, &Action::ClaimWork, QUEUE_RESOURCE).await?;
        let _fence = self.pause_fence.read().await;
        let paused = self.pause.paused_features().await?;
        self.tasks.claim(&identity.agent_id, &paused).await
    }

    pub async fn get_task(&self, task_id: TaskId) -> Result<TaskRecord, KernelError> {
        self.tasks.get(task_id).await
    }

    pub async fn complete(
        &self,
        identity: &Identity,
        task_id: TaskId,
        result: serde_json::Value,
    ) -> Result<TaskRecord, KernelError> {
        self.gate
            .enforce(identity, &Action::CompleteWork, &task_id.to_string())
            .await?;
        self.tasks.complete(task_id, &identity.agent_id, result).await
    }

    pub async fn fail(
        &self,
        identity: &Identity,
        task_id: TaskId,
        error: impl Into<String>,
    ) -> Result<TaskRecord, KernelError> {
        self.gate.enforce(identity, &Action::FailWork, &task_id.to_string()).await?;
        self.tasks.fail(task_id, &identity.agent_id, error.into()).await
    }

    pub async fn cancel(&self, identity: &Identity, task_id: TaskId) -> Result<TaskRecord, KernelError> {
        self.gate.enforce(identity, &Action::CancelWork, &task_id.to_string()).await?;
        self.tasks.cancel(&identity.agent_id, task_id).await
    }

    pub async fn reschedule(&self, identity: &Identity, task_id: TaskId) -> Result<TaskRecord, KernelError> {
        self.gate
            .enforce(identity, &Action::RescheduleWork, &task_id.to_string())
            .await?;
        self.tasks.reschedule(&identity.agent_id, task_id).await
    }

    pub async fn dependents(&self, task_id: TaskId) -> Result<Vec<TaskId>, KernelError> {
        self.tasks.dependents(task_id).await
    }

    /// Cancels `task_id` and everything that transitively depends on it.
    ///
    /// Each step is an ordinary gated `cancel`; tasks already Completed,
    /// Failed or Cancelled are skipped. Returns the ids cancelled by this
    /// call, in breadth-first order. Stops at the first error, leaving the
    /// tasks cancelled so far cancelled.
    pub async fn cancel_cascade(&self, identity: &Identity, task_id: TaskId) -> Result<Vec<TaskId>, KernelError> {
        let mut cancelled = Vec::new();
        let mut visited = HashSet::from([task_id]);
        let mut frontier = VecDeque::from([task_id]);

        while let Some(id) = frontier.pop_front() {
            let task = self.tasks.get(id).await?;
            if matches!(task.status, TaskStatus::Pending | TaskStatus::Claimed) {
                self.cancel(identity, id).await?;
                cancelled.push(id);
            }
            for dependent in self.tasks.dependents(id).await? {
                if visited.insert(dependent) {
                    frontier.push_back(dependent);
                }
            }
        }

        info!(root = %task_id, cancelled = cancelled.len(), agent = %identity.agent_id, "cancellation cascaded");
        Ok(cancelled)
    }

    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRecord>, KernelError> {
        self.tasks.list(status).await
    }

    pub async fn counts(&self) -> Result<TaskCounts, KernelError> {
        self.tasks.counts().await
    }

    // ----- audit & status -----

    pub async fn audit_query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, KernelError> {
        self.audit.query(filter).await
    }

    pub async fn status(&self) -> Result<KernelStatus, KernelError> {
        Ok(KernelStatus {
            policy_version: self.gate.policy_version().to_string(),
            tasks: self.tasks.counts().await?,
            live_locks: self.locks.list().await?.len(),
            paused_features: self.paused_features().await?,
            audit_gaps: self.audit.missed_records(),
        })
    }

    /// Starts the background sweeper when `locks.sweep_interval` is set.
    pub fn spawn_sweeper(&self) -> Option<LockSweeper> {
        self.sweep_interval
            .map(|every| LockSweeper::spawn(Arc::clone(&self.locks), every))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::KernelBuilder;
    use crate::config::{KernelConfig, TrustProfile};
    use crate::domain::{AgentType, AuditEvent, Effect, TrustLevel};
    use crate::ports::{Clock, FixedClock};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct Fixture {
        kernel: Kernel,
        clock: Arc<FixedClock>,
    }

    fn profile(agent: &str, trust_level: TrustLevel) -> TrustProfile {
        TrustProfile {
            agent_id: agent.into(),
            agent_type: AgentType::Local,
            trust_level,
            capabilities: Default::default(),
        }
    }

    fn fixture() -> Fixture {
        let mut config = KernelConfig::default();
        config.trust.profiles = vec![
            profile("agent-a", TrustLevel::Standard),
            profile("agent-b", TrustLevel::Standard),
            profile("lead", TrustLevel::Elevated),
        ];
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()));
        let kernel = KernelBuilder::new(config)
            .with_clock(clock.clone())
            .build()
            .unwrap();
        Fixture { kernel, clock }
    }

    impl Fixture {
        fn who(&self, agent: &str) -> Identity {
            self.kernel.resolve(&agent.into())
        }
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn scenario_lock_contention() {
        let f = fixture();
        let (a, b) = (f.who("agent-a"), f.who("agent-b"));

        let grant = f.kernel.acquire_lock(&a, "file.py", Some(MINUTE)).await.unwrap();
        assert_eq!(grant.expires_at(), f.clock.now() + chrono::Duration::seconds(60));

        let err = f.kernel.acquire_lock(&b, "file.py", Some(MINUTE)).await.unwrap_err();
        assert!(matches!(err, KernelError::LockHeld { ref holder, .. } if holder == &a.agent_id));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn scenario_dependency_gating() {
        let f = fixture();
        let a = f.who("agent-a");
        let t1 = f.kernel.submit(&a, TaskDraft::new("edit", json!({"n": 1}))).await.unwrap().id;
        let t2 = f
            .kernel
            .submit(&a, TaskDraft::new("edit", json!({"n": 2})).depends_on(t1))
            .await
            .unwrap()
            .id;

        assert_eq!(f.kernel.claim(&a).await.unwrap().map(|t| t.id), Some(t1));
        assert_eq!(f.kernel.claim(&a).await.unwrap(), None);

        f.kernel.complete(&a, t1, json!("patched")).await.unwrap();
        assert_eq!(f.kernel.claim(&a).await.unwrap().map(|t| t.id), Some(t2));
        assert_eq!(f.kernel.get_task(t1).await.unwrap().result, Some(json!("patched")));
    }

    #[tokio::test]
    async fn scenario_wrong_claimant() {
        let f = fixture();
        let (a, b) = (f.who("agent-a"), f.who("agent-b"));
        let t1 = f.kernel.submit(&a, TaskDraft::new("edit", json!(null))).await.unwrap().id;
        f.kernel.claim(&a).await.unwrap();

        let err = f.kernel.complete(&b, t1, json!("mine")).await.unwrap_err();
        assert!(matches!(err, KernelError::NotClaimant { .. }));

        let done = f.kernel.complete(&a, t1, json!("ours")).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result, Some(json!("ours")));

        // Completed results are immutable.
        assert!(matches!(
            f.kernel.complete(&a, t1, json!("again")).await,
            Err(KernelError::InvalidTransition { .. })
        ));
        assert_eq!(f.kernel.get_task(t1).await.unwrap().result, Some(json!("ours")));
    }

    #[tokio::test]
    async fn refused_operations_are_in_the_trail() {
        let f = fixture();
        let (a, b) = (f.who("agent-a"), f.who("agent-b"));
        f.kernel.acquire_lock(&a, "file.py", Some(MINUTE)).await.unwrap();
        let held = f.kernel.acquire_lock(&b, "file.py", Some(MINUTE)).await.unwrap_err();
        assert!(matches!(held, KernelError::LockHeld { .. }));

        let t1 = f.kernel.submit(&a, TaskDraft::new("edit", json!(null))).await.unwrap().id;
        f.kernel.claim(&a).await.unwrap();
        let not_mine = f.kernel.complete(&b, t1, json!("mine")).await.unwrap_err();
        assert!(matches!(not_mine, KernelError::NotClaimant { .. }));

        let trail = f
            .kernel
            .audit_query(&AuditFilter::default().actor("agent-b"))
            .await
            .unwrap();
        let kinds: Vec<_> = trail.iter().map(|r| r.event.kind()).collect();
        assert_eq!(kinds, vec!["decision", "rejected", "decision", "rejected"]);

        let rejected: Vec<_> = trail
            .iter()
            .filter_map(|r| match &r.event {
                AuditEvent::Rejected { action, resource, error } => {
                    Some((action.clone(), resource.clone(), error.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            rejected,
            vec![
                (Action::AcquireLock, "file.py".to_string(), held.to_string()),
                (Action::CompleteWork, t1.to_string(), not_mine.to_string()),
            ]
        );

        let on_task = f.kernel.audit_query(&AuditFilter::default().task(t1)).await.unwrap();
        assert!(on_task.iter().any(|r| r.event.kind() == "rejected"));
        assert_eq!(f.kernel.status().await.unwrap().audit_gaps, 0);
    }

    #[tokio::test]
    async fn fail_is_reserved_to_the_claimant() {
        let f = fixture();
        let (a, b) = (f.who("agent-a"), f.who("agent-b"));
        let t1 = f.kernel.submit(&a, TaskDraft::new("edit", json!(null))).await.unwrap().id;
        let t2 = f
            .kernel
            .submit(&a, TaskDraft::new("edit", json!(null)).depends_on(t1))
            .await
            .unwrap()
            .id;
        f.kernel.claim(&a).await.unwrap();

        let err = f.kernel.fail(&b, t1, "not my task").await.unwrap_err();
        assert!(matches!(err, KernelError::NotClaimant { ref agent, .. } if agent == &b.agent_id));
        let task = f.kernel.get_task(t1).await.unwrap();
        assert_eq!(task.status, TaskStatus::Claimed);
        assert_eq!(task.claimed_by, Some(a.agent_id.clone()));
        assert_eq!(task.error, None);

        let err = f.kernel.fail(&a, t2, "too early").await.unwrap_err();
        assert!(matches!(
            err,
            KernelError::InvalidTransition { from: TaskStatus::Pending, operation: "fail", .. }
        ));
        assert_eq!(f.kernel.get_task(t2).await.unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn scenario_fail_then_reschedule() {
        let f = fixture();
        let (a, lead) = (f.who("agent-a"), f.who("lead"));
        let t3 = f.kernel.submit(&a, TaskDraft::new("test", json!(null))).await.unwrap().id;
        f.kernel.claim(&a).await.unwrap();
        f.kernel.fail(&a, t3, "timeout").await.unwrap();

        let task = f.kernel.reschedule(&lead, t3).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.claimed_by, None);
        assert_eq!(f.kernel.claim(&a).await.unwrap().map(|t| t.id), Some(t3));
    }

    #[tokio::test]
    async fn scenario_pause_lock() {
        let f = fixture();
        let (a, lead) = (f.who("agent-a"), f.who("lead"));

        f.kernel.pause_feature(&lead, "f1", Some(MINUTE)).await.unwrap();
        let tagged = f
            .kernel
            .submit(&a, TaskDraft::new("edit", json!(null)).with_feature("f1"))
            .await
            .unwrap()
            .id;

        assert_eq!(f.kernel.claim(&a).await.unwrap(), None);
        assert_eq!(f.kernel.paused_features().await.unwrap(), vec!["f1".to_string()]);

        assert!(f.kernel.release_lock(&lead, "feature:f1:pause").await.unwrap().released());
        assert_eq!(f.kernel.claim(&a).await.unwrap().map(|t| t.id), Some(tagged));
    }

    #[tokio::test]
    async fn scenario_policy_denial_is_audited() {
        let f = fixture();
        let low = f.who("unregistered-bot");
        assert_eq!(low.trust_level, TrustLevel::Low);

        let decision = f
            .kernel
            .authorize(&low, &Action::from("delete_table"), "users")
            .await
            .unwrap();
        assert_eq!(decision.decision, Effect::Deny);

        let denied = f
            .kernel
            .audit_query(&AuditFilter::default().actor("unregistered-bot").decision(Effect::Deny))
            .await
            .unwrap();
        assert_eq!(denied.len(), 1);
        match &denied[0].event {
            AuditEvent::Decision(d) => {
                assert_eq!(d.action, Action::Custom("delete_table".into()));
                assert_eq!(d.resource, "users");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn denied_mutation_touches_no_state() {
        let f = fixture();
        let low = f.who("unregistered-bot");

        let err = f.kernel.acquire_lock(&low, "file.py", None).await.unwrap_err();
        assert!(matches!(err, KernelError::PolicyDenied { .. }));
        assert_eq!(f.kernel.lock_status("file.py").await.unwrap(), None);

        let err = f.kernel.submit(&low, TaskDraft::new("edit", json!(null))).await.unwrap_err();
        assert!(matches!(err, KernelError::PolicyDenied { .. }));
        assert_eq!(f.kernel.counts().await.unwrap().total(), 0);

        let mutations = f
            .kernel
            .audit_query(&AuditFilter::default().kind("lock_acquired"))
            .await
            .unwrap();
        assert!(mutations.is_empty());
    }

    #[tokio::test]
    async fn standard_agent_cannot_pause_or_cancel() {
        let f = fixture();
        let a = f.who("agent-a");
        let t = f.kernel.submit(&a, TaskDraft::new("edit", json!(null))).await.unwrap().id;

        assert!(matches!(
            f.kernel.pause_feature(&a, "f1", None).await,
            Err(KernelError::PolicyDenied { .. })
        ));
        assert!(matches!(
            f.kernel.cancel(&a, t).await,
            Err(KernelError::PolicyDenied { .. })
        ));
        assert_eq!(f.kernel.get_task(t).await.unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn cancel_cascade_walks_dependents() {
        let f = fixture();
        let (a, lead) = (f.who("agent-a"), f.who("lead"));
        let batch = f
            .kernel
            .submit_batch(
                &a,
                vec![
                    TaskDraft::new("design", json!(null)).with_key("design"),
                    TaskDraft::new("impl", json!(null)).with_key("impl").depends_on_key("design"),
                    TaskDraft::new("test", json!(null)).with_key("test").depends_on_key("impl"),
                    TaskDraft::new("docs", json!(null)).with_key("docs").depends_on_key("design"),
                ],
            )
            .await
            .unwrap();
        let ids: Vec<TaskId> = batch.iter().map(|t| t.id).collect();
        let unrelated = f.kernel.submit(&a, TaskDraft::new("chore", json!(null))).await.unwrap().id;

        let cancelled = f.kernel.cancel_cascade(&lead, ids[0]).await.unwrap();
        assert_eq!(cancelled.len(), 4);
        assert_eq!(cancelled[0], ids[0]);
        for id in &ids {
            assert_eq!(f.kernel.get_task(*id).await.unwrap().status, TaskStatus::Cancelled);
        }

        // Cancelled tasks are never claimed again.
        assert_eq!(f.kernel.claim(&a).await.unwrap().map(|t| t.id), Some(unrelated));
        assert_eq!(f.kernel.claim(&a).await.unwrap(), None);
        assert!(f.kernel.cancel_cascade(&lead, ids[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cyclic_batch_is_rejected_whole() {
        let f = fixture();
        let a = f.who("agent-a");
        let err = f
            .kernel
            .submit_batch(
                &a,
                vec![
                    TaskDraft::new("x", json!(null)).with_key("a").depends_on_key("b"),
                    TaskDraft::new("x", json!(null)).with_key("b").depends_on_key("a"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::CyclicDependency { .. }));
        assert_eq!(f.kernel.counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn pause_lock_expiry_resumes_claims() {
        let f = fixture();
        let (a, lead) = (f.who("agent-a"), f.who("lead"));
        f.kernel.pause_feature(&lead, "f2", Some(MINUTE)).await.unwrap();
        let t = f
            .kernel
            .submit(&a, TaskDraft::new("edit", json!(null)).with_feature("f2"))
            .await
            .unwrap()
            .id;
        assert!(f.kernel.is_paused("f2").await.unwrap());
        assert_eq!(f.kernel.claim(&a).await.unwrap(), None);

        f.clock.advance(MINUTE);
        assert!(!f.kernel.is_paused("f2").await.unwrap());
        assert_eq!(f.kernel.claim(&a).await.unwrap().map(|t| t.id), Some(t));
    }

    #[tokio::test]
    async fn status_snapshot() {
        let f = fixture();
        let (a, lead) = (f.who("agent-a"), f.who("lead"));
        f.kernel.submit(&a, TaskDraft::new("edit", json!(null))).await.unwrap();
        f.kernel.acquire_lock(&a, "src/lib.rs", None).await.unwrap();
        f.kernel.pause_feature(&lead, "billing", None).await.unwrap();

        let status = f.kernel.status().await.unwrap();
        assert_eq!(status.tasks.pending, 1);
        assert_eq!(status.live_locks, 2);
        assert_eq!(status.paused_features, vec!["billing".to_string()]);
        assert_eq!(status.policy_version, KernelConfig::default().policy.version);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pause_and_claims_race_safely() {
        let f = Arc::new(fixture());
        let a = f.who("agent-a");
        let lead = f.who("lead");
        for i in 0..16 {
            f.kernel
                .submit(&a, TaskDraft::new("edit", json!(i)).with_feature("f1"))
                .await
                .unwrap();
        }

        f.kernel.pause_feature(&lead, "f1", Some(MINUTE)).await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let f = Arc::clone(&f);
            let a = a.clone();
            handles.push(tokio::spawn(async move { f.kernel.claim(&a).await.unwrap() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), None);
        }
    }
}
