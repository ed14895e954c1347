//! TaskQueue - dependency-gated work queue.
//!
//! Each mutation is one store call (one atomic step). Committed transitions
//! are logged and appended to the audit trail; refused ones are appended as
//! rejections.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::app::audit_trail::AuditTrail;
use crate::domain::{
    Action, AgentId, AuditEvent, KernelError, TaskCounts, TaskDraft, TaskId, TaskRecord, TaskStatus,
};
use crate::ports::{Clock, IdGenerator, TaskStore};

/// Resource name used when authorizing a claim.
pub const QUEUE_RESOURCE: &str = "queue";

/// Distinct task types of a batch, sorted and comma-joined.
fn batch_task_types(drafts: &[TaskDraft]) -> String {
    let types: BTreeSet<&str> = drafts.iter().map(|d| d.task_type.as_str()).collect();
    types.into_iter().collect::<Vec<_>>().join(",")
}

pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskQueue {
    pub fn new(
        store: Arc<dyn TaskStore>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            audit,
            clock,
            ids,
        }
    }

    /// All-or-nothing: either every draft becomes a Pending task or none does.
    pub(crate) async fn submit_batch(
        &self,
        actor: &AgentId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<TaskRecord>, KernelError> {
        let ids: Vec<TaskId> = drafts.iter().map(|_| self.ids.generate_task_id()).collect();
        let task_types = batch_task_types(&drafts);
        let records = match self.store.insert_batch(drafts, ids, self.clock.now()).await {
            Ok(records) => records,
            Err(e) => return Err(self.audit.record_rejected(actor, Action::SubmitWork, task_types, e).await),
        };

        for record in &records {
            info!(
                task_id = %record.id,
                task_type = %record.task_type,
                deps = record.deps.len(),
                feature = record.feature.as_deref(),
                agent = %actor,
                "task submitted"
            );
            self.audit
                .record_committed(
                    actor,
                    AuditEvent::TaskSubmitted {
                        task_id: record.id,
                        task_type: record.task_type.clone(),
                    },
                )
                .await;
        }
        Ok(records)
    }

    pub(crate) async fn claim(
        &self,
        agent: &AgentId,
        paused_features: &HashSet<String>,
    ) -> Result<Option<TaskRecord>, KernelError> {
        let claimed = match self.store.claim_next(agent, paused_features, self.clock.now()).await {
            Ok(claimed) => claimed,
            Err(e) => return Err(self.audit.record_rejected(agent, Action::ClaimWork, QUEUE_RESOURCE, e).await),
        };
        let Some(task) = claimed else {
            debug!(agent = %agent, paused = paused_features.len(), "no eligible task");
            return Ok(None);
        };

        info!(task_id = %task.id, agent = %agent, attempt = task.attempts, "task claimed");
        self.audit
            .record_committed(agent, AuditEvent::TaskClaimed { task_id: task.id })
            .await;
        Ok(Some(task))
    }

    async fn reject(&self, agent: &AgentId, action: Action, task_id: TaskId, error: KernelError) -> KernelError {
        self.audit
            .record_rejected(agent, action, task_id.to_string(), error)
            .await
    }

    pub async fn get(&self, task_id: TaskId) -> Result<TaskRecord, KernelError> {
        self.store
            .get(task_id)
            .await?
            .ok_or(KernelError::TaskNotFound(task_id))
    }

    pub(crate) async fn complete(
        &self,
        task_id: TaskId,
        agent: &AgentId,
        result: serde_json::Value,
    ) -> Result<TaskRecord, KernelError> {
        let task = match self.store.complete(task_id, agent, result, self.clock.now()).await {
            Ok(task) => task,
            Err(e) => return Err(self.reject(agent, Action::CompleteWork, task_id, e).await),
        };
        info!(task_id = %task_id, agent = %agent, "task completed");
        self.audit
            .record_committed(agent, AuditEvent::TaskCompleted { task_id })
            .await;
        Ok(task)
    }

    pub(crate) async fn fail(
        &self,
        task_id: TaskId,
        agent: &AgentId,
        error: String,
    ) -> Result<TaskRecord, KernelError> {
        let task = match self.store.fail(task_id, agent, error.clone(), self.clock.now()).await {
            Ok(task) => task,
            Err(e) => return Err(self.reject(agent, Action::FailWork, task_id, e).await),
        };
        info!(task_id = %task_id, agent = %agent, error = %error, "task failed");
        self.audit
            .record_committed(agent, AuditEvent::TaskFailed { task_id, error })
            .await;
        Ok(task)
    }

    pub(crate) async fn cancel(&self, actor: &AgentId, task_id: TaskId) -> Result<TaskRecord, KernelError> {
        let task = match self.store.cancel(task_id, self.clock.now()).await {
            Ok(task) => task,
            Err(e) => return Err(self.reject(actor, Action::CancelWork, task_id, e).await),
        };
        info!(task_id = %task_id, agent = %actor, "task cancelled");
        self.audit
            .record_committed(actor, AuditEvent::TaskCancelled { task_id })
            .await;
        Ok(task)
    }

    pub(crate) async fn reschedule(&self, actor: &AgentId, task_id: TaskId) -> Result<TaskRecord, KernelError> {
        let task = match self.store.reschedule(task_id, self.clock.now()).await {
            Ok(task) => task,
            Err(e) => return Err(self.reject(actor, Action::RescheduleWork, task_id, e).await),
        };
        info!(task_id = %task_id, agent = %actor, attempts = task.attempts, "task rescheduled");
        self.audit
            .record_committed(actor, AuditEvent::TaskRescheduled { task_id })
            .await;
        Ok(task)
    }

    /// Direct dependents only.
    pub async fn dependents(&self, task_id: TaskId) -> Result<Vec<TaskId>, KernelError> {
        self.store.dependents(task_id).await
    }

    pub async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRecord>, KernelError> {
        self.store.list(status).await
    }

    pub async fn counts(&self) -> Result<TaskCounts, KernelError> {
        self.store.counts().await
    }
}
