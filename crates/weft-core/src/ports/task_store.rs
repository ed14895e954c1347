//! TaskStore port - exclusive owner of task rows.
//!
//! Like `LockStore`, every method is a single atomic step. Transition rules
//! live on `TaskRecord`; a store loads the row(s), applies the rule and
//! writes back inside one critical section or transaction, so a rejected
//! transition never leaves a partial write behind.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AgentId, KernelError, TaskCounts, TaskDraft, TaskId, TaskRecord, TaskStatus};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts all drafts as `Pending`, or nothing at all.
    ///
    /// `ids[i]` is the id to assign to `drafts[i]`. Fails with
    /// `TaskNotFound` for an unknown existing dependency, `InvalidArgument`
    /// for an unknown or duplicate batch key, and `CyclicDependency` when
    /// the batch edges form a cycle.
    async fn insert_batch(
        &self,
        drafts: Vec<TaskDraft>,
        ids: Vec<TaskId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, KernelError>;

    /// Claims the first eligible task in `(priority, seq)` order.
    ///
    /// Eligible: `Pending`, every dependency `Completed`, and its feature (if
    /// any) not in `paused_features`. `Ok(None)` when nothing is eligible.
    async fn claim_next(
        &self,
        agent: &AgentId,
        paused_features: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskRecord>, KernelError>;

    async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, KernelError>;

    async fn complete(
        &self,
        task_id: TaskId,
        agent: &AgentId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, KernelError>;

    async fn fail(
        &self,
        task_id: TaskId,
        agent: &AgentId,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, KernelError>;

    async fn cancel(&self, task_id: TaskId, now: DateTime<Utc>) -> Result<TaskRecord, KernelError>;

    async fn reschedule(&self, task_id: TaskId, now: DateTime<Utc>) -> Result<TaskRecord, KernelError>;

    /// Tasks that list `task_id` as a direct dependency.
    async fn dependents(&self, task_id: TaskId) -> Result<Vec<TaskId>, KernelError>;

    /// Tasks in submission order, optionally restricted to one status.
    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRecord>, KernelError>;

    async fn counts(&self) -> Result<TaskCounts, KernelError>;
}
