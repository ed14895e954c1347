//! Task records and their state machine.
//!
//! State transitions:
//! - Pending -> Claimed -> Completed
//! - Pending -> Claimed -> Failed -> Pending (explicit reschedule only)
//! - Pending | Claimed -> Cancelled
//!
//! Every transition method validates first and mutates last, so a rejected
//! transition leaves the record untouched.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::KernelError;
use super::ids::{AgentId, TaskId};

pub const DEFAULT_PRIORITY: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Claimed,
    Completed,
    Failed,
    Cancelled,
}

/// Reference to a dependency inside a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepRef {
    /// A task that already exists in the queue.
    Existing(TaskId),
    /// Another draft of the same batch, by its batch-local key.
    Batch(String),
}

/// A task to submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Batch-local key other drafts may depend on.
    #[serde(default)]
    pub key: Option<String>,
    pub task_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub deps: Vec<DepRef>,
    /// Feature tag consulted against the pause namespace.
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

impl TaskDraft {
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            key: None,
            task_type: task_type.into(),
            payload,
            deps: Vec::new(),
            feature: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn depends_on(mut self, task_id: TaskId) -> Self {
        self.deps.push(DepRef::Existing(task_id));
        self
    }

    pub fn depends_on_key(mut self, key: impl Into<String>) -> Self {
        self.deps.push(DepRef::Batch(key.into()));
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// Single source of truth for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    /// Submission order; breaks priority ties deterministically.
    pub seq: u64,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub deps: BTreeSet<TaskId>,
    pub feature: Option<String>,
    pub priority: u8,
    pub status: TaskStatus,
    pub claimed_by: Option<AgentId>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Number of claims so far (reschedules make this grow).
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(
        id: TaskId,
        seq: u64,
        draft: &TaskDraft,
        deps: BTreeSet<TaskId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            seq,
            task_type: draft.task_type.clone(),
            payload: draft.payload.clone(),
            deps,
            feature: draft.feature.clone(),
            priority: draft.priority,
            status: TaskStatus::Pending,
            claimed_by: None,
            result: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            claimed_at: None,
            finished_at: None,
        }
    }

    /// Claim ordering key: most urgent first, then submission order.
    pub fn claim_order(&self) -> (u8, u64) {
        (self.priority, self.seq)
    }

    fn invalid(&self, operation: &'static str) -> KernelError {
        KernelError::InvalidTransition {
            task_id: self.id,
            from: self.status,
            operation,
        }
    }

    fn ensure_claimant(&self, agent: &AgentId, operation: &'static str) -> Result<(), KernelError> {
        if self.status != TaskStatus::Claimed {
            return Err(self.invalid(operation));
        }
        if self.claimed_by.as_ref() != Some(agent) {
            return Err(KernelError::NotClaimant {
                task_id: self.id,
                agent: agent.clone(),
            });
        }
        Ok(())
    }

    /// Pending -> Claimed. Dependency and pause checks are the store's job,
    /// because they need other rows.
    pub fn claim(&mut self, agent: &AgentId, now: DateTime<Utc>) -> Result<(), KernelError> {
        if self.status != TaskStatus::Pending {
            return Err(self.invalid("claim"));
        }
        self.status = TaskStatus::Claimed;
        self.claimed_by = Some(agent.clone());
        self.attempts += 1;
        self.claimed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Claimed -> Completed, by the claimant only.
    pub fn complete(
        &mut self,
        agent: &AgentId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), KernelError> {
        self.ensure_claimant(agent, "complete")?;
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.finished_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Claimed -> Failed, by the claimant only.
    pub fn fail(&mut self, agent: &AgentId, error: String, now: DateTime<Utc>) -> Result<(), KernelError> {
        self.ensure_claimant(agent, "fail")?;
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Pending | Claimed -> Cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), KernelError> {
        if !matches!(self.status, TaskStatus::Pending | TaskStatus::Claimed) {
            return Err(self.invalid("cancel"));
        }
        self.status = TaskStatus::Cancelled;
        self.finished_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Failed -> Pending. Clears the claimant; the error stays for inspection
    /// until the next claim outcome replaces it.
    pub fn reschedule(&mut self, now: DateTime<Utc>) -> Result<(), KernelError> {
        if self.status != TaskStatus::Failed {
            return Err(self.invalid("reschedule"));
        }
        self.status = TaskStatus::Pending;
        self.claimed_by = None;
        self.claimed_at = None;
        self.finished_at = None;
        self.updated_at = now;
        Ok(())
    }
}

/// Per-status counts for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl TaskCounts {
    pub fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Claimed => self.claimed += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.claimed + self.completed + self.failed + self.cancelled
    }
}
