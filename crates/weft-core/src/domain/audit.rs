//! Audit trail records: authorization decisions and state mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::{Action, Effect, PolicyDecision};
use super::ids::{AgentId, AuditId, TaskId};

/// What happened. Tagged so the JSON-lines file stays greppable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    Decision(PolicyDecision),
    LockAcquired {
        key: String,
        expires_at: DateTime<Utc>,
        refreshed: bool,
    },
    LockReleased {
        key: String,
    },
    LocksSwept {
        count: usize,
    },
    TaskSubmitted {
        task_id: TaskId,
        task_type: String,
    },
    TaskClaimed {
        task_id: TaskId,
    },
    TaskCompleted {
        task_id: TaskId,
    },
    TaskFailed {
        task_id: TaskId,
        error: String,
    },
    TaskCancelled {
        task_id: TaskId,
    },
    TaskRescheduled {
        task_id: TaskId,
    },
    GuardrailViolations {
        description: String,
        patterns: Vec<String>,
    },
    /// Authorized, then refused by the kernel (held lock, wrong claimant,
    /// illegal transition, cycle, store failure).
    Rejected {
        action: Action,
        resource: String,
        error: String,
    },
}

impl AuditEvent {
    /// Stable kind name used by filters.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::Decision(_) => "decision",
            AuditEvent::LockAcquired { .. } => "lock_acquired",
            AuditEvent::LockReleased { .. } => "lock_released",
            AuditEvent::LocksSwept { .. } => "locks_swept",
            AuditEvent::TaskSubmitted { .. } => "task_submitted",
            AuditEvent::TaskClaimed { .. } => "task_claimed",
            AuditEvent::TaskCompleted { .. } => "task_completed",
            AuditEvent::TaskFailed { .. } => "task_failed",
            AuditEvent::TaskCancelled { .. } => "task_cancelled",
            AuditEvent::TaskRescheduled { .. } => "task_rescheduled",
            AuditEvent::GuardrailViolations { .. } => "guardrail_violations",
            AuditEvent::Rejected { .. } => "rejected",
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            AuditEvent::TaskSubmitted { task_id, .. }
            | AuditEvent::TaskClaimed { task_id }
            | AuditEvent::TaskCompleted { task_id }
            | AuditEvent::TaskFailed { task_id, .. }
            | AuditEvent::TaskCancelled { task_id }
            | AuditEvent::TaskRescheduled { task_id } => Some(*task_id),
            AuditEvent::Decision(d) => task_resource(&d.action, &d.resource),
            AuditEvent::Rejected { action, resource, .. } => task_resource(action, resource),
            _ => None,
        }
    }

    /// Lock key this entry is about, including decisions and rejections of
    /// lock actions.
    pub fn lock_key(&self) -> Option<&str> {
        match self {
            AuditEvent::LockAcquired { key, .. } | AuditEvent::LockReleased { key } => Some(key),
            AuditEvent::Decision(d) => lock_resource(&d.action, &d.resource),
            AuditEvent::Rejected { action, resource, .. } => lock_resource(action, resource),
            _ => None,
        }
    }
}

fn lock_resource<'a>(action: &Action, resource: &'a str) -> Option<&'a str> {
    matches!(action, Action::AcquireLock | Action::ReleaseLock).then_some(resource)
}

fn task_resource(action: &Action, resource: &str) -> Option<TaskId> {
    match action {
        Action::CompleteWork | Action::FailWork | Action::CancelWork | Action::RescheduleWork => {
            resource.parse().ok()
        }
        _ => None,
    }
}

/// One immutable, timestamped, attributed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    pub at: DateTime<Utc>,
    pub actor: AgentId,
    pub event: AuditEvent,
}

/// Conjunctive query filter; unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub actor: Option<AgentId>,
    pub kind: Option<String>,
    pub task_id: Option<TaskId>,
    pub lock_key: Option<String>,
    pub decision: Option<Effect>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Keep only the newest `limit` matches (still returned oldest first).
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn actor(mut self, actor: impl Into<AgentId>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn lock_key(mut self, key: impl Into<String>) -> Self {
        self.lock_key = Some(key.into());
        self
    }

    pub fn decision(mut self, effect: Effect) -> Self {
        self.decision = Some(effect);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        if self.actor.as_ref().is_some_and(|a| a != &record.actor) {
            return false;
        }
        if self.kind.as_deref().is_some_and(|k| k != record.event.kind()) {
            return false;
        }
        if self.task_id.is_some() && self.task_id != record.event.task_id() {
            return false;
        }
        if self.lock_key.is_some() && self.lock_key.as_deref() != record.event.lock_key() {
            return false;
        }
        if let Some(effect) = self.decision {
            match &record.event {
                AuditEvent::Decision(d) if d.decision == effect => {}
                _ => return false,
            }
        }
        if self.since.is_some_and(|since| record.at < since) {
            return false;
        }
        if self.until.is_some_and(|until| record.at > until) {
            return false;
        }
        true
    }

    /// Applies the filter to records already in append order.
    pub fn apply<'a, I>(&self, records: I) -> Vec<AuditRecord>
    where
        I: IntoIterator<Item = &'a AuditRecord>,
    {
        let mut matched: Vec<AuditRecord> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        if let Some(limit) = self.limit
            && matched.len() > limit
        {
            matched.drain(..matched.len() - limit);
        }
        matched
    }
}
