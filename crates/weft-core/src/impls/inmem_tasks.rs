//! InMemoryTaskStore - single-process task table.
//!
//! Design:
//! - `records` is the single source of truth for task state.
//! - `pending` indexes Pending tasks by `(priority, seq)` so claim order is
//!   deterministic for a given snapshot.
//! - `graph` mirrors every task's `deps` for reverse lookups.
//! - All of it sits behind one mutex; each trait method is one critical
//!   section, so transitions are all-or-nothing.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    AgentId, DepRef, KernelError, TaskCounts, TaskDraft, TaskId, TaskRecord, TaskStatus,
};
use crate::ports::TaskStore;
use crate::queue::DependencyGraph;

#[derive(Default)]
struct InMemoryTaskState {
    records: HashMap<TaskId, TaskRecord>,
    pending: BTreeSet<(u8, u64, TaskId)>,
    graph: DependencyGraph,
    next_seq: u64,
}

impl InMemoryTaskState {
    fn record_mut(&mut self, task_id: TaskId) -> Result<&mut TaskRecord, KernelError> {
        self.records
            .get_mut(&task_id)
            .ok_or(KernelError::TaskNotFound(task_id))
    }

    fn index_key(record: &TaskRecord) -> (u8, u64, TaskId) {
        let (priority, seq) = record.claim_order();
        (priority, seq, record.id)
    }

    fn deps_completed(&self, record: &TaskRecord) -> bool {
        record.deps.iter().all(|dep| {
            self.records
                .get(dep)
                .is_some_and(|d| d.status == TaskStatus::Completed)
        })
    }

    fn is_eligible(&self, record: &TaskRecord, paused: &HashSet<String>) -> bool {
        record.status == TaskStatus::Pending
            && record.feature.as_ref().is_none_or(|f| !paused.contains(f))
            && self.deps_completed(record)
    }

    /// Resolves batch references and rejects cycles before anything is written.
    fn resolve_batch(&self, drafts: &[TaskDraft], ids: &[TaskId]) -> Result<Vec<BTreeSet<TaskId>>, KernelError> {
        let mut by_key: HashMap<&str, TaskId> = HashMap::new();
        for (draft, id) in drafts.iter().zip(ids) {
            if let Some(key) = draft.key.as_deref()
                && by_key.insert(key, *id).is_some()
            {
                return Err(KernelError::InvalidArgument(format!("duplicate batch key '{key}'")));
            }
        }

        // Existing tasks never depend on new ones, so any cycle is internal
        // to the batch and this local graph is enough to find it.
        let mut batch_graph = DependencyGraph::new();
        let mut resolved = Vec::with_capacity(drafts.len());
        for (draft, id) in drafts.iter().zip(ids) {
            let mut deps = BTreeSet::new();
            for dep in &draft.deps {
                match dep {
                    DepRef::Existing(dep_id) => {
                        if !self.records.contains_key(dep_id) {
                            return Err(KernelError::TaskNotFound(*dep_id));
                        }
                        deps.insert(*dep_id);
                    }
                    DepRef::Batch(key) => {
                        let dep_id = by_key.get(key.as_str()).ok_or_else(|| {
                            KernelError::InvalidArgument(format!("unknown batch key '{key}'"))
                        })?;
                        batch_graph.add_dependency(*id, *dep_id);
                        deps.insert(*dep_id);
                    }
                }
            }
            resolved.push(deps);
        }

        if let Some(cycle) = batch_graph.detect_cycle() {
            let names: HashMap<TaskId, &str> = by_key.iter().map(|(k, id)| (*id, *k)).collect();
            return Err(KernelError::CyclicDependency {
                cycle: cycle
                    .iter()
                    .map(|id| names.get(id).map_or_else(|| id.to_string(), |k| k.to_string()))
                    .collect(),
            });
        }
        Ok(resolved)
    }
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<InMemoryTaskState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_batch(
        &self,
        drafts: Vec<TaskDraft>,
        ids: Vec<TaskId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, KernelError> {
        if drafts.is_empty() {
            return Err(KernelError::InvalidArgument("empty submission".into()));
        }
        if drafts.len() != ids.len() {
            return Err(KernelError::InvalidArgument(format!(
                "{} drafts but {} ids",
                drafts.len(),
                ids.len()
            )));
        }

        let mut state = self.state.lock().await;
        let resolved = state.resolve_batch(&drafts, &ids)?;

        let mut inserted = Vec::with_capacity(drafts.len());
        for ((draft, id), deps) in drafts.iter().zip(ids).zip(resolved) {
            state.next_seq += 1;
            let record = TaskRecord::new(id, state.next_seq, draft, deps, now);
            for dep in &record.deps {
                state.graph.add_dependency(id, *dep);
            }
            state.pending.insert(InMemoryTaskState::index_key(&record));
            state.records.insert(id, record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn claim_next(
        &self,
        agent: &AgentId,
        paused_features: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskRecord>, KernelError> {
        let mut state = self.state.lock().await;
        let chosen = state
            .pending
            .iter()
            .find(|(_, _, id)| {
                state
                    .records
                    .get(id)
                    .is_some_and(|r| state.is_eligible(r, paused_features))
            })
            .copied();

        let Some(key) = chosen else {
            return Ok(None);
        };
        let record = state.record_mut(key.2)?;
        record.claim(agent, now)?;
        let claimed = record.clone();
        state.pending.remove(&key);
        Ok(Some(claimed))
    }

    async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, KernelError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&task_id).cloned())
    }

    async fn complete(
        &self,
        task_id: TaskId,
        agent: &AgentId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, KernelError> {
        let mut state = self.state.lock().await;
        let record = state.record_mut(task_id)?;
        record.complete(agent, result, now)?;
        Ok(record.clone())
    }

    async fn fail(
        &self,
        task_id: TaskId,
        agent: &AgentId,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, KernelError> {
        let mut state = self.state.lock().await;
        let record = state.record_mut(task_id)?;
        record.fail(agent, error, now)?;
        Ok(record.clone())
    }

    async fn cancel(&self, task_id: TaskId, now: DateTime<Utc>) -> Result<TaskRecord, KernelError> {
        let mut state = self.state.lock().await;
        let record = state.record_mut(task_id)?;
        let key = InMemoryTaskState::index_key(record);
        record.cancel(now)?;
        let cancelled = record.clone();
        state.pending.remove(&key);
        Ok(cancelled)
    }

    async fn reschedule(&self, task_id: TaskId, now: DateTime<Utc>) -> Result<TaskRecord, KernelError> {
        let mut state = self.state.lock().await;
        let record = state.record_mut(task_id)?;
        record.reschedule(now)?;
        let rescheduled = record.clone();
        state.pending.insert(InMemoryTaskState::index_key(&rescheduled));
        Ok(rescheduled)
    }

    async fn dependents(&self, task_id: TaskId) -> Result<Vec<TaskId>, KernelError> {
        let state = self.state.lock().await;
        if !state.records.contains_key(&task_id) {
            return Err(KernelError::TaskNotFound(task_id));
        }
        Ok(state.graph.get_waiting_tasks(task_id))
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRecord>, KernelError> {
        let state = self.state.lock().await;
        let mut tasks: Vec<TaskRecord> = state
            .records
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        tasks.sort_by_key(|r| r.seq);
        Ok(tasks)
    }

    async fn counts(&self) -> Result<TaskCounts, KernelError> {
        let state = self.state.lock().await;
        let mut counts = TaskCounts::default();
        for record in state.records.values() {
            counts.record(record.status);
        }
        Ok(counts)
    }
}
