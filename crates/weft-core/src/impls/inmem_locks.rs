//! InMemoryLockStore - single-process lock table.
//!
//! One `tokio::sync::Mutex` guards the whole table, which makes every method
//! a linearizable compare-and-set. The guard is never held across anything
//! but map operations.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::lock::{decide_acquire, decide_release};
use crate::domain::{AgentId, KernelError, Lock, LockGrant, ReleaseOutcome};
use crate::ports::LockStore;

#[derive(Default)]
pub struct InMemoryLockStore {
    rows: Mutex<BTreeMap<String, Lock>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn acquire(
        &self,
        key: &str,
        agent: &AgentId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<LockGrant, KernelError> {
        let mut rows = self.rows.lock().await;
        let grant = decide_acquire(rows.get(key), key, agent, ttl, now)?;
        rows.insert(key.to_string(), grant.lock.clone());
        Ok(grant)
    }

    async fn release(
        &self,
        key: &str,
        agent: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, KernelError> {
        let mut rows = self.rows.lock().await;
        let outcome = decide_release(rows.get(key), agent, now);
        match outcome {
            ReleaseOutcome::Released => {
                rows.remove(key);
            }
            // Lazily reclaim a dead row while we hold the guard anyway.
            ReleaseOutcome::NotHeld => {
                rows.remove(key);
            }
            ReleaseOutcome::HeldByOther => {}
        }
        Ok(outcome)
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Lock>, KernelError> {
        let rows = self.rows.lock().await;
        Ok(rows.get(key).filter(|lock| lock.is_live(now)).cloned())
    }

    async fn list(&self, now: DateTime<Utc>) -> Result<Vec<Lock>, KernelError> {
        let rows = self.rows.lock().await;
        Ok(rows.values().filter(|lock| lock.is_live(now)).cloned().collect())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, KernelError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, lock| lock.is_live(now));
        Ok(before - rows.len())
    }
}
