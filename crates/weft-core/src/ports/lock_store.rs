//! LockStore port - exclusive owner of lock rows.
//!
//! Each method is one atomic read-modify-write against the backing store
//! (a mutex-guarded map in process, a single transactional function in SQL).
//! Implementations must apply `domain::lock::decide_acquire` /
//! `decide_release` inside that atomic section; callers never compose a read
//! and a write themselves.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AgentId, KernelError, Lock, LockGrant, ReleaseOutcome};

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Compare-and-set on `(key, holder, expires_at)`.
    async fn acquire(
        &self,
        key: &str,
        agent: &AgentId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<LockGrant, KernelError>;

    async fn release(
        &self,
        key: &str,
        agent: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, KernelError>;

    /// The live lock for `key`, if any. Expired rows read as `None`.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Lock>, KernelError>;

    /// All live locks, ordered by key.
    async fn list(&self, now: DateTime<Utc>) -> Result<Vec<Lock>, KernelError>;

    /// Physically removes expired rows. Returns how many were removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, KernelError>;
}
