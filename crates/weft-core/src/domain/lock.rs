//! Lock rows and the acquire/release decision rules.
//!
//! The rules are pure functions over the current row so that every
//! `LockStore` implementation applies exactly the same compare-and-set,
//! inside whatever atomic section that store provides.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::KernelError;
use super::ids::AgentId;

const PAUSE_PREFIX: &str = "feature:";
const PAUSE_SUFFIX: &str = ":pause";

/// Key of the pause lock for `feature`.
pub fn pause_key(feature: &str) -> String {
    format!("{PAUSE_PREFIX}{feature}{PAUSE_SUFFIX}")
}

/// Feature id if `key` lives in the pause namespace (`feature:<id>:pause`).
pub fn pause_feature(key: &str) -> Option<&str> {
    key.strip_prefix(PAUSE_PREFIX)?
        .strip_suffix(PAUSE_SUFFIX)
        .filter(|feature| !feature.is_empty())
}

/// Exclusive, TTL-bounded ownership of a named resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub key: String,
    pub holder: AgentId,
    pub acquired_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub ttl: std::time::Duration,
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    /// A lock whose `expires_at` has passed no longer has a holder.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_held_by(&self, agent: &AgentId, now: DateTime<Utc>) -> bool {
        self.is_live(now) && &self.holder == agent
    }
}

/// Result of a granted acquire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockGrant {
    pub lock: Lock,
    /// True when the caller already held the lock and only the TTL moved.
    pub refreshed: bool,
}

impl LockGrant {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.lock.expires_at
    }
}

/// What a release did to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// The caller was the live holder; the row is gone.
    Released,
    /// Nothing to release (never held, already released, or expired).
    NotHeld,
    /// Held by someone else; left untouched.
    HeldByOther,
}

impl ReleaseOutcome {
    pub fn released(self) -> bool {
        matches!(self, ReleaseOutcome::Released)
    }
}

/// Compare-and-set rule for `acquire`.
///
/// Grants when the key is unheld, expired, or already owned by `agent`
/// (re-acquire refreshes `expires_at`). Returns the row to write.
pub fn decide_acquire(
    current: Option<&Lock>,
    key: &str,
    agent: &AgentId,
    ttl: std::time::Duration,
    now: DateTime<Utc>,
) -> Result<LockGrant, KernelError> {
    if key.is_empty() {
        return Err(KernelError::InvalidArgument("lock key must not be empty".into()));
    }
    let ttl_chrono = Duration::from_std(ttl)
        .map_err(|_| KernelError::InvalidArgument(format!("ttl {ttl:?} is out of range")))?;
    if ttl_chrono <= Duration::zero() {
        return Err(KernelError::InvalidArgument("ttl must be positive".into()));
    }
    let expires_at = now
        .checked_add_signed(ttl_chrono)
        .ok_or_else(|| KernelError::InvalidArgument(format!("ttl {ttl:?} is out of range")))?;

    match current {
        Some(lock) if lock.is_live(now) && &lock.holder != agent => Err(KernelError::LockHeld {
            key: key.to_string(),
            holder: lock.holder.clone(),
            expires_at: lock.expires_at,
        }),
        Some(lock) if lock.is_live(now) => Ok(LockGrant {
            lock: Lock {
                ttl,
                expires_at,
                ..lock.clone()
            },
            refreshed: true,
        }),
        _ => Ok(LockGrant {
            lock: Lock {
                key: key.to_string(),
                holder: agent.clone(),
                acquired_at: now,
                ttl,
                expires_at,
            },
            refreshed: false,
        }),
    }
}

/// Rule for `release`. Only the live holder removes the row.
pub fn decide_release(current: Option<&Lock>, agent: &AgentId, now: DateTime<Utc>) -> ReleaseOutcome {
    match current {
        Some(lock) if lock.is_held_by(agent, now) => ReleaseOutcome::Released,
        Some(lock) if lock.is_live(now) => ReleaseOutcome::HeldByOther,
        _ => ReleaseOutcome::NotHeld,
    }
}
