//! LockService - TTL-bounded exclusive ownership of named resources.
//!
//! Mutators are crate-private: callers reach them through `Kernel`, which
//! authorizes first.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::app::audit_trail::AuditTrail;
use crate::config::LockConfig;
use crate::domain::{Action, AgentId, AuditEvent, KernelError, Lock, LockGrant, ReleaseOutcome};
use crate::ports::{Clock, LockStore};

const SWEEPER_ACTOR: &str = "weft:sweeper";

pub struct LockService {
    store: Arc<dyn LockStore>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    max_ttl: Duration,
}

impl LockService {
    pub fn new(store: Arc<dyn LockStore>, audit: AuditTrail, clock: Arc<dyn Clock>, config: &LockConfig) -> Self {
        Self {
            store,
            audit,
            clock,
            default_ttl: config.default_ttl,
            max_ttl: config.max_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub(crate) async fn acquire(
        &self,
        key: &str,
        agent: &AgentId,
        ttl: Option<Duration>,
    ) -> Result<LockGrant, KernelError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl > self.max_ttl {
            let err = KernelError::InvalidArgument(format!(
                "ttl {ttl:?} exceeds the maximum of {:?}",
                self.max_ttl
            ));
            return Err(self.audit.record_rejected(agent, Action::AcquireLock, key, err).await);
        }

        let grant = match self.store.acquire(key, agent, ttl, self.clock.now()).await {
            Ok(grant) => grant,
            Err(e) => return Err(self.audit.record_rejected(agent, Action::AcquireLock, key, e).await),
        };

        info!(key, agent = %agent, expires_at = %grant.expires_at(), refreshed = grant.refreshed, "lock acquired");
        self.audit
            .record_committed(
                agent,
                AuditEvent::LockAcquired {
                    key: key.to_string(),
                    expires_at: grant.expires_at(),
                    refreshed: grant.refreshed,
                },
            )
            .await;
        Ok(grant)
    }

    /// Idempotent: releasing an unheld or foreign lock is a no-op success.
    pub(crate) async fn release(&self, key: &str, agent: &AgentId) -> Result<ReleaseOutcome, KernelError> {
        let outcome = match self.store.release(key, agent, self.clock.now()).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.audit.record_rejected(agent, Action::ReleaseLock, key, e).await),
        };
        if outcome.released() {
            info!(key, agent = %agent, "lock released");
            self.audit
                .record_committed(agent, AuditEvent::LockReleased { key: key.to_string() })
                .await;
        } else {
            debug!(key, agent = %agent, ?outcome, "release was a no-op");
        }
        Ok(outcome)
    }

    pub async fn status(&self, key: &str) -> Result<Option<Lock>, KernelError> {
        self.store.get(key, self.clock.now()).await
    }

    /// Live locks only.
    pub async fn list(&self) -> Result<Vec<Lock>, KernelError> {
        self.store.list(self.clock.now()).await
    }

    /// Deletes expired rows. Correctness never depends on this running.
    pub async fn sweep(&self) -> Result<usize, KernelError> {
        let count = self.store.sweep_expired(self.clock.now()).await?;
        if count > 0 {
            info!(count, "swept expired locks");
            self.audit
                .record_committed(&AgentId::new(SWEEPER_ACTOR), AuditEvent::LocksSwept { count })
                .await;
        }
        Ok(count)
    }
}
