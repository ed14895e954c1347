//! LockSweeper - optional background reclamation of expired lock rows.
//!
//! Expiry is already enforced lazily on every read, so the sweeper only keeps
//! the table small.
//! - drop the handle or call `shutdown_and_join()` to stop it

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::app::lock_service::LockService;

pub struct LockSweeper {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl LockSweeper {
    pub fn spawn(locks: Arc<LockService>, every: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(sweep_loop(locks, every, shutdown_rx));
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn sweep_loop(locks: Arc<LockService>, every: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = locks.sweep().await {
                    warn!(error = %e, "lock sweep failed");
                }
            }
        }
    }
    debug!("lock sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::audit_trail::AuditTrail;
    use crate::config::LockConfig;
    use crate::domain::{AgentId, AuditFilter};
    use crate::impls::{InMemoryAuditLog, InMemoryLockStore};
    use crate::ports::{AuditSink, FixedClock, UlidGenerator};
    use chrono::Utc;

    #[tokio::test]
    async fn sweeps_on_interval_until_shut_down() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let log = Arc::new(InMemoryAuditLog::new());
        let audit = AuditTrail::new(log.clone(), clock.clone(), Arc::new(UlidGenerator::new(clock.clone())));
        let locks = Arc::new(LockService::new(
            Arc::new(InMemoryLockStore::new()),
            audit,
            clock.clone(),
            &LockConfig::default(),
        ));
        locks
            .acquire("tmp.lock", &AgentId::new("a"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(6));

        let sweeper = LockSweeper::spawn(locks.clone(), Duration::from_millis(10));
        let swept = AuditFilter::default().kind("locks_swept");
        let mut seen = false;
        for _ in 0..100 {
            if !log.query(&swept).await.unwrap().is_empty() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sweeper.shutdown_and_join().await;
        assert!(seen, "sweeper never reclaimed the expired row");
    }
}
