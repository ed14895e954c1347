//! PauseCoordinator - reads the `feature:<id>:pause` lock namespace.
//!
//! A feature is paused while its pause key has a live holder. There is no
//! separate state: pausing and resuming are plain lock acquire/release.

use std::collections::HashSet;
use std::sync::Arc;

use crate::app::lock_service::LockService;
use crate::domain::{KernelError, pause_feature, pause_key};

pub struct PauseCoordinator {
    locks: Arc<LockService>,
}

impl PauseCoordinator {
    pub fn new(locks: Arc<LockService>) -> Self {
        Self { locks }
    }

    pub async fn is_paused(&self, feature: &str) -> Result<bool, KernelError> {
        Ok(self.locks.status(&pause_key(feature)).await?.is_some())
    }

    /// Features whose pause lock is currently live.
    pub async fn paused_features(&self) -> Result<HashSet<String>, KernelError> {
        Ok(self
            .locks
            .list()
            .await?
            .iter()
            .filter_map(|lock| pause_feature(&lock.key))
            .map(str::to_string)
            .collect())
    }
}
