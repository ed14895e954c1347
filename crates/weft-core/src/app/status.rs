//! KernelStatus - point-in-time snapshot for health endpoints and the CLI.

use serde::{Deserialize, Serialize};

use crate::domain::TaskCounts;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelStatus {
    pub policy_version: String,
    pub tasks: TaskCounts,
    pub live_locks: usize,
    /// Sorted feature ids with a live pause lock.
    pub paused_features: Vec<String>,
    /// Committed mutations whose audit record could not be appended.
    #[serde(default)]
    pub audit_gaps: u64,
}

impl KernelStatus {
    /// Tasks that still need an agent: pending plus claimed.
    pub fn outstanding(&self) -> usize {
        self.tasks.pending + self.tasks.claimed
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0 && self.live_locks == 0
    }
}
