//! Kernel errors and their operational classification.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ids::{AgentId, TaskId};
use super::task::TaskStatus;

/// Operational classification of a kernel error.
///
/// - Transient: retry with backoff may succeed (lock contention).
/// - Permanent: the request itself is wrong; retrying changes nothing.
/// - Infrastructure: the backing store is unreachable; the kernel failed closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Every error the kernel returns to a caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("lock '{key}' is held by {holder} until {expires_at}")]
    LockHeld {
        key: String,
        holder: AgentId,
        expires_at: DateTime<Utc>,
    },

    #[error("agent {agent} is not the claimant of {task_id}")]
    NotClaimant { task_id: TaskId, agent: AgentId },

    #[error("dependency cycle detected: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<String> },

    #[error("cannot {operation} {task_id} while it is {from:?}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        operation: &'static str,
    },

    #[error("policy denied {action} on '{resource}': {reason}")]
    PolicyDenied {
        action: String,
        resource: String,
        reason: String,
    },

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn format_cycle(cycle: &[String]) -> String {
    cycle.join(" -> ")
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::LockHeld { .. } => ErrorKind::Transient,
            KernelError::StoreUnavailable(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Permanent,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn task_id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    #[rstest]
    #[case::lock_held(
        KernelError::LockHeld { key: "a.rs".into(), holder: "b".into(), expires_at: Utc::now() },
        ErrorKind::Transient
    )]
    #[case::store(KernelError::StoreUnavailable("down".into()), ErrorKind::Infrastructure)]
    #[case::not_claimant(
        KernelError::NotClaimant { task_id: task_id(), agent: "b".into() },
        ErrorKind::Permanent
    )]
    #[case::denied(
        KernelError::PolicyDenied { action: "x".into(), resource: "y".into(), reason: "z".into() },
        ErrorKind::Permanent
    )]
    fn errors_are_classified(#[case] err: KernelError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.is_retryable(), kind != ErrorKind::Permanent);
    }

    #[test]
    fn cycle_renders_as_path() {
        let err = KernelError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    }
}
