//! Domain model: ids, locks, tasks, identities, decisions, audit records.
//!
//! Everything here is pure data plus transition rules. Stores call these rules
//! inside their own atomic section, so every backend enforces the same
//! invariants.

pub mod audit;
pub mod decision;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod lock;
pub mod task;

pub use self::audit::{AuditEvent, AuditFilter, AuditRecord};
pub use self::decision::{Action, Effect, PolicyDecision, Verdict};
pub use self::errors::{ErrorKind, KernelError};
pub use self::identity::{AgentType, Identity, TrustLevel};
pub use self::ids::{AgentId, AuditId, TaskId};
pub use self::lock::{Lock, LockGrant, ReleaseOutcome, pause_feature, pause_key};
pub use self::task::{DepRef, TaskCounts, TaskDraft, TaskRecord, TaskStatus};
