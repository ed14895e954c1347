//! Impls - port implementations.
//!
//! # Included
//! - **InMemoryLockStore / InMemoryTaskStore**: single-process stores, one mutex each
//! - **InMemoryAuditLog / JsonlAuditSink**: audit trail backends
//! - **StaticTrustRegistry**: trust profiles from config
//! - **RuleTableEvaluator / StaticEvaluator**: native policy backends
//!
//! Relational stores and external policy engines plug in through the same
//! ports from a separate crate.

pub mod file_audit;
pub mod inmem_audit;
pub mod inmem_locks;
pub mod inmem_tasks;
pub mod rule_policy;
pub mod static_trust;

pub use self::file_audit::JsonlAuditSink;
pub use self::inmem_audit::InMemoryAuditLog;
pub use self::inmem_locks::InMemoryLockStore;
pub use self::inmem_tasks::InMemoryTaskStore;
pub use self::rule_policy::{RuleTableEvaluator, StaticEvaluator};
pub use self::static_trust::StaticTrustRegistry;
