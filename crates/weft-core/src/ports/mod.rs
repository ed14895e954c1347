//! Ports - abstraction layer.
//!
//! Every collaborator of the kernel sits behind one of these traits so that a
//! deployment can back it with a relational store or an external policy
//! engine, and tests can substitute in-memory fakes.
//!
//! # Design principles
//! - Stores expose one atomic method per kernel operation.
//! - The kernel owns no global state; everything is injected.

pub mod audit_sink;
pub mod clock;
pub mod id_generator;
pub mod lock_store;
pub mod policy;
pub mod task_store;

pub use self::audit_sink::AuditSink;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::lock_store::LockStore;
pub use self::policy::{PolicyEvaluator, TrustRegistry};
pub use self::task_store::TaskStore;
