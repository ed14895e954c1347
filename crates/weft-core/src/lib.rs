//! weft-core
//!
//! Coordination kernel for agents sharing one codebase: TTL locks, a
//! dependency-gated task queue, a policy gate in front of every mutation,
//! and an append-only audit trail.
//!
//! # Modules
//! - **domain**: ids, locks, tasks, identities, decisions, audit records, errors
//! - **ports**: store, audit, policy, clock and id traits
//! - **impls**: in-memory and file-backed port implementations
//! - **queue**: dependency graph and cycle detection
//! - **policy**: gate and guardrails
//! - **app**: lock service, task queue, pause coordinator, kernel facade
//! - **config**: YAML configuration

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod policy;
pub mod ports;
pub mod queue;

pub use app::{Kernel, KernelBuilder};
pub use config::KernelConfig;
pub use domain::KernelError;
