//! App - composes ports into the coordination kernel.
//!
//! # Components
//! - **Kernel**: gated facade over every operation
//! - **KernelBuilder**: wiring and startup validation
//! - **LockService / TaskQueue**: the two state owners
//! - **PauseCoordinator**: reads the `feature:<id>:pause` namespace
//! - **AuditTrail**: stamps and appends audit records
//! - **LockSweeper**: optional expired-lock reclamation

pub mod audit_trail;
pub mod builder;
pub mod kernel;
pub mod lock_service;
pub mod pause;
pub mod status;
pub mod sweeper;
pub mod task_queue;

pub use self::audit_trail::AuditTrail;
pub use self::builder::KernelBuilder;
pub use self::kernel::Kernel;
pub use self::lock_service::LockService;
pub use self::pause::PauseCoordinator;
pub use self::status::KernelStatus;
pub use self::sweeper::LockSweeper;
pub use self::task_queue::TaskQueue;
