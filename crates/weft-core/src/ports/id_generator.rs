//! IdGenerator port.
//!
//! Ids are ULIDs whose timestamp half comes from the injected `Clock`, so a
//! `FixedClock` yields ids with a known timestamp prefix.

use ulid::Ulid;

use crate::domain::ids::{AuditId, TaskId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_audit_id(&self) -> AuditId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_audit_id(&self) -> AuditId {
        AuditId::from(self.next_ulid())
    }
}
