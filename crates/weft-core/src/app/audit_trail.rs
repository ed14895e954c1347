//! AuditTrail - stamps events with id/time/actor and hands them to the sink.
//!
//! Two write modes:
//! - `record`: the caller cannot proceed without the record (decisions).
//! - `record_committed`: the mutation already happened; a sink failure is
//!   logged at error level, counted in `missed_records`, and the caller still
//!   sees the committed result.
//!
//! `record_rejected` uses the committed mode for operations that passed the
//! gate but were refused by the kernel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error};

use crate::domain::{Action, AgentId, AuditEvent, AuditFilter, AuditRecord, KernelError};
use crate::ports::{AuditSink, Clock, IdGenerator};

#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    missed: Arc<AtomicU64>,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            sink,
            clock,
            ids,
            missed: Arc::new(AtomicU64::new(0)),
        }
    }

    fn stamp(&self, actor: &AgentId, event: AuditEvent) -> AuditRecord {
        AuditRecord {
            id: self.ids.generate_audit_id(),
            at: self.clock.now(),
            actor: actor.clone(),
            event,
        }
    }

    pub async fn record(&self, actor: &AgentId, event: AuditEvent) -> Result<AuditRecord, KernelError> {
        let record = self.stamp(actor, event);
        self.sink.append(record.clone()).await?;
        Ok(record)
    }

    pub async fn record_committed(&self, actor: &AgentId, event: AuditEvent) {
        let record = self.stamp(actor, event);
        let kind = record.event.kind();
        if let Err(e) = self.sink.append(record).await {
            self.missed.fetch_add(1, Ordering::Relaxed);
            error!(agent = %actor, kind, error = %e, "committed mutation missing from audit trail");
        }
    }

    /// Records the refusal and hands the error back to the caller.
    pub async fn record_rejected(
        &self,
        actor: &AgentId,
        action: Action,
        resource: impl Into<String>,
        error: KernelError,
    ) -> KernelError {
        let resource = resource.into();
        debug!(agent = %actor, %action, resource = %resource, error = %error, "operation rejected");
        self.record_committed(
            actor,
            AuditEvent::Rejected {
                action,
                resource,
                error: error.to_string(),
            },
        )
        .await;
        error
    }

    /// Entries that could not be appended since startup. Non-zero means the
    /// trail has gaps.
    pub fn missed_records(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, KernelError> {
        self.sink.query(filter).await
    }
}
