//! AuditSink port - append-only record of decisions and mutations.
//!
//! There is deliberately no update or delete in this contract.

use async_trait::async_trait;

use crate::domain::{AuditFilter, AuditRecord, KernelError};

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Durably appends one record. An error means the record was not kept.
    async fn append(&self, record: AuditRecord) -> Result<(), KernelError>;

    /// Matching records in append order.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, KernelError>;
}
