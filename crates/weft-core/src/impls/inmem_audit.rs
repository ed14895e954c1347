//! InMemoryAuditLog - append-only Vec, for tests and single-process runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AuditFilter, AuditRecord, KernelError};
use crate::ports::AuditSink;

#[derive(Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<(), KernelError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, KernelError> {
        let records = self.records.read().await;
        Ok(filter.apply(records.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, AuditEvent, AuditId};
    use chrono::Utc;
    use ulid::Ulid;

    fn released(actor: &str, key: &str) -> AuditRecord {
        AuditRecord {
            id: AuditId::from_ulid(Ulid::new()),
            at: Utc::now(),
            actor: AgentId::new(actor),
            event: AuditEvent::LockReleased { key: key.into() },
        }
    }

    #[tokio::test]
    async fn query_preserves_append_order() {
        let log = InMemoryAuditLog::new();
        for key in ["a", "b", "c"] {
            log.append(released("x", key)).await.unwrap();
        }

        let keys: Vec<String> = log
            .query(&AuditFilter::default())
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| r.event.lock_key().map(str::to_string))
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn query_filters_by_actor_and_limit() {
        let log = InMemoryAuditLog::new();
        log.append(released("x", "1")).await.unwrap();
        log.append(released("y", "2")).await.unwrap();
        log.append(released("x", "3")).await.unwrap();

        let hits = log.query(&AuditFilter::default().actor("x").limit(1)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event.lock_key(), Some("3"));
        assert_eq!(log.len().await, 3);
    }
}
