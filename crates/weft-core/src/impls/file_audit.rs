//! JsonlAuditSink - one JSON record per line, append-only file.
//!
//! Appends are serialized by a mutex and flushed before returning, so a
//! successful `append` means the line reached the OS. Queries re-read the
//! file; a line that fails to parse is skipped with a warning rather than
//! hiding the rest of the trail.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::{AuditFilter, AuditRecord, KernelError};
use crate::ports::AuditSink;

pub struct JsonlAuditSink {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> KernelError {
        KernelError::StoreUnavailable(format!("audit log {}: {err}", self.path.display()))
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, record: AuditRecord) -> Result<(), KernelError> {
        let mut line = serde_json::to_string(&record).map_err(|e| self.unavailable(e))?;
        line.push('\n');

        let _guard = self.write_guard.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.unavailable(e))?;
        file.write_all(line.as_bytes()).await.map_err(|e| self.unavailable(e))?;
        file.flush().await.map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, KernelError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.unavailable(e)),
        };

        let mut records = Vec::new();
        for (n, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %self.path.display(), line = n + 1, error = %e, "skipping unreadable audit line"),
            }
        }
        Ok(filter.apply(records.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, AuditEvent, AuditId, TaskId};
    use chrono::Utc;
    use ulid::Ulid;

    fn submitted(task_id: TaskId) -> AuditRecord {
        AuditRecord {
            id: AuditId::from_ulid(Ulid::new()),
            at: Utc::now(),
            actor: AgentId::new("orchestrator"),
            event: AuditEvent::TaskSubmitted {
                task_id,
                task_type: "edit".into(),
            },
        }
    }

    #[tokio::test]
    async fn appended_records_survive_a_new_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let task_id = TaskId::from_ulid(Ulid::new());

        let sink = JsonlAuditSink::new(&path);
        sink.append(submitted(task_id)).await.unwrap();
        sink.append(submitted(TaskId::from_ulid(Ulid::new()))).await.unwrap();

        let reopened = JsonlAuditSink::new(&path);
        let all = reopened.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let hits = reopened.query(&AuditFilter::default().task(task_id)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event.task_id(), Some(task_id));
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_trail() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlAuditSink::new(dir.path().join("never-written.jsonl"));
        assert!(sink.query(&AuditFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        sink.append(submitted(TaskId::from_ulid(Ulid::new()))).await.unwrap();

        let mut raw = tokio::fs::read_to_string(&path).await.unwrap();
        raw.push_str("{not json\n");
        tokio::fs::write(&path, raw).await.unwrap();

        assert_eq!(sink.query(&AuditFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unwritable_path_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let sink = JsonlAuditSink::new(dir.path());
        let err = sink.append(submitted(TaskId::from_ulid(Ulid::new()))).await.unwrap_err();
        assert!(matches!(err, KernelError::StoreUnavailable(_)));
    }
}
