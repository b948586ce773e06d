//! Sink and source interfaces consumed by the pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sla_types::{IndexedTicket, Ticket};
use tokio::sync::RwLock;

use crate::error::IndexingError;

/// Provider of fresh ticket snapshots.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Fetch every ticket of one class. A failure applies to that class only.
    async fn fetch_by_class(&self, class: &str) -> Result<Vec<Ticket>, IndexingError>;
}

/// A record as stored in the sink, together with the ID it is stored under.
///
/// The ID is whatever the sink reports, which is not necessarily the
/// record's identity hash (documents written by older deployments).
#[derive(Debug, Clone, PartialEq)]
pub struct SinkDocument {
    pub doc_id: String,
    pub record: IndexedTicket,
}

impl SinkDocument {
    pub fn new(doc_id: impl Into<String>, record: IndexedTicket) -> Self {
        Self {
            doc_id: doc_id.into(),
            record,
        }
    }

    /// Document stored under the record's own identity hash.
    pub fn canonical(record: IndexedTicket) -> Self {
        Self {
            doc_id: record.identity_hash(),
            record,
        }
    }

    /// True when the stored ID is the identity hash of the stored content.
    pub fn is_canonical(&self) -> bool {
        self.doc_id == self.record.identity_hash()
    }
}

/// Store of indexed records, addressed by identity hash.
#[async_trait]
pub trait TicketSink: Send + Sync {
    /// Read the full current snapshot, with the ID each record is stored under.
    async fn fetch_all(&self) -> Result<Vec<SinkDocument>, IndexingError>;

    /// Create or replace the record at `doc_id`.
    async fn upsert(&self, doc_id: &str, record: &IndexedTicket) -> Result<(), IndexingError>;

    /// Remove the record at `doc_id`. Removing an absent record succeeds.
    async fn delete(&self, doc_id: &str) -> Result<(), IndexingError>;

    /// Name of this sink for logging.
    fn name(&self) -> &str;
}

/// Counters for one kind of sink write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// Number of writes that succeeded
    pub processed: usize,
    /// Number of writes not issued (dry run)
    pub skipped: usize,
    /// Number of writes that failed
    pub errors: usize,
}

impl UpdateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn merge(&mut self, other: &UpdateResult) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }

    pub fn has_updates(&self) -> bool {
        self.processed > 0
    }

    /// Total writes considered (success + skip + error).
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.errors
    }
}

/// In-process sink keyed by document ID.
///
/// Counts every write it receives, which is what the idempotency tests
/// assert on.
#[derive(Default)]
pub struct MemorySink {
    docs: RwLock<BTreeMap<String, IndexedTicket>>,
    writes: RwLock<WriteLog>,
}

/// Writes received by a [`MemorySink`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteLog {
    pub upserts: usize,
    pub deletes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-populated with records, addressed by their identity hash.
    pub fn with_records(records: impl IntoIterator<Item = IndexedTicket>) -> Self {
        let docs = records
            .into_iter()
            .map(|r| (r.identity_hash(), r))
            .collect();
        Self {
            docs: RwLock::new(docs),
            writes: RwLock::new(WriteLog::default()),
        }
    }

    /// Sink pre-populated with documents under the IDs they carry.
    pub fn with_documents(documents: impl IntoIterator<Item = SinkDocument>) -> Self {
        let docs = documents
            .into_iter()
            .map(|d| (d.doc_id, d.record))
            .collect();
        Self {
            docs: RwLock::new(docs),
            writes: RwLock::new(WriteLog::default()),
        }
    }

    pub async fn get(&self, doc_id: &str) -> Option<IndexedTicket> {
        self.docs.read().await.get(doc_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    pub async fn writes(&self) -> WriteLog {
        self.writes.read().await.clone()
    }

    pub async fn reset_writes(&self) {
        *self.writes.write().await = WriteLog::default();
    }
}

#[async_trait]
impl TicketSink for MemorySink {
    async fn fetch_all(&self) -> Result<Vec<SinkDocument>, IndexingError> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .map(|(doc_id, record)| SinkDocument::new(doc_id.clone(), record.clone()))
            .collect())
    }

    async fn upsert(&self, doc_id: &str, record: &IndexedTicket) -> Result<(), IndexingError> {
        self.docs
            .write()
            .await
            .insert(doc_id.to_string(), record.clone());
        self.writes.write().await.upserts += 1;
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<(), IndexingError> {
        self.docs.write().await.remove(doc_id);
        self.writes.write().await.deletes += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> IndexedTicket {
        IndexedTicket {
            id: id.to_string(),
            reference: format!("R-{id}"),
            class: "Incident".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_result_record() {
        let mut result = UpdateResult::new();
        result.record_success();
        result.record_success();
        result.record_skip();
        result.record_error();

        assert_eq!(result.processed, 2);
        assert_eq!(result.total(), 4);
        assert!(result.has_updates());
    }

    #[test]
    fn test_update_result_merge() {
        let mut a = UpdateResult {
            processed: 5,
            skipped: 2,
            errors: 1,
        };
        let b = UpdateResult {
            processed: 3,
            skipped: 0,
            errors: 2,
        };
        a.merge(&b);
        assert_eq!(
            a,
            UpdateResult {
                processed: 8,
                skipped: 2,
                errors: 3
            }
        );
    }

    #[tokio::test]
    async fn test_memory_sink_crud() {
        let sink = MemorySink::with_records([record("1")]);
        let doc_id = record("1").identity_hash();
        assert!(sink.get(&doc_id).await.is_some());

        let second = record("2");
        sink.upsert(&second.identity_hash(), &second).await.unwrap();
        assert_eq!(sink.len().await, 2);

        sink.delete(&doc_id).await.unwrap();
        sink.delete(&doc_id).await.unwrap();
        assert_eq!(
            sink.fetch_all().await.unwrap(),
            vec![SinkDocument::canonical(second)]
        );
        assert_eq!(
            sink.writes().await,
            WriteLog {
                upserts: 1,
                deletes: 2
            }
        );
    }

    #[tokio::test]
    async fn test_memory_sink_reports_stored_ids() {
        let legacy = SinkDocument::new("d0a4a9e1legacysha1id", record("1"));
        let sink = MemorySink::with_documents([legacy.clone()]);

        let docs = sink.fetch_all().await.unwrap();
        assert_eq!(docs, vec![legacy]);
        assert!(!docs[0].is_canonical());
        assert!(sink.get(&record("1").identity_hash()).await.is_none());
    }
}
