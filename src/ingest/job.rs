//! Per-run ingestion state.

use super::ProgressEvent;
use crate::vector_store::IndexTarget;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Counters for one ingestion run.
///
/// Every run owns its own job, so concurrent runs never observe each other's
/// counters. Per-document counters reset when the next document starts.
#[derive(Debug, Clone)]
pub struct IngestionJob {
    pub id: Uuid,
    pub target: IndexTarget,
    pub started_at: DateTime<Utc>,
    total_documents: usize,
    documents_processed: usize,
    filename: String,
    total_chunks: usize,
    chunks_upserted: usize,
    vectors_upserted: usize,
}

impl IngestionJob {
    pub fn new(id: Uuid, target: IndexTarget, total_documents: usize) -> Self {
        Self {
            id,
            target,
            started_at: Utc::now(),
            total_documents,
            documents_processed: 0,
            filename: String::new(),
            total_chunks: 0,
            chunks_upserted: 0,
            vectors_upserted: 0,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Start counting a new document.
    pub fn start_document(&mut self, filename: impl Into<String>, total_chunks: usize) {
        self.filename = filename.into();
        self.total_chunks = total_chunks;
        self.chunks_upserted = 0;
    }

    /// Record a batch that was upserted for the current document.
    pub fn record_batch(&mut self, chunks: usize) {
        self.chunks_upserted += chunks;
        self.vectors_upserted += chunks;
    }

    pub fn finish_document(&mut self) {
        self.documents_processed += 1;
    }

    /// Vectors written across all documents so far.
    pub fn vectors_upserted(&self) -> usize {
        self.vectors_upserted
    }

    /// Current counters as a wire event.
    pub fn snapshot(&self, is_complete: bool) -> ProgressEvent {
        ProgressEvent {
            filename: self.filename.clone(),
            total_chunks: self.total_chunks,
            chunks_upserted: self.chunks_upserted,
            is_complete,
            documents_processed: self.documents_processed,
            total_documents: self.total_documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_reset_per_document() {
        let mut job = IngestionJob::new(Uuid::new_v4(), IndexTarget::new("idx", "ns"), 2);

        job.start_document("first", 5);
        job.record_batch(3);
        job.record_batch(2);
        job.finish_document();
        assert_eq!(job.snapshot(false).chunks_upserted, 5);

        job.start_document("second", 4);
        let event = job.snapshot(false);
        assert_eq!(event.filename, "second");
        assert_eq!(event.chunks_upserted, 0);
        assert_eq!(event.documents_processed, 1);
        assert_eq!(job.vectors_upserted(), 5);
    }

    #[test]
    fn test_empty_job_snapshot() {
        let job = IngestionJob::new(Uuid::new_v4(), IndexTarget::new("idx", "ns"), 0);
        let event = job.snapshot(true);
        assert_eq!(event.filename, "");
        assert_eq!(event.total_chunks, 0);
        assert!(event.is_complete);
    }
}
