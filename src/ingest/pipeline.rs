//! Chunk, embed and upsert documents, reporting progress as it goes.

use super::{IngestEvent, IngestionJob, ProgressEvent, ProgressSink};
use crate::chunking::Chunker;
use crate::embedding::Embedder;
use crate::error::{LexwiseError, Result};
use crate::loader::{load_directory, SourceDocument};
use crate::vector_store::{IndexTarget, RecordMetadata, VectorRecord, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Runs ingestion jobs against one embedder and vector store.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunker: Box<dyn Chunker>,
    batch_size: usize,
}

/// A job running in the background.
pub struct JobHandle {
    pub id: Uuid,
    pub events: mpsc::Receiver<IngestEvent>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunker: Box<dyn Chunker>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(LexwiseError::Config("ingestion.batch_size must be at least 1".to_string()));
        }

        Ok(Self {
            embedder,
            store,
            chunker,
            batch_size,
        })
    }

    /// Ingest documents into `target`, sending progress to `sink`.
    ///
    /// Documents and batches are processed strictly in order. The first error
    /// aborts the run; the caller decides how to report it. On success the
    /// final completion event has already been sent.
    #[instrument(skip(self, documents, sink), fields(job = %job_id, target = %target, documents = documents.len()))]
    pub async fn run(
        &self,
        job_id: Uuid,
        documents: &[SourceDocument],
        target: IndexTarget,
        sink: &mut ProgressSink,
    ) -> Result<ProgressEvent> {
        let mut job = IngestionJob::new(job_id, target, documents.len());
        info!("Ingesting {} documents into {}", documents.len(), job.target);

        for document in documents {
            let chunks = self.chunker.split(&document.page_content)?;
            job.start_document(document.base_name(), chunks.len());
            debug!("{} split into {} chunks", job.filename(), chunks.len());

            for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
                let records = self.embed_batch(job.filename(), batch_index + 1, batch).await?;
                self.store.upsert(&job.target, &records).await?;
                job.record_batch(batch.len());
                sink.progress(job.snapshot(false)).await?;
            }

            job.finish_document();
        }

        let done = job.snapshot(true);
        sink.progress(done.clone()).await?;

        info!(
            "Ingestion complete: {} vectors in {:.1}s",
            job.vectors_upserted(),
            (chrono::Utc::now() - job.started_at).num_milliseconds() as f64 / 1000.0
        );
        Ok(done)
    }

    /// Embed one batch and build its records.
    ///
    /// Newlines are flattened in the text sent to the embedder only; the
    /// stored chunk keeps its original formatting.
    async fn embed_batch(&self, filename: &str, batch_number: usize, batch: &[String]) -> Result<Vec<VectorRecord>> {
        let inputs: Vec<String> = batch.iter().map(|chunk| chunk.replace('\n', " ")).collect();
        let embeddings = self.embedder.embed_batch(&inputs).await?;

        if embeddings.len() != batch.len() {
            return Err(LexwiseError::Embedding(format!(
                "Expected {} embeddings for {} batch {}, received {}",
                batch.len(),
                filename,
                batch_number,
                embeddings.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimensions) {
            return Err(LexwiseError::Embedding(format!(
                "Expected {}-dimensional embeddings, received {}",
                dimensions,
                bad.len()
            )));
        }

        Ok(batch
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (chunk, values))| VectorRecord {
                id: format!("{}-{}-{}", filename, batch_number, position),
                values,
                metadata: RecordMetadata {
                    chunk: chunk.clone(),
                },
            })
            .collect())
    }

    /// Load every document in `documents_dir` and ingest it on a background task.
    ///
    /// Failures anywhere in the run, loading included, become a single error
    /// event on the returned channel.
    pub fn spawn_job(self: Arc<Self>, documents_dir: PathBuf, target: IndexTarget) -> JobHandle {
        let (mut sink, events) = ProgressSink::channel();
        let id = Uuid::new_v4();

        tokio::spawn(async move {
            if let Err(e) = self.load_and_run(id, documents_dir, target, &mut sink).await {
                error!(job = %id, "Ingestion failed: {}", e);
                if let Err(e) = sink.fail(e.to_string()).await {
                    debug!("Could not report failure: {}", e);
                }
            }
        });

        JobHandle { id, events }
    }

    async fn load_and_run(
        &self,
        job_id: Uuid,
        documents_dir: PathBuf,
        target: IndexTarget,
        sink: &mut ProgressSink,
    ) -> Result<ProgressEvent> {
        // PDF parsing is CPU-bound
        let documents = tokio::task::spawn_blocking(move || load_directory(&documents_dir))
            .await
            .map_err(|e| LexwiseError::Loader(format!("Document loading task failed: {}", e)))??;
        self.run(job_id, &documents, target, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{create_chunker, ChunkingConfig};
    use crate::loader::DocumentFormat;
    use crate::testing::{FakeEmbedder, RecordingStore};
    use std::collections::HashSet;

    /// Splits on blank lines so tests control the chunk count exactly.
    struct ParagraphChunker;

    impl Chunker for ParagraphChunker {
        fn split(&self, text: &str) -> Result<Vec<String>> {
            Ok(text
                .split("\n\n")
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string)
                .collect())
        }
    }

    fn document(name: &str, chunks: usize) -> SourceDocument {
        let text = (0..chunks)
            .map(|i| format!("Clause {}\nof {}", i, name))
            .collect::<Vec<_>>()
            .join("\n\n");
        SourceDocument::new(format!("docs/{}.txt", name), text, DocumentFormat::Text)
    }

    fn ingestor(embedder: FakeEmbedder, store: Arc<RecordingStore>, batch_size: usize) -> Ingestor {
        Ingestor::new(Arc::new(embedder), store, Box::new(ParagraphChunker), batch_size).unwrap()
    }

    async fn drain(mut rx: mpsc::Receiver<IngestEvent>) -> Vec<IngestEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn progress(events: &[IngestEvent]) -> Vec<&ProgressEvent> {
        events
            .iter()
            .map(|e| match e {
                IngestEvent::Progress(p) => p,
                IngestEvent::Failed { error } => panic!("unexpected failure: {}", error),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_seven_chunks_in_batches_of_three() {
        let store = Arc::new(RecordingStore::new());
        let ingestor = ingestor(FakeEmbedder::new(4), store.clone(), 3);
        let (mut sink, rx) = ProgressSink::channel();

        let done = ingestor
            .run(Uuid::new_v4(), &[document("lease", 7)], IndexTarget::new("idx", "ns"), &mut sink)
            .await
            .unwrap();
        drop(sink);

        let events = drain(rx).await;
        let events = progress(&events);
        let upserted: Vec<usize> = events.iter().map(|p| p.chunks_upserted).collect();
        assert_eq!(upserted, vec![3, 6, 7, 7]);
        assert!(events[..3].iter().all(|p| !p.is_complete && p.total_chunks == 7));
        assert!(events[3].is_complete);
        assert_eq!(events[3].filename, "lease");
        assert_eq!(events[3].documents_processed, 1);
        assert_eq!(done, *events[3]);

        assert_eq!(store.upsert_calls(), 3);
        let ids = store.ids();
        assert_eq!(ids.first().map(String::as_str), Some("lease-1-0"));
        assert_eq!(ids.last().map(String::as_str), Some("lease-3-0"));
    }

    #[tokio::test]
    async fn test_counters_reset_and_ids_are_unique_across_documents() {
        let store = Arc::new(RecordingStore::new());
        let embedder = FakeEmbedder::new(4);
        let batches = embedder.batches();
        let ingestor = ingestor(embedder, store.clone(), 2);
        let (mut sink, rx) = ProgressSink::channel();

        ingestor
            .run(
                Uuid::new_v4(),
                &[document("a", 3), document("b", 4)],
                IndexTarget::new("idx", "ns"),
                &mut sink,
            )
            .await
            .unwrap();
        drop(sink);

        let events = drain(rx).await;
        let events = progress(&events);
        let summary: Vec<(&str, usize)> = events
            .iter()
            .map(|p| (p.filename.as_str(), p.chunks_upserted))
            .collect();
        assert_eq!(
            summary,
            vec![("a", 2), ("a", 3), ("b", 2), ("b", 4), ("b", 4)]
        );
        assert_eq!(events[4].documents_processed, 2);
        assert_eq!(events[4].total_documents, 2);

        // ceil(3/2) + ceil(4/2)
        assert_eq!(store.upsert_calls(), 4);
        let ids = store.ids();
        assert_eq!(ids.len(), 7);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 7);

        // Embedder input is flattened, stored metadata is not.
        let sent = batches.lock().unwrap();
        assert!(sent.iter().flatten().all(|t| !t.contains('\n')));
        assert!(store.chunks().iter().all(|c| c.contains('\n')));
    }

    #[tokio::test]
    async fn test_no_documents_sends_only_completion() {
        let store = Arc::new(RecordingStore::new());
        let ingestor = ingestor(FakeEmbedder::new(4), store.clone(), 3);
        let (mut sink, rx) = ProgressSink::channel();

        ingestor.run(Uuid::new_v4(), &[], IndexTarget::new("idx", "ns"), &mut sink).await.unwrap();
        drop(sink);

        let events = drain(rx).await;
        assert_eq!(events.len(), 1);
        let IngestEvent::Progress(done) = &events[0] else {
            panic!("expected progress");
        };
        assert!(done.is_complete);
        assert_eq!(done.filename, "");
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_fails_run() {
        let store = Arc::new(RecordingStore::new());
        let ingestor = ingestor(FakeEmbedder::new(4).dropping_last(), store.clone(), 3);
        let (mut sink, _rx) = ProgressSink::channel();

        let err = ingestor
            .run(Uuid::new_v4(), &[document("lease", 3)], IndexTarget::new("idx", "ns"), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, LexwiseError::Embedding(_)));
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_dimensions_fail_run() {
        let store = Arc::new(RecordingStore::new());
        let embedder = Arc::new(FakeEmbedder::new(4).reporting_dimensions(8));
        let ingestor = Ingestor::new(embedder, store, Box::new(ParagraphChunker), 3).unwrap();
        let (mut sink, _rx) = ProgressSink::channel();

        let err = ingestor
            .run(Uuid::new_v4(), &[document("lease", 2)], IndexTarget::new("idx", "ns"), &mut sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("8-dimensional"));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let result = Ingestor::new(
            Arc::new(FakeEmbedder::new(4)),
            Arc::new(RecordingStore::new()),
            Box::new(ParagraphChunker),
            0,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_spawned_job_streams_until_complete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lease.txt"), "word ".repeat(120)).unwrap();
        std::fs::write(dir.path().join("notes.bin"), [0u8, 1, 2]).unwrap();

        let store = Arc::new(RecordingStore::new());
        let chunker = create_chunker(&ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 0,
        })
        .unwrap();
        let ingestor = Arc::new(Ingestor::new(Arc::new(FakeEmbedder::new(4)), store.clone(), chunker, 2).unwrap());

        let handle = ingestor.spawn_job(dir.path().to_path_buf(), IndexTarget::new("idx", "ns"));
        let events = drain(handle.events).await;
        let events = progress(&events);

        let last = events.last().unwrap();
        assert!(last.is_complete);
        assert_eq!(last.filename, "lease");
        assert_eq!(last.chunks_upserted, last.total_chunks);
        assert_eq!(events.iter().filter(|p| p.is_complete).count(), 1);
        assert_eq!(store.ids().len(), last.total_chunks);
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_job_logs_share_the_handle_id() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lease.txt"), "Clause one\n\nClause two").unwrap();
        let ingestor = Arc::new(ingestor(FakeEmbedder::new(4), Arc::new(RecordingStore::new()), 3));

        let handle = ingestor.spawn_job(dir.path().to_path_buf(), IndexTarget::new("idx", "ns"));
        let id = handle.id.to_string();
        drain(handle.events).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let job_lines: Vec<&str> = output.lines().filter(|l| l.contains("Ingest")).collect();
        assert!(job_lines.len() >= 2, "missing job logs: {}", output);
        assert!(job_lines.iter().all(|l| l.contains(&id)), "uncorrelated logs: {}", output);
    }

    #[tokio::test]
    async fn test_spawned_job_reports_single_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lease.txt"), "Clause one\n\nClause two").unwrap();

        let ingestor = Arc::new(ingestor(
            FakeEmbedder::new(4),
            Arc::new(RecordingStore::new().failing()),
            3,
        ));

        let handle = ingestor.spawn_job(dir.path().to_path_buf(), IndexTarget::new("idx", "ns"));
        let events = drain(handle.events).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], IngestEvent::Failed { error } if error.contains("upsert rejected")));
    }

    #[tokio::test]
    async fn test_missing_folder_is_reported_as_error_event() {
        let ingestor = Arc::new(ingestor(FakeEmbedder::new(4), Arc::new(RecordingStore::new()), 3));
        let handle = ingestor.spawn_job(PathBuf::from("/definitely/not/here"), IndexTarget::new("idx", "ns"));
        let events = drain(handle.events).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], IngestEvent::Failed { error } if error.contains("not found")));
    }
}
