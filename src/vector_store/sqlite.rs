//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity. Meant
//! for offline, single-user setups; the hosted index is the default.

use super::{cosine_similarity, rank, IndexTarget, ScoredMatch, VectorRecord, VectorStore};
use crate::error::{LexwiseError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vectors (
        index_name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        id TEXT NOT NULL,
        chunk TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (index_name, namespace, id)
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LexwiseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, records), fields(target = %target, count = records.len()))]
    async fn upsert(&self, target: &IndexTarget, records: &[VectorRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for record in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO vectors
                (index_name, namespace, id, chunk, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    target.index,
                    target.namespace,
                    record.id,
                    record.metadata.chunk,
                    Self::embedding_to_bytes(&record.values),
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Upserted {} records", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, vector), fields(target = %target))]
    async fn query(&self, target: &IndexTarget, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, chunk, embedding FROM vectors WHERE index_name = ?1 AND namespace = ?2",
        )?;

        let rows = stmt.query_map(params![target.index, target.namespace], |row| {
            let id: String = row.get(0)?;
            let chunk: String = row.get(1)?;
            let embedding: Vec<u8> = row.get(2)?;
            Ok((id, chunk, embedding))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (id, chunk, embedding) = row?;
            let score = cosine_similarity(vector, &Self::bytes_to_embedding(&embedding));
            matches.push(ScoredMatch {
                id,
                score,
                chunk: Some(chunk),
            });
        }

        Ok(rank(matches, top_k))
    }

    async fn count(&self, target: &IndexTarget) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vectors WHERE index_name = ?1 AND namespace = ?2",
            params![target.index, target.namespace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::RecordMetadata;

    fn record(id: &str, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: RecordMetadata {
                chunk: format!("chunk {}", id),
            },
        }
    }

    #[test]
    fn test_embedding_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }

    #[tokio::test]
    async fn test_upsert_query_and_count() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let target = IndexTarget::new("index-one", "testspace");

        store
            .upsert(
                &target,
                &[
                    record("a", vec![1.0, 0.0]),
                    record("b", vec![0.7, 0.7]),
                    record("c", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store.upsert(&target, &[record("a", vec![1.0, 0.0])]).await.unwrap();

        assert_eq!(store.count(&target).await.unwrap(), 3);
        assert_eq!(
            store.count(&IndexTarget::new("index-one", "other")).await.unwrap(),
            0
        );

        let hits = store.query(&target, &[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(hits[0].chunk.as_deref(), Some("chunk a"));
    }

    #[tokio::test]
    async fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vectors.db");
        let target = IndexTarget::new("idx", "ns");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store.upsert(&target, &[record("a", vec![1.0])]).await.unwrap();
        }

        let reopened = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(reopened.count(&target).await.unwrap(), 1);
    }
}
