//! Vector store abstraction for Lexwise.
//!
//! Records live in a named index and, within it, a namespace. Both names are
//! passed through untouched; validating them is the backend's job.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use pinecone::PineconeStore;
pub use sqlite::SqliteVectorStore;

use crate::config::{Settings, VectorStoreProvider};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Index and namespace a call operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexTarget {
    pub index: String,
    pub namespace: String,
}

impl IndexTarget {
    pub fn new(index: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.index, self.namespace)
    }
}

/// Metadata stored with every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// The chunk text the vector was computed from.
    pub chunk: String,
}

/// A vector ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// A similarity query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    /// Similarity score (higher is better).
    pub score: f32,
    /// Chunk text, if the record carried metadata.
    pub chunk: Option<String>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records; returns how many were written.
    async fn upsert(&self, target: &IndexTarget, records: &[VectorRecord]) -> Result<usize>;

    /// Return up to `top_k` records by descending similarity to `vector`.
    async fn query(&self, target: &IndexTarget, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>>;

    /// Number of records stored under the target.
    async fn count(&self, target: &IndexTarget) -> Result<usize>;
}

/// Build the vector store selected in settings.
pub fn create_vector_store(settings: &Settings, http: reqwest::Client) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
        VectorStoreProvider::Pinecone => Arc::new(PineconeStore::new(
            http,
            &settings.vector_store.controller_url,
            &settings.vector_store.api_version,
            settings.vector_store.resolved_api_key(),
        )?),
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
    };
    Ok(store)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort hits best-first and keep the top `k`.
pub(crate) fn rank(mut matches: Vec<ScoredMatch>, top_k: usize) -> Vec<ScoredMatch> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}
