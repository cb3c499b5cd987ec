//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, rank, IndexTarget, ScoredMatch, VectorRecord, VectorStore};
use crate::error::{LexwiseError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    namespaces: RwLock<HashMap<IndexTarget, HashMap<String, VectorRecord>>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> LexwiseError {
    LexwiseError::VectorStore("In-memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, target: &IndexTarget, records: &[VectorRecord]) -> Result<usize> {
        let mut namespaces = self.namespaces.write().map_err(poisoned)?;
        let namespace = namespaces.entry(target.clone()).or_default();
        for record in records {
            namespace.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, target: &IndexTarget, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>> {
        let namespaces = self.namespaces.read().map_err(poisoned)?;
        let Some(namespace) = namespaces.get(target) else {
            return Ok(Vec::new());
        };

        let matches = namespace
            .values()
            .map(|record| ScoredMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                chunk: Some(record.metadata.chunk.clone()),
            })
            .collect();

        Ok(rank(matches, top_k))
    }

    async fn count(&self, target: &IndexTarget) -> Result<usize> {
        let namespaces = self.namespaces.read().map_err(poisoned)?;
        Ok(namespaces.get(target).map_or(0, HashMap::len))
    }
}
