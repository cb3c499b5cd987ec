//! Embedding generation for indexing and retrieval.

mod inference;
mod openai;

pub use inference::{InferenceApi, InferenceEmbedder};
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder selected in settings.
pub fn create_embedder(settings: &EmbeddingSettings, http: reqwest::Client) -> Result<Arc<dyn Embedder>> {
    let dimensions = settings.dimensions as usize;
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::HuggingFace => Arc::new(InferenceEmbedder::new(
            http,
            InferenceApi::HuggingFace,
            &settings.base_url,
            &settings.model,
            settings.resolved_api_key(),
            dimensions,
        )?),
        EmbeddingProvider::Local => Arc::new(InferenceEmbedder::new(
            http,
            InferenceApi::Local,
            &settings.base_url,
            &settings.model,
            settings.resolved_api_key(),
            dimensions,
        )?),
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            dimensions,
            settings.resolved_api_key(),
            http,
        )),
    };
    Ok(embedder)
}
