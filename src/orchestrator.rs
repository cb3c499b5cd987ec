//! Component wiring for Lexwise.
//!
//! Builds the embedder, vector store and generators from settings once and
//! hands out the engines that use them.

use crate::chat::ChatEngine;
use crate::chunking::{create_chunker, ChunkingConfig};
use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::Result;
use crate::generation::{GeminiClient, Generator};
use crate::http::create_client_with_timeout;
use crate::ingest::{Ingestor, JobHandle};
use crate::loader::list_files;
use crate::summarize::Summarizer;
use crate::vector_store::{create_vector_store, IndexTarget, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// The main orchestrator for Lexwise.
pub struct Orchestrator {
    settings: Settings,
    vector_store: Arc<dyn VectorStore>,
    ingestor: Arc<Ingestor>,
    chat: ChatEngine,
    summarizer: Summarizer,
}

/// Generators for the two model roles.
pub struct Generators {
    pub summary: Arc<dyn Generator>,
    pub chat: Arc<dyn Generator>,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let http = create_client_with_timeout(settings.request_timeout())?;

        let embedder = create_embedder(&settings.embedding, http.clone())?;
        let vector_store = create_vector_store(&settings, http.clone())?;

        let generation = &settings.generation;
        let api_key = generation.resolved_api_key();
        let generators = Generators {
            summary: Arc::new(GeminiClient::new(
                http.clone(),
                &generation.base_url,
                &generation.summary_model,
                api_key.clone(),
            )),
            chat: Arc::new(
                GeminiClient::new(http, &generation.base_url, &generation.chat_model, api_key)
                    .with_safety_threshold(generation.safety_threshold.clone()),
            ),
        };

        info!(
            "Using {} embeddings, {} vector store, {} for chat",
            settings.embedding.provider, settings.vector_store.provider, generation.chat_model
        );

        Self::with_components(settings, prompts, embedder, vector_store, generators)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        generators: Generators,
    ) -> Result<Self> {
        let chunker = create_chunker(&ChunkingConfig::from(&settings.ingestion))?;
        let ingestor = Arc::new(Ingestor::new(
            embedder.clone(),
            vector_store.clone(),
            chunker,
            settings.ingestion.batch_size,
        )?);

        let chat = ChatEngine::new(
            embedder,
            vector_store.clone(),
            generators.chat,
            IndexTarget::new(&settings.chat.index_name, &settings.chat.namespace),
        )
        .with_prompts(prompts.clone())
        .with_top_k(settings.chat.top_k);

        let summarizer = Summarizer::new(generators.summary, &prompts)?;

        Ok(Self {
            settings,
            vector_store,
            ingestor,
            chat,
            summarizer,
        })
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn chat(&self) -> &ChatEngine {
        &self.chat
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.settings.documents_dir()
    }

    /// Names of the files waiting in the documents folder.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        list_files(&self.documents_dir())
    }

    /// Start ingesting the documents folder into `target`.
    pub fn start_ingestion(&self, target: IndexTarget) -> JobHandle {
        self.ingestor.clone().spawn_job(self.documents_dir(), target)
    }
}
