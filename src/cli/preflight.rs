//! Pre-flight checks before expensive operations.
//!
//! Validates that the API keys an operation needs are available before it
//! starts, so a run does not fail halfway through a document folder.

use crate::config::{EmbeddingProvider, Settings, VectorStoreProvider};
use crate::error::{LexwiseError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion embeds and writes vectors.
    Ingest,
    /// Summarizing calls the generative model.
    Summarize,
    /// Chat embeds, queries and generates.
    Chat,
    /// Stats only reads the vector store.
    Stats,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest => {
            check_embedding_key(settings)?;
            check_vector_store_key(settings)?;
        }
        Operation::Summarize => {
            check_key(settings.generation.resolved_api_key(), "GEMINI_API_KEY")?;
        }
        Operation::Chat => {
            check_embedding_key(settings)?;
            check_vector_store_key(settings)?;
            check_key(settings.generation.resolved_api_key(), "GEMINI_API_KEY")?;
        }
        Operation::Stats => {
            check_vector_store_key(settings)?;
        }
    }
    Ok(())
}

fn check_embedding_key(settings: &Settings) -> Result<()> {
    match settings.embedding.provider {
        // A self-hosted inference server usually runs without auth
        EmbeddingProvider::Local => Ok(()),
        EmbeddingProvider::HuggingFace => check_key(settings.embedding.resolved_api_key(), "HF_TOKEN"),
        EmbeddingProvider::OpenAI => check_key(settings.embedding.resolved_api_key(), "OPENAI_API_KEY"),
    }
}

fn check_vector_store_key(settings: &Settings) -> Result<()> {
    match settings.vector_store.provider {
        VectorStoreProvider::Pinecone => {
            check_key(settings.vector_store.resolved_api_key(), "PINECONE_API_KEY")
        }
        VectorStoreProvider::Sqlite | VectorStoreProvider::Memory => Ok(()),
    }
}

fn check_key(key: Option<String>, env_var: &str) -> Result<()> {
    match key {
        Some(_) => Ok(()),
        None => Err(LexwiseError::Config(format!(
            "{} not set. Set it with: export {}='...' (or add it to the config file)",
            env_var, env_var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_setup_needs_no_keys() {
        let mut settings = Settings::default();
        settings.embedding.provider = EmbeddingProvider::Local;
        settings.vector_store.provider = VectorStoreProvider::Sqlite;
        assert!(check(Operation::Ingest, &settings).is_ok());
        assert!(check(Operation::Stats, &settings).is_ok());
    }

    #[test]
    fn test_configured_keys_pass() {
        let mut settings = Settings::default();
        settings.embedding.api_key = Some("hf_test".to_string());
        settings.vector_store.api_key = Some("pc-test".to_string());
        settings.generation.api_key = Some("g-test".to_string());
        assert!(check(Operation::Chat, &settings).is_ok());
        assert!(check(Operation::Summarize, &settings).is_ok());
    }

    #[test]
    fn test_missing_key_names_variable() {
        let err = check_key(None, "PINECONE_API_KEY").unwrap_err();
        assert!(err.to_string().contains("export PINECONE_API_KEY"));
    }
}
