//! Configuration settings for Lexwise.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub generation: GenerationSettings,
    pub ingestion: IngestionSettings,
    pub chat: ChatSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Folder scanned by ingestion and the file listing.
    pub documents_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            documents_dir: "./documents".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Overall deadline for a single provider request, streamed bodies included.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: crate::http::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hosted Hugging Face inference API.
    #[default]
    HuggingFace,
    /// Self-hosted text-embeddings-inference server.
    Local,
    /// OpenAI embeddings endpoint.
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(EmbeddingProvider::HuggingFace),
            "local" | "tei" => Ok(EmbeddingProvider::Local),
            "openai" => Ok(EmbeddingProvider::OpenAI),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::HuggingFace => write!(f, "huggingface"),
            EmbeddingProvider::Local => write!(f, "local"),
            EmbeddingProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Inference endpoint. For `huggingface` this is the router prefix, for
    /// `local` the root of the inference server. Ignored for `openai`.
    pub base_url: String,
    /// Embedding dimensions. Must match the vector index.
    pub dimensions: u32,
    /// API token. Falls back to `HF_TOKEN` (or `OPENAI_API_KEY` for openai).
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::HuggingFace,
            model: "mixedbread-ai/mxbai-embed-large-v1".to_string(),
            base_url: "https://router.huggingface.co/hf-inference".to_string(),
            dimensions: 1024,
            api_key: None,
        }
    }
}

impl EmbeddingSettings {
    /// Resolve the API token from config or the provider's environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        let var = match self.provider {
            EmbeddingProvider::OpenAI => "OPENAI_API_KEY",
            EmbeddingProvider::HuggingFace | EmbeddingProvider::Local => "HF_TOKEN",
        };
        resolve_key(self.api_key.as_deref(), var)
    }
}

/// Vector store provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Hosted Pinecone index.
    #[default]
    Pinecone,
    /// Local SQLite file.
    Sqlite,
    /// Process memory; lost on exit.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
    /// Pinecone API key. Falls back to `PINECONE_API_KEY`.
    pub api_key: Option<String>,
    /// Pinecone control plane, used to resolve index hosts.
    pub controller_url: String,
    /// Value of the `X-Pinecone-API-Version` header.
    pub api_version: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Pinecone,
            api_key: None,
            controller_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            sqlite_path: "~/.lexwise/vectors.db".to_string(),
        }
    }
}

impl VectorStoreSettings {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), "PINECONE_API_KEY")
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Gemini API key. Falls back to `GEMINI_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used to summarize uploaded documents.
    pub summary_model: String,
    /// Model used for streamed chat answers.
    pub chat_model: String,
    /// Threshold applied to the dangerous-content safety category for chat.
    /// Legal questions routinely touch violence and crime.
    pub safety_threshold: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            summary_model: "gemini-1.5-pro".to_string(),
            chat_model: "gemini-1.5-pro-latest".to_string(),
            safety_threshold: Some("BLOCK_NONE".to_string()),
        }
    }
}

impl GenerationSettings {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), "GEMINI_API_KEY")
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Chunks embedded and upserted per round trip.
    pub batch_size: usize,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval settings for chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Index queried for legal references.
    pub index_name: String,
    pub namespace: String,
    /// Number of references retrieved per turn.
    pub top_k: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            index_name: "index-one".to_string(),
            namespace: "testspace".to_string(),
            top_k: 5,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// A blank configured key counts as unset, so the environment still applies.
fn resolve_key(configured: Option<&str>, env_var: &str) -> Option<String> {
    let non_blank = |k: &String| !k.trim().is_empty();
    configured
        .map(str::to_string)
        .filter(non_blank)
        .or_else(|| std::env::var(env_var).ok().filter(non_blank))
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject settings that would only fail later, mid-ingestion.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::LexwiseError;

        if self.ingestion.batch_size == 0 {
            return Err(LexwiseError::Config(
                "ingestion.batch_size must be at least 1".to_string(),
            ));
        }
        if self.ingestion.chunk_size == 0 {
            return Err(LexwiseError::Config(
                "ingestion.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(LexwiseError::Config(format!(
                "ingestion.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.ingestion.chunk_overlap, self.ingestion.chunk_size
            )));
        }
        if self.chat.top_k == 0 {
            return Err(LexwiseError::Config("chat.top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LexwiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexwise")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded documents directory path.
    pub fn documents_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.documents_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
