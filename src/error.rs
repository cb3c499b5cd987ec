//! Error types for Lexwise.

use thiserror::Error;

/// Library-level error type for Lexwise operations.
#[derive(Error, Debug)]
pub enum LexwiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document loading failed: {0}")]
    Loader(String),

    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LexwiseError {
    /// Whether this error was caused by the caller's input rather than by us
    /// or an upstream provider.
    pub fn is_client_error(&self) -> bool {
        matches!(self, LexwiseError::InvalidInput(_))
    }
}

/// Result type alias for Lexwise operations.
pub type Result<T> = std::result::Result<T, LexwiseError>;
