//! Splitting document text into bounded, overlapping chunks.

mod recursive;

pub use recursive::RecursiveSplitter;

use crate::config::IngestionSettings;
use crate::error::Result;

/// Separators tried in order, from paragraph breaks down to single characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl From<&IngestionSettings> for ChunkingConfig {
    fn from(settings: &IngestionSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// Trait for text chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split text into chunks, in document order.
    fn split(&self, text: &str) -> Result<Vec<String>>;
}

/// Create the default chunker for the given configuration.
pub fn create_chunker(config: &ChunkingConfig) -> Result<Box<dyn Chunker>> {
    Ok(Box::new(RecursiveSplitter::new(config.clone())?))
}
