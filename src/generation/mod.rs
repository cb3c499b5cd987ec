//! Text generation through a hosted generative model.

mod gemini;

pub use gemini::GeminiClient;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Incremental answer text, in arrival order.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    /// Raw file bytes sent alongside the prompt.
    InlineData { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }
}

/// Trait for generative model backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a complete response for a multimodal prompt.
    async fn generate(&self, parts: Vec<Part>) -> Result<String>;

    /// Generate a response as a stream of text fragments.
    async fn stream(&self, prompt: &str) -> Result<TokenStream>;
}
