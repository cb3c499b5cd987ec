//! Retrieval-augmented chat about a legal document.
//!
//! A turn embeds the latest question (optionally prefixed with the document
//! summary), retrieves legal references, and streams the model's answer.

pub mod context;
mod engine;
pub mod wire;

pub use context::{format_references, NO_MATCHES};
pub use engine::{ChatAnswer, ChatEngine};
pub use wire::{data_stream, DataStreamPart, DATA_STREAM_HEADER};

use serde::{Deserialize, Serialize};

/// One message of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}
