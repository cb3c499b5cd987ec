//! Configuration module for Lexwise.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, Prompts, SummaryPrompts};
pub use settings::{
    ChatSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings, GenerationSettings,
    IngestionSettings, PromptSettings, ServerSettings, Settings, VectorStoreProvider,
    VectorStoreSettings,
};
