//! Lexwise - Legal Document Chat Assistant
//!
//! Summarize an uploaded legal document, index reference material in a vector
//! database, and chat about the document with retrieval-augmented answers.
//!
//! # Overview
//!
//! Lexwise allows you to:
//! - Ingest a folder of PDFs and text files into a namespaced vector index
//! - Summarize a document image or PDF with a hosted generative model
//! - Ask questions answered from the summary and retrieved legal references
//! - Serve all of the above over HTTP with streamed progress and answers
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `loader` - Reading documents by file extension
//! - `chunking` - Recursive character text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `generation` - Generative model client
//! - `ingest` - Ingestion jobs and progress streaming
//! - `chat` - Retrieval-augmented chat
//! - `summarize` - Document summarization
//! - `orchestrator` - Wiring the components from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use lexwise::config::Settings;
//! use lexwise::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let summary = orchestrator
//!         .summarizer()
//!         .summarize("data:image/png;base64,iVBORw0KGgo=")
//!         .await?;
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod loader;
pub mod orchestrator;
pub mod stream;
pub mod summarize;
pub mod vector_store;

pub use error::{LexwiseError, Result};
