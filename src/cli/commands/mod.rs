//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod files;
mod ingest;
mod serve;
mod stats;
mod summarize;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use files::run_files;
pub use ingest::run_ingest;
pub use serve::{router, run_serve, AppState};
pub use stats::run_stats;
pub use summarize::run_summarize;
