//! Document ingestion: chunk, embed, upsert, and stream progress.

mod job;
mod pipeline;
mod progress;

pub use job::IngestionJob;
pub use pipeline::{Ingestor, JobHandle};
pub use progress::{IngestEvent, JobState, ProgressDecoder, ProgressEvent, ProgressSink, PROGRESS_BUFFER};
