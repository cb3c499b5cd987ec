//! Progress events and the channel that carries them.
//!
//! Each event travels as one JSON object per line. A job ends with exactly one
//! terminal event: a progress event with `isComplete` set, or an error.

use crate::error::{LexwiseError, Result};
use crate::stream::LineBuffer;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events buffered between the job and a slow reader.
pub const PROGRESS_BUFFER: usize = 64;

/// Progress for the document currently being ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub filename: String,
    pub total_chunks: usize,
    pub chunks_upserted: usize,
    pub is_complete: bool,
    #[serde(default)]
    pub documents_processed: usize,
    #[serde(default)]
    pub total_documents: usize,
}

/// A line on the ingestion stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngestEvent {
    Progress(ProgressEvent),
    Failed { error: String },
}

impl IngestEvent {
    /// Whether the stream ends after this event.
    pub fn is_terminal(&self) -> bool {
        match self {
            IngestEvent::Progress(p) => p.is_complete,
            IngestEvent::Failed { .. } => true,
        }
    }

    /// Serialize as one newline-terminated JSON line.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Lifecycle of a job as seen by its progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
    Failed,
}

/// Sending half of a job's progress channel.
///
/// Once a terminal event has been sent the sink refuses further events. A
/// reader that went away does not stop the job; events are then dropped.
pub struct ProgressSink {
    tx: mpsc::Sender<IngestEvent>,
    state: JobState,
    disconnected: bool,
}

impl ProgressSink {
    /// Create a sink and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::Receiver<IngestEvent>) {
        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        (
            Self {
                tx,
                state: JobState::Running,
                disconnected: false,
            },
            rx,
        )
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Report progress. An event with `is_complete` set completes the job.
    pub async fn progress(&mut self, event: ProgressEvent) -> Result<()> {
        self.emit(IngestEvent::Progress(event)).await
    }

    /// Fail the job with a message for the reader.
    pub async fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.emit(IngestEvent::Failed { error: error.into() }).await
    }

    async fn emit(&mut self, event: IngestEvent) -> Result<()> {
        if self.state != JobState::Running {
            return Err(LexwiseError::Ingestion(format!(
                "Progress channel already {:?}",
                self.state
            )));
        }

        match &event {
            IngestEvent::Progress(p) if p.is_complete => self.state = JobState::Completed,
            IngestEvent::Failed { .. } => self.state = JobState::Failed,
            IngestEvent::Progress(_) => {}
        }

        if self.tx.send(event).await.is_err() && !self.disconnected {
            self.disconnected = true;
            warn!("Progress reader disconnected; continuing without it");
        }
        Ok(())
    }
}

/// Reassembles events from a byte stream of JSON lines.
#[derive(Debug, Default)]
pub struct ProgressDecoder {
    lines: LineBuffer,
}

impl ProgressDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the body; returns every event it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<IngestEvent> {
        self.lines
            .push(bytes)
            .iter()
            .filter_map(|line| Self::decode(line))
            .collect()
    }

    /// Decode a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Option<IngestEvent> {
        self.lines.finish().and_then(|line| Self::decode(&line))
    }

    fn decode(line: &str) -> Option<IngestEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Skipping malformed progress line: {}", e);
                debug!("Malformed line: {}", line);
                None
            }
        }
    }
}
