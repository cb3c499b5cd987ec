//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::http::{create_client_with_timeout, error_body};
use crate::ingest::{IngestEvent, ProgressDecoder};
use crate::orchestrator::Orchestrator;
use crate::vector_store::IndexTarget;
use anyhow::{anyhow, bail, Result};
use futures::StreamExt;
use indicatif::ProgressBar;

/// Run the ingest command.
pub async fn run_ingest(
    index: Option<String>,
    namespace: Option<String>,
    server: Option<String>,
    settings: Settings,
) -> Result<()> {
    let target = IndexTarget::new(
        index.unwrap_or_else(|| settings.chat.index_name.clone()),
        namespace.unwrap_or_else(|| settings.chat.namespace.clone()),
    );
    let mut view = ProgressView::new(&target);

    match server {
        Some(server) => {
            Output::info(&format!("Ingesting on {} into {}", server, target));
            let client = create_client_with_timeout(settings.request_timeout())?;
            ingest_remote(&client, &server, &target, |event| view.update(event)).await
        }
        None => {
            if let Err(e) = preflight::check(Operation::Ingest, &settings) {
                Output::error(&format!("{}", e));
                Output::info("Run 'lexwise doctor' for detailed diagnostics.");
                return Err(e.into());
            }

            let orchestrator = Orchestrator::new(settings)?;
            Output::info(&format!(
                "Ingesting {} into {}",
                orchestrator.documents_dir().display(),
                target
            ));

            let mut handle = orchestrator.start_ingestion(target);
            while let Some(event) = handle.events.recv().await {
                if view.update(event)? {
                    return Ok(());
                }
            }
            view.interrupted()
        }
    }
}

/// Start a job on a running server and feed its progress events to `on_event`
/// until it reports a terminal event.
async fn ingest_remote(
    client: &reqwest::Client,
    server: &str,
    target: &IndexTarget,
    mut on_event: impl FnMut(IngestEvent) -> Result<bool>,
) -> Result<()> {
    let response = client
        .post(format!("{}/api/ingest", server.trim_end_matches('/')))
        .json(&serde_json::json!({
            "indexname": target.index,
            "namespace": target.namespace,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        bail!("Server rejected ingestion: {}", error_body(response).await);
    }

    let mut decoder = ProgressDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        for event in decoder.push(&chunk?) {
            if on_event(event)? {
                return Ok(());
            }
        }
    }
    if let Some(event) = decoder.finish() {
        if on_event(event)? {
            return Ok(());
        }
    }

    Err(anyhow!("Ingestion stream ended before the job completed"))
}

/// Progress bar driven by ingestion events.
struct ProgressView {
    bar: ProgressBar,
    target: String,
    current: Option<String>,
}

impl ProgressView {
    fn new(target: &IndexTarget) -> Self {
        Self {
            bar: Output::progress_bar(0, "Loading documents..."),
            target: target.to_string(),
            current: None,
        }
    }

    /// Apply an event. Returns `Ok(true)` once the job has completed.
    fn update(&mut self, event: IngestEvent) -> Result<bool> {
        match event {
            IngestEvent::Progress(p) if p.is_complete => {
                self.bar.finish_and_clear();
                Output::success(&format!(
                    "Ingested {} document(s) into {}",
                    p.documents_processed, self.target
                ));
                Ok(true)
            }
            IngestEvent::Progress(p) => {
                if self.current.as_deref() != Some(p.filename.as_str()) {
                    let message = if p.total_documents > 0 {
                        format!("{} ({}/{})", p.filename, p.documents_processed + 1, p.total_documents)
                    } else {
                        p.filename.clone()
                    };
                    self.bar.set_length(p.total_chunks as u64);
                    self.bar.set_message(message);
                    self.current = Some(p.filename);
                }
                self.bar.set_position(p.chunks_upserted as u64);
                Ok(false)
            }
            IngestEvent::Failed { error } => {
                self.bar.abandon();
                Output::error(&format!("Ingestion failed: {}", error));
                Err(anyhow!(error))
            }
        }
    }

    fn interrupted(&self) -> Result<()> {
        self.bar.abandon();
        Err(anyhow!("Ingestion stopped before the job completed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ProgressEvent;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn line(upserted: usize, complete: bool) -> String {
        IngestEvent::Progress(ProgressEvent {
            filename: "lease".to_string(),
            total_chunks: 7,
            chunks_upserted: upserted,
            is_complete: complete,
            documents_processed: usize::from(complete),
            total_documents: 1,
        })
        .to_line()
        .unwrap()
    }

    #[tokio::test]
    async fn test_remote_ingest_reads_until_complete() {
        let server = MockServer::start().await;
        let body = format!("{}garbage\n{}{}", line(3, false), line(7, false), line(7, true));
        Mock::given(method("POST"))
            .and(path("/api/ingest"))
            .and(body_json(serde_json::json!({ "indexname": "index-one", "namespace": "acts" })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let mut seen = Vec::new();
        ingest_remote(
            &reqwest::Client::new(),
            &server.uri(),
            &IndexTarget::new("index-one", "acts"),
            |event| {
                let done = event.is_terminal();
                seen.push(event);
                Ok(done)
            },
        )
        .await
        .unwrap();

        assert_eq!(seen.len(), 3);
        assert!(seen[2].is_terminal());
    }

    #[tokio::test]
    async fn test_remote_ingest_without_terminal_event_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(line(3, false), "text/event-stream"))
            .mount(&server)
            .await;

        let result = ingest_remote(
            &reqwest::Client::new(),
            &server.uri(),
            &IndexTarget::new("index-one", "acts"),
            |event| Ok(event.is_terminal()),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_view_reports_failure() {
        let mut view = ProgressView::new(&IndexTarget::new("i", "n"));
        assert!(!view.update(serde_json::from_str(&line(3, false)).unwrap()).unwrap());
        assert!(view
            .update(IngestEvent::Failed {
                error: "quota exceeded".to_string()
            })
            .is_err());
    }
}
