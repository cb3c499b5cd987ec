//! HTTP API server.
//!
//! Provides the endpoints the browser client talks to: ingestion with streamed
//! progress, the documents folder listing, summarization, and streamed chat.

use crate::chat::{data_stream, ChatMessage, DATA_STREAM_HEADER};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::LexwiseError;
use crate::ingest::IngestEvent;
use crate::orchestrator::Orchestrator;
use crate::vector_store::IndexTarget;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lexwise API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ingest", "POST /api/ingest");
    Output::kv("Files", "GET  /api/files");
    Output::kv("Summarize", "POST /api/summarize");
    Output::kv("Chat", "POST /api/chat");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/ingest", post(ingest))
        .route("/api/files", get(files))
        .route("/api/summarize", post(summarize))
        .route("/api/chat", post(chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct IngestRequest {
    indexname: String,
    namespace: String,
}

#[derive(Deserialize)]
struct SummarizeRequest {
    base64: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    data: Option<ChatData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatData {
    #[serde(default)]
    report_data: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct FilesErrorResponse {
    err: &'static str,
    error: String,
}

/// Maps library errors onto status codes: bad input is the caller's fault,
/// everything else is ours or upstream's.
struct ApiError(LexwiseError);

impl From<LexwiseError> for ApiError {
    fn from(e: LexwiseError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ingest(State(state): State<Arc<AppState>>, Json(req): Json<IngestRequest>) -> impl IntoResponse {
    let handle = state
        .orchestrator
        .start_ingestion(IndexTarget::new(req.indexname, req.namespace));
    info!(job = %handle.id, "Started ingestion job");

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(progress_lines(handle.events)),
    )
}

/// One JSON line per event, ending right after the terminal event.
fn progress_lines(events: mpsc::Receiver<IngestEvent>) -> impl Stream<Item = Result<String, Infallible>> {
    stream::unfold((events, false), |(mut events, finished)| async move {
        if finished {
            return None;
        }
        loop {
            let event = events.recv().await?;
            match event.to_line() {
                Ok(line) => return Some((Ok(line), (events, event.is_terminal()))),
                Err(e) => warn!("Dropping unserializable progress event: {}", e),
            }
        }
    })
}

async fn files(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.list_documents() {
        Ok(names) => Json(names).into_response(),
        Err(e) => {
            error!("Failed to read documents folder: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FilesErrorResponse {
                    err: "Failed to read files",
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Response, ApiError> {
    let summary = state.orchestrator.summarizer().summarize(&req.base64).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], summary).into_response())
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Result<Response, ApiError> {
    let summary = req.data.and_then(|d| d.report_data);
    let answer = state
        .orchestrator
        .chat()
        .answer(&req.messages, summary.as_deref())
        .await?;

    let body = Body::from_stream(data_stream(answer).map(Ok::<_, Infallible>));
    Ok((
        [
            ("content-type", "text/plain; charset=utf-8"),
            DATA_STREAM_HEADER,
        ],
        body,
    )
        .into_response())
}
