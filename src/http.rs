//! Shared HTTP client construction for the hosted providers.

use crate::error::{LexwiseError, Result};
use std::time::Duration;

/// Default timeout for provider requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an HTTP client with a custom timeout.
///
/// The timeout covers the whole request including a streamed body, so it acts
/// as the coarse per-handler deadline.
pub fn create_client_with_timeout(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("lexwise/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LexwiseError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success response into an error message carrying the body.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => format!("HTTP {}: {}", status, body.trim()),
        _ => format!("HTTP {}", status),
    }
}
