//! Gemini REST client.

use super::{Generator, Part, TokenStream};
use crate::error::{LexwiseError, Result};
use crate::http::error_body;
use async_trait::async_trait;
use base64::Engine as _;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    /// Base64 encoded.
    data: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }

    fn joined_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

impl From<Part> for WirePart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => WirePart::Text { text },
            Part::InlineData { mime_type, data } => WirePart::InlineData {
                inline_data: InlineData {
                    mime_type,
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                },
            },
        }
    }
}

/// Gemini client bound to one model.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    safety_threshold: Option<String>,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            safety_threshold: None,
        }
    }

    /// Relax (or tighten) the dangerous-content filter.
    pub fn with_safety_threshold(mut self, threshold: Option<String>) -> Self {
        self.safety_threshold = threshold;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            LexwiseError::Config(
                "GEMINI_API_KEY is not set. Set it with: export GEMINI_API_KEY='...'".to_string(),
            )
        })
    }

    fn request_body(&self, parts: Vec<Part>) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: parts.into_iter().map(WirePart::from).collect(),
            }],
            safety_settings: self
                .safety_threshold
                .iter()
                .map(|threshold| SafetySetting {
                    category: "HARM_CATEGORY_DANGEROUS_CONTENT",
                    threshold: threshold.clone(),
                })
                .collect(),
        }
    }

    async fn send(&self, method: &str, body: &GenerateRequest) -> Result<reqwest::Response> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:{}", self.base_url, self.model, method);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LexwiseError::Generation(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LexwiseError::Generation(format!(
                "Gemini API error: {}",
                error_body(response).await
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    #[instrument(skip(self, parts), fields(model = %self.model, parts = parts.len()))]
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let body = self.request_body(parts);
        let response: GenerateResponse = self.send("generateContent", &body).await?.json().await?;

        let text = response
            .first_text()
            .ok_or_else(|| LexwiseError::Generation("Gemini returned no text".to_string()))?;
        debug!("Generated {} characters", text.len());
        Ok(text.to_string())
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let body = self.request_body(vec![Part::text(prompt)]);
        let response = self.send("streamGenerateContent?alt=sse", &body).await?;

        let tokens = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => event_text(&event.data).map(Ok),
                    Err(e) => Some(Err(LexwiseError::Generation(format!(
                        "Gemini stream interrupted: {}",
                        e
                    )))),
                }
            });

        Ok(tokens.boxed())
    }
}

/// Text carried by one streamed event, if any.
fn event_text(data: &str) -> Option<String> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<GenerateResponse>(data) {
        Ok(chunk) => Some(chunk.joined_text()).filter(|text| !text.is_empty()),
        Err(e) => {
            warn!("Skipping malformed Gemini stream event: {} ({})", e, data);
            None
        }
    }
}
