//! Feature-extraction embeddings over HTTP.
//!
//! Covers both the hosted Hugging Face inference API and a self-hosted
//! text-embeddings-inference server. The two speak the same request shape and
//! differ only in endpoint layout and whether a token is mandatory.

use super::Embedder;
use crate::error::{LexwiseError, Result};
use crate::http::error_body;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// Which inference server flavour to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceApi {
    /// `{base}/models/{model}/pipeline/feature-extraction`, token required.
    HuggingFace,
    /// `{base}/embed`, token optional.
    Local,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

/// Shapes the feature-extraction endpoint may answer with.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    /// One pooled vector per input (sentence-transformers models).
    Pooled(Vec<Vec<f32>>),
    /// One vector per token per input; pooled here by taking the CLS token.
    TokenLevel(Vec<Vec<Vec<f32>>>),
    /// A single pooled vector, returned for single-string inputs.
    Single(Vec<f32>),
}

impl FeatureExtractionResponse {
    fn into_vectors(self) -> Result<Vec<Vec<f32>>> {
        match self {
            FeatureExtractionResponse::Pooled(vectors) => Ok(vectors),
            FeatureExtractionResponse::Single(vector) => Ok(vec![vector]),
            FeatureExtractionResponse::TokenLevel(documents) => documents
                .into_iter()
                .map(|tokens| {
                    tokens.into_iter().next().ok_or_else(|| {
                        LexwiseError::Embedding("Token-level output had no tokens".to_string())
                    })
                })
                .collect(),
        }
    }
}

/// Embedder backed by a feature-extraction inference endpoint.
pub struct InferenceEmbedder {
    client: reqwest::Client,
    api: InferenceApi,
    endpoint: Url,
    model: String,
    token: Option<String>,
    dimensions: usize,
}

impl InferenceEmbedder {
    /// Create an embedder for `model` served under `base_url`.
    pub fn new(
        client: reqwest::Client,
        api: InferenceApi,
        base_url: &str,
        model: &str,
        token: Option<String>,
        dimensions: usize,
    ) -> Result<Self> {
        let base = base_url.trim_end_matches('/');
        let endpoint = match api {
            InferenceApi::HuggingFace => {
                format!("{}/models/{}/pipeline/feature-extraction", base, model)
            }
            InferenceApi::Local => format!("{}/embed", base),
        };
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            LexwiseError::Config(format!("Invalid embedding endpoint {}: {}", endpoint, e))
        })?;

        Ok(Self {
            client,
            api,
            endpoint,
            model: model.to_string(),
            token,
            dimensions,
        })
    }

    fn check_vectors(&self, vectors: &[Vec<f32>], expected: usize) -> Result<()> {
        if vectors.len() != expected {
            return Err(LexwiseError::Embedding(format!(
                "Expected {} embeddings, received {}",
                expected,
                vectors.len()
            )));
        }
        for vector in vectors {
            if vector.is_empty() {
                return Err(LexwiseError::Embedding("Empty embedding received".to_string()));
            }
            if vector.len() != self.dimensions {
                return Err(LexwiseError::Embedding(format!(
                    "Model {} returned {} dimensions, expected {}",
                    self.model,
                    vector.len(),
                    self.dimensions
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for InferenceEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LexwiseError::InvalidInput(
                "Query string cannot be empty".to_string(),
            ));
        }

        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LexwiseError::Embedding("No embedding output received".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if self.api == InferenceApi::HuggingFace && self.token.is_none() {
            return Err(LexwiseError::Config(
                "HF_TOKEN is not set. Set it with: export HF_TOKEN='hf_...'".to_string(),
            ));
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&FeatureExtractionRequest { inputs: texts });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LexwiseError::Embedding(format!("Failed to generate embeddings: {}", e)))?;

        if !response.status().is_success() {
            return Err(LexwiseError::Embedding(format!(
                "Failed to generate embeddings: {}",
                error_body(response).await
            )));
        }

        let parsed: FeatureExtractionResponse = response
            .json()
            .await
            .map_err(|e| LexwiseError::Embedding(format!("Unexpected embedding output: {}", e)))?;
        let vectors = parsed.into_vectors()?;
        self.check_vectors(&vectors, texts.len())?;

        debug!("Received {} embeddings", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hosted(server: &MockServer, token: Option<&str>, dimensions: usize) -> InferenceEmbedder {
        InferenceEmbedder::new(
            reqwest::Client::new(),
            InferenceApi::HuggingFace,
            &server.uri(),
            "org/test-model",
            token.map(str::to_string),
            dimensions,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_batch_embeddings_from_hosted_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/org/test-model/pipeline/feature-extraction"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(serde_json::json!({ "inputs": ["one", "two"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!([[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = hosted(&server, Some("hf_test"), 3);
        let vectors = embedder
            .embed_batch(&["one".to_string(), "two".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[tokio::test]
    async fn test_token_level_output_uses_first_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!([[[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]]]),
            ))
            .mount(&server)
            .await;

        let embedder = hosted(&server, Some("hf_test"), 2);
        let vector = embedder.embed("  what is a lease?  ").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let embedder = hosted(&server, None, 3);
        let err = embedder.embed("query").await.unwrap_err();
        assert!(matches!(err, LexwiseError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let server = MockServer::start().await;
        let embedder = hosted(&server, Some("hf_test"), 3);
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, LexwiseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_is_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let embedder = hosted(&server, Some("hf_test"), 3);
        let err = embedder.embed("query").await.unwrap_err();
        assert!(matches!(err, LexwiseError::Embedding(_)));
        assert!(err.to_string().contains("model loading"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[0.1, 0.2]])))
            .mount(&server)
            .await;

        let embedder = hosted(&server, Some("hf_test"), 1024);
        assert!(embedder.embed("query").await.is_err());
    }

    #[tokio::test]
    async fn test_local_server_needs_no_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[0.5, 0.5]])))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = InferenceEmbedder::new(
            reqwest::Client::new(),
            InferenceApi::Local,
            &format!("{}/", server.uri()),
            "ignored",
            None,
            2,
        )
        .unwrap();

        assert_eq!(embedder.embed("clause").await.unwrap(), vec![0.5, 0.5]);
    }
}
