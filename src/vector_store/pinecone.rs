//! Pinecone vector store over its REST API.
//!
//! Index hosts are resolved once through the control plane and cached; data
//! plane calls (upsert, query, stats) then go straight to the index host.

use super::{IndexTarget, ScoredMatch, VectorRecord, VectorStore};
use crate::error::{LexwiseError, Result};
use crate::http::error_body;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

/// Pinecone-backed vector store.
pub struct PineconeStore {
    client: reqwest::Client,
    controller: Url,
    api_version: String,
    api_key: Option<String>,
    hosts: RwLock<HashMap<String, Url>>,
}

impl PineconeStore {
    /// Create a store that resolves indexes through `controller_url`.
    pub fn new(
        client: reqwest::Client,
        controller_url: &str,
        api_version: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let mut controller = Url::parse(controller_url).map_err(|e| {
            LexwiseError::Config(format!("Invalid Pinecone controller URL {}: {}", controller_url, e))
        })?;
        // `join` replaces the last segment unless the path ends in a slash
        if !controller.path().ends_with('/') {
            let path = format!("{}/", controller.path());
            controller.set_path(&path);
        }

        Ok(Self {
            client,
            controller,
            api_version: api_version.to_string(),
            api_key,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            LexwiseError::Config(
                "PINECONE_API_KEY is not set. Set it with: export PINECONE_API_KEY='...'"
                    .to_string(),
            )
        })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .client
            .request(method, url)
            .header("Api-Key", self.api_key()?)
            .header("X-Pinecone-API-Version", &self.api_version))
    }

    /// Resolve (and cache) the data-plane host for an index.
    async fn index_host(&self, index: &str) -> Result<Url> {
        if let Some(host) = self
            .hosts
            .read()
            .map_err(|_| LexwiseError::VectorStore("Host cache lock poisoned".to_string()))?
            .get(index)
        {
            return Ok(host.clone());
        }

        let url = self
            .controller
            .join(&format!("indexes/{}", index))
            .map_err(|e| LexwiseError::VectorStore(format!("Invalid index name {}: {}", index, e)))?;

        let response = self
            .request(reqwest::Method::GET, url)?
            .send()
            .await
            .map_err(|e| LexwiseError::VectorStore(format!("Failed to describe index {}: {}", index, e)))?;

        if !response.status().is_success() {
            return Err(LexwiseError::VectorStore(format!(
                "Failed to describe index {}: {}",
                index,
                error_body(response).await
            )));
        }

        let description: IndexDescription = response.json().await?;
        let host = if description.host.contains("://") {
            description.host
        } else {
            format!("https://{}", description.host)
        };
        let host = Url::parse(&host)
            .map_err(|e| LexwiseError::VectorStore(format!("Invalid index host {}: {}", host, e)))?;

        info!("Resolved Pinecone index {} to {}", index, host);
        self.hosts
            .write()
            .map_err(|_| LexwiseError::VectorStore("Host cache lock poisoned".to_string()))?
            .insert(index.to_string(), host.clone());

        Ok(host)
    }

    async fn post<B: Serialize + ?Sized, R: serde::de::DeserializeOwned>(
        &self,
        index: &str,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = self
            .index_host(index)
            .await?
            .join(path)
            .map_err(|e| LexwiseError::VectorStore(format!("Invalid data plane path {}: {}", path, e)))?;

        let response = self
            .request(reqwest::Method::POST, url)?
            .json(body)
            .send()
            .await
            .map_err(|e| LexwiseError::VectorStore(format!("{} failed: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(LexwiseError::VectorStore(format!(
                "{} failed: {}",
                path,
                error_body(response).await
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    #[instrument(skip(self, records), fields(target = %target, count = records.len()))]
    async fn upsert(&self, target: &IndexTarget, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let response: UpsertResponse = self
            .post(
                &target.index,
                "vectors/upsert",
                &UpsertRequest {
                    vectors: records,
                    namespace: &target.namespace,
                },
            )
            .await?;

        let count = response.upserted_count.unwrap_or(records.len());
        debug!("Upserted {} vectors", count);
        Ok(count)
    }

    #[instrument(skip(self, vector), fields(target = %target))]
    async fn query(&self, target: &IndexTarget, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>> {
        let response: QueryResponse = self
            .post(
                &target.index,
                "query",
                &QueryRequest {
                    namespace: &target.namespace,
                    vector,
                    top_k,
                    include_metadata: true,
                    include_values: false,
                },
            )
            .await?;

        debug!("Query returned {} matches", response.matches.len());
        Ok(response
            .matches
            .into_iter()
            .map(|m| ScoredMatch {
                chunk: m
                    .metadata
                    .as_ref()
                    .and_then(|meta| meta.get("chunk"))
                    .and_then(|chunk| chunk.as_str())
                    .map(str::to_string),
                id: m.id,
                score: m.score,
            })
            .collect())
    }

    async fn count(&self, target: &IndexTarget) -> Result<usize> {
        let stats: IndexStats = self
            .post(&target.index, "describe_index_stats", &serde_json::json!({}))
            .await?;
        Ok(stats
            .namespaces
            .get(&target.namespace)
            .map_or(0, |ns| ns.vector_count))
    }
}
