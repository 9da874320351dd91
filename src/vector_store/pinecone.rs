//! Pinecone serverless index over the REST API.
//!
//! The control plane (`controller_url`) lists, creates, describes and deletes
//! indexes. Vector operations go to the per-index data-plane host returned by
//! describe, which is looked up once and cached.

use super::{IndexHandle, IndexSpec, IndexStats, QueryMatch, VectorIndex, VectorRecord};
use crate::config::VectorStoreSettings;
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

const API_VERSION: &str = "2024-07";
const UPSERT_BATCH_SIZE: usize = 100;

/// Pinecone-backed vector index.
pub struct PineconeIndex {
    client: Client,
    controller_url: String,
    spec: IndexSpec,
    cloud: String,
    region: String,
    host: RwLock<Option<String>>,
    ready_timeout: Duration,
    poll_interval: Duration,
}

impl PineconeIndex {
    /// Create a client for the index described by `spec`.
    pub fn new(api_key: &str, settings: &VectorStoreSettings, spec: IndexSpec) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(VidqaError::Config("missing Pinecone API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| VidqaError::Config("invalid Pinecone API key".to_string()))?,
        );
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            controller_url: settings.controller_url.trim_end_matches('/').to_string(),
            spec,
            cloud: settings.cloud.clone(),
            region: settings.region.clone(),
            host: RwLock::new(None),
            ready_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        })
    }

    /// Override how long `ensure_index` waits for a new index to become ready.
    pub fn with_ready_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.ready_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Names of all indexes in the project.
    #[instrument(skip(self))]
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/indexes", self.controller_url))
            .send()
            .await?;
        let list: IndexList = Self::check(response, "list indexes").await?.json().await?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    /// Describe the index. `None` if it does not exist.
    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let response = self
            .client
            .get(format!("{}/indexes/{}", self.controller_url, self.spec.name))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let description = Self::check(response, "describe index").await?.json().await?;
        Ok(Some(description))
    }

    async fn create_index(&self) -> Result<bool> {
        let body = json!({
            "name": self.spec.name,
            "dimension": self.spec.dimension,
            "metric": self.spec.metric,
            "spec": { "serverless": { "cloud": self.cloud, "region": self.region } }
        });

        let response = self
            .client
            .post(format!("{}/indexes", self.controller_url))
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!("Index '{}' was created concurrently", self.spec.name);
            return Ok(false);
        }
        Self::check(response, "create index").await?;
        info!("Created index '{}'", self.spec.name);
        Ok(true)
    }

    async fn wait_until_ready(&self) -> Result<IndexDescription> {
        let deadline = tokio::time::Instant::now() + self.ready_timeout;
        loop {
            match self.describe_index().await? {
                Some(description) if description.status.ready => return Ok(description),
                Some(description) => {
                    debug!("Index '{}' not ready ({})", self.spec.name, description.status.state);
                }
                None => debug!("Index '{}' not visible yet", self.spec.name),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(VidqaError::VectorStore(format!(
                    "Index '{}' not ready after {:?}",
                    self.spec.name, self.ready_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Data-plane base URL, resolved on first use.
    async fn data_url(&self) -> Result<String> {
        if let Some(host) = self.host.read().await.as_ref() {
            return Ok(host.clone());
        }

        let description = self.describe_index().await?.ok_or_else(|| {
            VidqaError::VectorStore(format!("Index '{}' does not exist", self.spec.name))
        })?;
        Ok(self.cache_host(&description.host).await)
    }

    async fn cache_host(&self, host: &str) -> String {
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };
        *self.host.write().await = Some(url.clone());
        url
    }

    async fn check(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(VidqaError::VectorStore(format!(
            "Pinecone {} failed ({}): {}",
            operation, status, body
        )))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    #[instrument(skip(self), fields(index = %self.spec.name))]
    async fn ensure_index(&self) -> Result<IndexHandle> {
        let existing = self.list_indexes().await?;
        let created = if existing.iter().any(|name| name == &self.spec.name) {
            debug!("Index '{}' already exists", self.spec.name);
            false
        } else {
            self.create_index().await?
        };

        let description = self.wait_until_ready().await?;
        if description.dimension != self.spec.dimension {
            warn!(
                "Index '{}' has dimension {}, embeddings have {}",
                self.spec.name, description.dimension, self.spec.dimension
            );
        }
        let host = self.cache_host(&description.host).await;

        Ok(IndexHandle {
            spec: self.spec.clone(),
            host: Some(host),
            created,
        })
    }

    #[instrument(skip(self), fields(index = %self.spec.name))]
    async fn describe_stats(&self) -> Result<IndexStats> {
        let url = self.data_url().await?;
        let response = self
            .client
            .post(format!("{}/describe_index_stats", url))
            .json(&json!({}))
            .send()
            .await?;
        let stats: StatsResponse = Self::check(response, "describe index stats").await?.json().await?;

        Ok(IndexStats {
            dimension: stats.dimension,
            total_vector_count: stats.total_vector_count,
            namespaces: stats
                .namespaces
                .into_iter()
                .map(|(ns, summary)| (ns, summary.vector_count))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    #[instrument(skip(self), fields(index = %self.spec.name))]
    async fn delete_index(&self) -> Result<bool> {
        let response = self
            .client
            .delete(format!("{}/indexes/{}", self.controller_url, self.spec.name))
            .send()
            .await?;

        *self.host.write().await = None;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response, "delete index").await?;
        info!("Deleted index '{}'", self.spec.name);
        Ok(true)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let url = self.data_url().await?;
        let mut written = 0;

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let vectors: Vec<UpsertVector<'_>> = batch
                .iter()
                .map(|record| UpsertVector {
                    id: &record.id,
                    values: &record.values,
                    metadata: VectorMetadata {
                        text: &record.text,
                        video_id: &record.video_id,
                        chunk_order: record.chunk_order,
                    },
                })
                .collect();

            let response = self
                .client
                .post(format!("{}/vectors/upsert", url))
                .json(&UpsertRequest { vectors, namespace })
                .send()
                .await?;
            let result: UpsertResponse = Self::check(response, "upsert").await?.json().await?;
            written += result.upserted_count;
        }

        debug!("Upserted {} vectors into namespace {}", written, namespace);
        Ok(written)
    }

    #[instrument(skip(self, vector))]
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let url = self.data_url().await?;
        let response = self
            .client
            .post(format!("{}/query", url))
            .json(&json!({
                "namespace": namespace,
                "vector": vector,
                "topK": top_k,
                "includeMetadata": true,
                "includeValues": false
            }))
            .send()
            .await?;
        let result: QueryResponse = Self::check(response, "query").await?.json().await?;

        Ok(result
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                text: m
                    .metadata
                    .and_then(|mut meta| meta.remove("text"))
                    .and_then(|value| value.as_str().map(str::to_string))
                    .unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let url = self.data_url().await?;
        let response = self
            .client
            .post(format!("{}/vectors/delete", url))
            .json(&json!({ "deleteAll": true, "namespace": namespace }))
            .send()
            .await?;

        // Serverless indexes report unknown namespaces as 404.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, "delete namespace").await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexSummary>,
}

#[derive(Debug, Deserialize)]
struct IndexSummary {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: VectorMetadata<'a>,
}

#[derive(Serialize)]
struct VectorMetadata<'a> {
    text: &'a str,
    video_id: &'a str,
    chunk_order: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<MatchEntry>,
}

#[derive(Debug, Deserialize)]
struct MatchEntry {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn index_for(server: &MockServer) -> PineconeIndex {
        let settings = VectorStoreSettings {
            controller_url: server.uri(),
            ..VectorStoreSettings::default()
        };
        PineconeIndex::new("test-key", &settings, IndexSpec::new("youtube-transcriptions", 3, "cosine"))
            .unwrap()
            .with_ready_timeout(Duration::from_millis(200), Duration::from_millis(10))
    }

    async fn mount_describe(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/indexes/youtube-transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "youtube-transcriptions",
                "dimension": 3,
                "metric": "cosine",
                "host": server.uri(),
                "status": { "ready": true, "state": "Ready" }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ensure_index_creates_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .and(header("Api-Key", "test-key"))
            .and(header("X-Pinecone-API-Version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_partial_json(json!({
                "name": "youtube-transcriptions",
                "dimension": 3,
                "metric": "cosine",
                "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        mount_describe(&server).await;

        let handle = index_for(&server).await.ensure_index().await.unwrap();
        assert!(handle.created);
        assert_eq!(handle.host.as_deref(), Some(server.uri().as_str()));
    }

    #[tokio::test]
    async fn test_ensure_index_treats_conflict_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "code": "ALREADY_EXISTS", "message": "Resource already exists" }
            })))
            .mount(&server)
            .await;
        mount_describe(&server).await;

        let handle = index_for(&server).await.ensure_index().await.unwrap();
        assert!(!handle.created);
    }

    #[tokio::test]
    async fn test_ensure_index_reuses_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "indexes": [{ "name": "youtube-transcriptions" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        mount_describe(&server).await;

        assert!(!index_for(&server).await.ensure_index().await.unwrap().created);
    }

    #[tokio::test]
    async fn test_stats_upsert_and_query() {
        let server = MockServer::start().await;
        mount_describe(&server).await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": { "abc": { "vectorCount": 7 } },
                "dimension": 3,
                "indexFullness": 0.0,
                "totalVectorCount": 7
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_partial_json(json!({
                "namespace": "abc",
                "vectors": [{ "id": "vid#0", "metadata": { "text": "hello" } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({ "namespace": "abc", "topK": 4, "includeMetadata": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    { "id": "vid#0", "score": 0.91, "metadata": { "text": "hello" } },
                    { "id": "vid#1", "score": 0.42 }
                ],
                "namespace": "abc"
            })))
            .mount(&server)
            .await;

        let index = index_for(&server).await;

        let stats = index.describe_stats().await.unwrap();
        assert_eq!(stats.vector_count("abc"), 7);
        assert_eq!(stats.total_vector_count, 7);

        let written = index
            .upsert("abc", &[VectorRecord::new("vid", 0, "hello".to_string(), vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let matches = index.query("abc", &[1.0, 0.0, 0.0], 4).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "hello");
        assert_eq!(matches[1].text, "");
    }

    #[tokio::test]
    async fn test_delete_index_reports_existence() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/youtube-transcriptions"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/youtube-transcriptions"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = index_for(&server).await;
        assert!(index.delete_index().await.unwrap());
        assert!(!index.delete_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_data_plane_errors_surface() {
        let server = MockServer::start().await;
        mount_describe(&server).await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = index_for(&server).await.describe_stats().await.unwrap_err();
        assert!(matches!(err, VidqaError::VectorStore(msg) if msg.contains("401")));
    }

    #[test]
    fn test_rejects_empty_key() {
        let spec = IndexSpec::new("x", 3, "cosine");
        assert!(PineconeIndex::new("  ", &VectorStoreSettings::default(), spec).is_err());
    }
}
