//! Vector index abstraction for vidqa.
//!
//! One named index holds every video; each video's chunks live in their own
//! namespace inside it. Backends implement [`VectorIndex`].

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteVectorIndex;

use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of the shared index: name, dimensionality and similarity metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, dimension: usize, metric: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: metric.into(),
        }
    }

    /// Spec derived from the vector store and embedding settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.vector_store.index_name.clone(),
            settings.embedding.dimensions as usize,
            settings.vector_store.metric.clone(),
        )
    }
}

/// Result of [`VectorIndex::ensure_index`].
#[derive(Debug, Clone, Serialize)]
pub struct IndexHandle {
    pub spec: IndexSpec,
    /// Data-plane host, for remote backends.
    pub host: Option<String>,
    /// Whether this call created the index.
    pub created: bool,
}

/// Per-namespace vector counts for the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub dimension: usize,
    pub total_vector_count: u64,
    pub namespaces: BTreeMap<String, u64>,
}

impl IndexStats {
    /// Vectors stored under `namespace` (zero when absent).
    pub fn vector_count(&self, namespace: &str) -> u64 {
        self.namespaces.get(namespace).copied().unwrap_or(0)
    }

    /// A namespace counts as populated once it holds any vectors.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.vector_count(namespace) > 0
    }
}

/// A chunk embedding to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Stable ID, `<video_id>#<chunk order>`.
    pub id: String,
    pub values: Vec<f32>,
    /// Chunk text, returned with query matches.
    pub text: String,
    pub video_id: String,
    pub chunk_order: usize,
}

impl VectorRecord {
    pub fn new(video_id: &str, chunk_order: usize, text: String, values: Vec<f32>) -> Self {
        Self {
            id: Self::record_id(video_id, chunk_order),
            values,
            text,
            video_id: video_id.to_string(),
            chunk_order,
        }
    }

    pub fn record_id(video_id: &str, chunk_order: usize) -> String {
        format!("{}#{}", video_id, chunk_order)
    }
}

/// A similarity search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    /// Similarity score (higher is better).
    pub score: f32,
    pub text: String,
}

/// Trait for vector index backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The index this backend manages.
    fn spec(&self) -> &IndexSpec;

    /// Create the index if absent. An index that already exists (including one
    /// created concurrently by another caller) is success.
    async fn ensure_index(&self) -> Result<IndexHandle>;

    /// Namespace vector counts.
    async fn describe_stats(&self) -> Result<IndexStats>;

    /// Delete the whole index. Returns whether it existed.
    async fn delete_index(&self) -> Result<bool>;

    /// Insert or overwrite records in `namespace`. Returns the number written.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Up to `top_k` records of `namespace` closest to `vector`, best first.
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;

    /// Remove every record in `namespace`.
    async fn delete_namespace(&self, namespace: &str) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score under `metric` (`cosine`, `dotproduct`, `euclidean`); higher is closer.
pub(crate) fn similarity(metric: &str, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        "dotproduct" => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        "euclidean" => {
            let distance: f32 = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt();
            1.0 / (1.0 + distance)
        }
        _ => cosine_similarity(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_record_ids_are_deterministic() {
        let record = VectorRecord::new("dQw4w9WgXcQ", 3, "text".to_string(), vec![0.0]);
        assert_eq!(record.id, "dQw4w9WgXcQ#3");
        assert_eq!(record.id, VectorRecord::record_id("dQw4w9WgXcQ", 3));
    }

    #[test]
    fn test_stats_namespace_presence() {
        let mut stats = IndexStats::default();
        stats.namespaces.insert("abc".to_string(), 12);
        stats.namespaces.insert("empty".to_string(), 0);

        assert!(stats.has_namespace("abc"));
        assert!(!stats.has_namespace("empty"));
        assert!(!stats.has_namespace("missing"));
        assert_eq!(stats.vector_count("abc"), 12);
    }

    #[test]
    fn test_spec_from_settings() {
        let spec = IndexSpec::from_settings(&Settings::default());
        assert_eq!(spec, IndexSpec::new("youtube-transcriptions", 768, "cosine"));
    }
}
