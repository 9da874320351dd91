//! In-memory vector index implementation.
//!
//! Useful for testing and throwaway sessions; contents are lost on exit.

use super::{similarity, IndexHandle, IndexSpec, IndexStats, QueryMatch, VectorIndex, VectorRecord};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

type Namespaces = HashMap<String, BTreeMap<String, VectorRecord>>;

/// In-memory vector index. `None` means the index has not been created.
pub struct MemoryVectorIndex {
    spec: IndexSpec,
    namespaces: RwLock<Option<Namespaces>>,
}

impl MemoryVectorIndex {
    /// Create a handle for an index that does not exist yet.
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            namespaces: RwLock::new(None),
        }
    }

    fn missing(&self) -> VidqaError {
        VidqaError::VectorStore(format!("Index '{}' does not exist", self.spec.name))
    }

    fn check_dimension(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.spec.dimension {
            return Err(VidqaError::VectorStore(format!(
                "Vector has {} dimensions, index '{}' expects {}",
                values.len(),
                self.spec.name,
                self.spec.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    async fn ensure_index(&self) -> Result<IndexHandle> {
        let mut state = self.namespaces.write().unwrap();
        let created = state.is_none();
        if created {
            *state = Some(HashMap::new());
        }
        Ok(IndexHandle {
            spec: self.spec.clone(),
            host: None,
            created,
        })
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let state = self.namespaces.read().unwrap();
        let namespaces = state.as_ref().ok_or_else(|| self.missing())?;

        let counts: BTreeMap<String, u64> = namespaces
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(ns, records)| (ns.clone(), records.len() as u64))
            .collect();

        Ok(IndexStats {
            dimension: self.spec.dimension,
            total_vector_count: counts.values().sum(),
            namespaces: counts,
        })
    }

    async fn delete_index(&self) -> Result<bool> {
        let mut state = self.namespaces.write().unwrap();
        Ok(state.take().is_some())
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        for record in records {
            self.check_dimension(&record.values)?;
        }

        let mut state = self.namespaces.write().unwrap();
        let namespaces = state.as_mut().ok_or_else(|| self.missing())?;
        let store = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        self.check_dimension(vector)?;

        let state = self.namespaces.read().unwrap();
        let namespaces = state.as_ref().ok_or_else(|| self.missing())?;

        let mut results: Vec<QueryMatch> = namespaces
            .get(namespace)
            .map(|records| {
                records
                    .values()
                    .map(|record| QueryMatch {
                        id: record.id.clone(),
                        score: similarity(&self.spec.metric, vector, &record.values),
                        text: record.text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let mut state = self.namespaces.write().unwrap();
        let namespaces = state.as_mut().ok_or_else(|| self.missing())?;
        namespaces.remove(namespace);
        Ok(())
    }
}
