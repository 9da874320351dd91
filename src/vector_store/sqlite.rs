//! SQLite-based vector index implementation.
//!
//! Uses SQLite with similarity computed in Rust. Suitable for offline use
//! with a modest number of videos.

use super::{similarity, IndexHandle, IndexSpec, IndexStats, QueryMatch, VectorIndex, VectorRecord};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS indexes (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vectors (
        index_name TEXT NOT NULL,
        namespace TEXT NOT NULL,
        id TEXT NOT NULL,
        video_id TEXT NOT NULL,
        chunk_order INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL,
        PRIMARY KEY (index_name, namespace, id)
    );

    CREATE INDEX IF NOT EXISTS idx_vectors_namespace ON vectors(index_name, namespace);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    spec: IndexSpec,
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path, spec: IndexSpec) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            spec,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite index (useful for testing).
    pub fn in_memory(spec: IndexSpec) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            spec,
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidqaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn require_index(&self, conn: &Connection) -> Result<()> {
        let exists: Option<String> = conn
            .query_row(
                "SELECT name FROM indexes WHERE name = ?1",
                params![self.spec.name],
                |row| row.get(0),
            )
            .optional()?;

        match exists {
            Some(_) => Ok(()),
            None => Err(VidqaError::VectorStore(format!(
                "Index '{}' does not exist",
                self.spec.name
            ))),
        }
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

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    #[instrument(skip(self), fields(index = %self.spec.name))]
    async fn ensure_index(&self) -> Result<IndexHandle> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO indexes (name, dimension, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                self.spec.name,
                self.spec.dimension as i64,
                self.spec.metric,
                Utc::now().to_rfc3339()
            ],
        )?;

        let (dimension, metric): (i64, String) = conn.query_row(
            "SELECT dimension, metric FROM indexes WHERE name = ?1",
            params![self.spec.name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if dimension as usize != self.spec.dimension || metric != self.spec.metric {
            return Err(VidqaError::VectorStore(format!(
                "Index '{}' exists with dimension {} / metric {}, expected {} / {}",
                self.spec.name, dimension, metric, self.spec.dimension, self.spec.metric
            )));
        }

        if inserted > 0 {
            info!("Created index '{}'", self.spec.name);
        }

        Ok(IndexHandle {
            spec: self.spec.clone(),
            host: None,
            created: inserted > 0,
        })
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let conn = self.lock()?;
        self.require_index(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT namespace, COUNT(*) FROM vectors WHERE index_name = ?1 GROUP BY namespace",
        )?;
        let namespaces = stmt
            .query_map(params![self.spec.name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        Ok(IndexStats {
            dimension: self.spec.dimension,
            total_vector_count: namespaces.values().sum(),
            namespaces,
        })
    }

    #[instrument(skip(self), fields(index = %self.spec.name))]
    async fn delete_index(&self) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM vectors WHERE index_name = ?1", params![self.spec.name])?;
        let deleted = tx.execute("DELETE FROM indexes WHERE name = ?1", params![self.spec.name])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        for record in records {
            self.check_dimension(&record.values)?;
        }

        let mut conn = self.lock()?;
        self.require_index(&conn)?;

        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO vectors
                    (index_name, namespace, id, video_id, chunk_order, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for record in records {
                stmt.execute(params![
                    self.spec.name,
                    namespace,
                    record.id,
                    record.video_id,
                    record.chunk_order as i64,
                    record.text,
                    Self::embedding_to_bytes(&record.values),
                    now,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Upserted {} vectors into namespace {}", records.len(), namespace);
        Ok(records.len())
    }

    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        self.check_dimension(vector)?;

        let conn = self.lock()?;
        self.require_index(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT id, content, embedding FROM vectors WHERE index_name = ?1 AND namespace = ?2",
        )?;
        let rows = stmt.query_map(params![self.spec.name, namespace], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, text, bytes) = row?;
            let embedding = Self::bytes_to_embedding(&bytes);
            results.push(QueryMatch {
                id,
                score: similarity(&self.spec.metric, vector, &embedding),
                text,
            });
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let conn = self.lock()?;
        self.require_index(&conn)?;
        let removed = conn.execute(
            "DELETE FROM vectors WHERE index_name = ?1 AND namespace = ?2",
            params![self.spec.name, namespace],
        )?;
        debug!("Removed {} vectors from namespace {}", removed, namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> IndexSpec {
        IndexSpec::new("test-index", 3, "cosine")
    }

    #[tokio::test]
    async fn test_sqlite_vector_index() {
        let index = SqliteVectorIndex::in_memory(spec()).unwrap();
        assert!(index.describe_stats().await.is_err());
        assert!(index.ensure_index().await.unwrap().created);
        assert!(!index.ensure_index().await.unwrap().created);

        let records = vec![
            VectorRecord::new("vid", 0, "Hello world".to_string(), vec![1.0, 0.0, 0.0]),
            VectorRecord::new("vid", 1, "Goodbye world".to_string(), vec![0.0, 1.0, 0.0]),
        ];
        index.upsert("ns", &records).await.unwrap();
        index.upsert("ns", &records).await.unwrap();

        let stats = index.describe_stats().await.unwrap();
        assert_eq!(stats.vector_count("ns"), 2);
        assert_eq!(stats.total_vector_count, 2);

        let results = index.query("ns", &[0.0, 1.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Goodbye world");
        assert_eq!(results[0].id, "vid#1");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        {
            let index = SqliteVectorIndex::new(&path, spec()).unwrap();
            index.ensure_index().await.unwrap();
            index
                .upsert("ns", &[VectorRecord::new("vid", 0, "kept".to_string(), vec![1.0, 0.0, 0.0])])
                .await
                .unwrap();
        }

        let index = SqliteVectorIndex::new(&path, spec()).unwrap();
        assert!(!index.ensure_index().await.unwrap().created);
        assert!(index.describe_stats().await.unwrap().has_namespace("ns"));
    }

    #[tokio::test]
    async fn test_mismatched_spec_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        SqliteVectorIndex::new(&path, spec()).unwrap().ensure_index().await.unwrap();
        let other = SqliteVectorIndex::new(&path, IndexSpec::new("test-index", 768, "cosine")).unwrap();
        assert!(other.ensure_index().await.is_err());
    }

    #[tokio::test]
    async fn test_delete_namespace_and_index() {
        let index = SqliteVectorIndex::in_memory(spec()).unwrap();
        index.ensure_index().await.unwrap();
        index
            .upsert("ns", &[VectorRecord::new("vid", 0, "x".to_string(), vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        index.delete_namespace("ns").await.unwrap();
        assert!(!index.describe_stats().await.unwrap().has_namespace("ns"));

        assert!(index.delete_index().await.unwrap());
        assert!(!index.delete_index().await.unwrap());
    }
}
