//! Per-video namespace population and similarity retrieval.

use super::fallback::{join_passages, FallbackLadder, FallbackStrategy, PassageSearch};
use crate::chunking::TextSplitter;
use crate::config::RetrievalSettings;
use crate::embedding::Embedder;
use crate::error::{Result, VidqaError};
use crate::transcript::Transcript;
use crate::vector_store::{IndexHandle, VectorIndex, VectorRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How the namespace was prepared for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Namespace already held vectors.
    Reuse,
    /// Namespace was populated by this request.
    Populate,
    /// Population failed; retrieval is disabled for this request.
    NoIndex,
}

impl std::fmt::Display for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexState::Reuse => write!(f, "reuse"),
            IndexState::Populate => write!(f, "populate"),
            IndexState::NoIndex => write!(f, "no_index"),
        }
    }
}

/// Where the returned context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// The primary similarity search, with the number of passages.
    Search { passages: usize },
    /// A fallback rung.
    Fallback(FallbackStrategy),
}

/// Non-empty context for answer composition.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub text: String,
    pub source: ContextSource,
}

/// Similarity search scoped to one namespace.
pub struct NamespaceSearch {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
}

impl NamespaceSearch {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, namespace: String) -> Self {
        Self {
            embedder,
            index,
            namespace,
        }
    }
}

#[async_trait]
impl PassageSearch for NamespaceSearch {
    async fn search(&self, query: &str, top_k: usize, min_score: Option<f32>) -> Result<Vec<String>> {
        let query_embedding = self.embedder.embed(query).await?;
        let matches = self
            .index
            .query(&self.namespace, &query_embedding, top_k)
            .await?;

        Ok(matches
            .into_iter()
            .filter(|m| min_score.map_or(true, |min| m.score >= min))
            .map(|m| m.text)
            .filter(|text| !text.trim().is_empty())
            .collect())
    }
}

/// Populates namespaces on first use and retrieves context for questions.
pub struct RetrievalEngine {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    ladder: FallbackLadder,
    top_k: usize,
    min_score: f32,
    index_ready: AtomicBool,
}

impl RetrievalEngine {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        splitter: TextSplitter,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            index,
            embedder,
            splitter,
            ladder: FallbackLadder::from_settings(settings),
            top_k: settings.top_k,
            min_score: settings.min_score,
            index_ready: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Create the shared index if needed. Later calls skip the round trip
    /// until [`RetrievalEngine::mark_index_stale`].
    pub async fn ensure_index(&self) -> Result<Option<IndexHandle>> {
        if self.index_ready.load(Ordering::Acquire) {
            return Ok(None);
        }
        let handle = self.index.ensure_index().await?;
        self.index_ready.store(true, Ordering::Release);
        Ok(Some(handle))
    }

    /// Forget that the index exists, e.g. after it was deleted.
    pub fn mark_index_stale(&self) {
        self.index_ready.store(false, Ordering::Release);
    }

    /// Make sure the video's namespace holds vectors.
    ///
    /// Index or stats failures are returned as errors, as is a transcript that
    /// produces no chunks. Embedding or insertion failures degrade to
    /// [`IndexState::NoIndex`].
    #[instrument(skip(self, transcript), fields(video_id = %transcript.video_id))]
    pub async fn prepare(&self, transcript: &Transcript) -> Result<IndexState> {
        let cached = self.ensure_index().await?.is_none();

        let namespace = transcript.video_id.namespace();
        let stats = match self.index.describe_stats().await {
            Ok(stats) => stats,
            // The index may have been deleted since it was last ensured
            Err(e) if cached => {
                warn!("Stats failed on a previously ensured index, re-ensuring: {}", e);
                self.mark_index_stale();
                self.ensure_index().await?;
                self.index.describe_stats().await?
            }
            Err(e) => return Err(e),
        };
        if stats.has_namespace(&namespace) {
            info!(
                "Reusing namespace {} ({} vectors)",
                namespace,
                stats.vector_count(&namespace)
            );
            return Ok(IndexState::Reuse);
        }

        let chunks = self.splitter.split(&transcript.text);
        if chunks.is_empty() {
            return Err(VidqaError::NoContent(format!(
                "transcript for {} produced no chunks",
                transcript.video_id
            )));
        }

        info!("Populating namespace {} with {} chunks", namespace, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = match self.embedder.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Embedding chunks failed, continuing without index: {}", e);
                return Ok(IndexState::NoIndex);
            }
        };

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, values)| {
                VectorRecord::new(transcript.video_id.as_str(), chunk.order, chunk.content, values)
            })
            .collect();

        match self.index.upsert(&namespace, &records).await {
            Ok(written) => {
                debug!("Inserted {} vectors", written);
                Ok(IndexState::Populate)
            }
            Err(e) => {
                warn!("Inserting vectors failed, continuing without index: {}", e);
                Ok(IndexState::NoIndex)
            }
        }
    }

    /// Context for `question`. Never empty; a failing primary search is an error.
    #[instrument(skip(self, transcript, question, state), fields(video_id = %transcript.video_id, state = %state))]
    pub async fn retrieve(
        &self,
        transcript: &Transcript,
        question: &str,
        state: IndexState,
    ) -> Result<RetrievedContext> {
        if state == IndexState::NoIndex {
            let fallback = self.ladder.resolve(None, transcript).await;
            return Ok(RetrievedContext {
                text: fallback.text,
                source: ContextSource::Fallback(fallback.strategy),
            });
        }

        let search = NamespaceSearch::new(
            self.embedder.clone(),
            self.index.clone(),
            transcript.video_id.namespace(),
        );

        let passages = search
            .search(question, self.top_k, Some(self.min_score))
            .await?;
        let text = join_passages(&passages);

        if !text.trim().is_empty() {
            debug!("Primary search returned {} passages", passages.len());
            return Ok(RetrievedContext {
                text,
                source: ContextSource::Search {
                    passages: passages.len(),
                },
            });
        }

        info!("Primary search found nothing relevant, trying fallbacks");
        let fallback = self.ladder.resolve(Some(&search), transcript).await;
        Ok(RetrievedContext {
            text: fallback.text,
            source: ContextSource::Fallback(fallback.strategy),
        })
    }
}
