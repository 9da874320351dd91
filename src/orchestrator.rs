//! Request orchestrator for vidqa.
//!
//! Owns the pipeline components and the conversation memory, and answers
//! questions end to end. [`Orchestrator::answer_question`] never fails: every
//! stage failure is logged and mapped to an [`Apology`].

use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::config::{Prompts, Settings, TranscriptSource, VectorStoreProvider};
use crate::embedding::{Embedder, GeminiEmbedder};
use crate::error::{Result, VidqaError};
use crate::generation::{GeminiGenerator, TextGenerator};
use crate::memory::{ChatMessage, ConversationMemory};
use crate::rag::{AnswerComposer, ContextSource, RetrievalEngine};
use crate::transcript::{
    CaptionService, LocalCaptions, TranscriptError, TranscriptProvider, YoutubeCaptions,
};
use crate::vector_store::{
    IndexHandle, IndexSpec, IndexStats, MemoryVectorIndex, PineconeIndex, SqliteVectorIndex,
    VectorIndex,
};
use crate::video::VideoId;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// API keys needed to answer questions.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    /// Whether the configured index backend needs `pinecone_api_key`.
    pub pinecone_required: bool,
}

impl Credentials {
    /// Literal keys from settings first, then the named environment variables.
    pub fn resolve(settings: &Settings) -> Self {
        Self {
            google_api_key: Self::lookup(&settings.google.api_key, &settings.google.api_key_env),
            pinecone_api_key: Self::lookup(
                &settings.vector_store.api_key,
                &settings.vector_store.api_key_env,
            ),
            pinecone_required: settings.vector_store.provider == VectorStoreProvider::Pinecone,
        }
    }

    fn lookup(literal: &Option<String>, env_var: &str) -> Option<String> {
        literal
            .clone()
            .or_else(|| std::env::var(env_var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Names of required credentials that are not configured.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.google_api_key.is_none() {
            missing.push("google");
        }
        if self.pinecone_required && self.pinecone_api_key.is_none() {
            missing.push("pinecone");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Fixed user-facing replies for failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apology {
    MissingCredentials,
    InvalidUrl,
    ContentUnavailable,
    ContentAccess,
    NoContent,
    Processing,
    Analyzing,
    Generating,
    Unexpected,
}

impl Apology {
    pub fn message(&self) -> &'static str {
        match self {
            Apology::MissingCredentials => {
                "I'm currently unable to process video analysis. Please contact the system administrator."
            }
            Apology::InvalidUrl => {
                "I couldn't recognize that as a valid YouTube URL. Please provide a complete YouTube video link."
            }
            Apology::ContentUnavailable => {
                "I'm unable to access the content from this video. This might be due to the video being private, unavailable, or not having captions enabled."
            }
            Apology::ContentAccess => {
                "I'm having trouble accessing this video's content. Please make sure the video is public and has captions available."
            }
            Apology::NoContent => "I couldn't find any content to work with in this video's transcript.",
            Apology::Processing => {
                "I'm having trouble processing this video. Please try again or contact support if the issue persists."
            }
            Apology::Analyzing => {
                "I'm having trouble analyzing this video. Please try again or contact support if the issue persists."
            }
            Apology::Generating => {
                "I'm having trouble generating a response for this question. Please try rephrasing your question or try again later."
            }
            Apology::Unexpected => {
                "I encountered an unexpected issue while processing your request. Please try again or contact support if the problem persists."
            }
        }
    }

    /// Reply for a failed transcript fetch.
    pub fn for_transcript(error: &TranscriptError) -> Self {
        match error {
            TranscriptError::InvalidId => Apology::InvalidUrl,
            TranscriptError::Disabled
            | TranscriptError::NotFound
            | TranscriptError::Unavailable(_)
            | TranscriptError::Empty => Apology::ContentUnavailable,
            TranscriptError::Other(_) => Apology::ContentAccess,
        }
    }
}

impl std::fmt::Display for Apology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// External collaborators used by the pipeline.
pub struct Components {
    pub captions: Arc<dyn CaptionService>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub generator: Arc<dyn TextGenerator>,
}

struct Pipeline {
    transcripts: TranscriptProvider,
    retrieval: RetrievalEngine,
    composer: AnswerComposer,
}

/// The main orchestrator for vidqa.
pub struct Orchestrator {
    settings: Settings,
    credentials: Credentials,
    index: Option<Arc<dyn VectorIndex>>,
    pipeline: Option<Pipeline>,
    memory: ConversationMemory,
}

impl Orchestrator {
    /// Build the pipeline from settings. With credentials missing, the
    /// orchestrator still serves memory operations (and index operations when
    /// the index is reachable) but every question gets
    /// [`Apology::MissingCredentials`].
    pub fn new(settings: Settings) -> Result<Self> {
        let credentials = Credentials::resolve(&settings);
        let index = Self::build_index(&settings, &credentials)?;

        match (index, credentials.is_complete()) {
            (Some(index), true) => {
                let components = Self::build_components(&settings, &credentials, index)?;
                Self::with_components(settings, credentials, components)
            }
            (index, _) => {
                warn!("Missing credentials: {}", credentials.missing().join(", "));
                Ok(Self {
                    settings,
                    credentials,
                    index,
                    pipeline: None,
                    memory: ConversationMemory::new(),
                })
            }
        }
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        credentials: Credentials,
        components: Components,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let splitter = TextSplitter::new(ChunkingConfig::from(&settings.chunking))?;

        let pipeline = Pipeline {
            transcripts: TranscriptProvider::new(components.captions),
            retrieval: RetrievalEngine::new(
                components.index.clone(),
                components.embedder,
                splitter,
                &settings.retrieval,
            ),
            composer: AnswerComposer::new(components.generator).with_prompts(prompts),
        };

        Ok(Self {
            settings,
            credentials,
            index: Some(components.index),
            pipeline: Some(pipeline),
            memory: ConversationMemory::new(),
        })
    }

    /// The configured index backend, or `None` when its credential is missing.
    fn build_index(
        settings: &Settings,
        credentials: &Credentials,
    ) -> Result<Option<Arc<dyn VectorIndex>>> {
        let spec = IndexSpec::from_settings(settings);
        let index: Arc<dyn VectorIndex> = match settings.vector_store.provider {
            VectorStoreProvider::Pinecone => match credentials.pinecone_api_key.as_deref() {
                Some(key) => Arc::new(PineconeIndex::new(key, &settings.vector_store, spec)?),
                None => return Ok(None),
            },
            VectorStoreProvider::Sqlite => {
                Arc::new(SqliteVectorIndex::new(&settings.sqlite_path(), spec)?)
            }
            VectorStoreProvider::Memory => Arc::new(MemoryVectorIndex::new(spec)),
        };
        Ok(Some(index))
    }

    fn build_components(
        settings: &Settings,
        credentials: &Credentials,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Components> {
        let google_key = credentials
            .google_api_key
            .as_deref()
            .ok_or_else(|| VidqaError::Config("Google API key is not configured".to_string()))?;

        let captions: Arc<dyn CaptionService> = match settings.transcript.provider {
            TranscriptSource::Youtube => Arc::new(YoutubeCaptions::new(
                settings.transcript.languages.clone(),
                Duration::from_secs(settings.transcript.timeout_secs),
            )?),
            TranscriptSource::Local => Arc::new(LocalCaptions::new(settings.transcript_dir())),
        };

        info!(
            "Using {} transcripts, {} index '{}'",
            settings.transcript.provider,
            settings.vector_store.provider,
            settings.vector_store.index_name
        );

        Ok(Components {
            captions,
            embedder: Arc::new(GeminiEmbedder::new(google_key, &settings.google, &settings.embedding)?),
            index,
            generator: Arc::new(GeminiGenerator::new(
                google_key,
                &settings.google,
                &settings.generation,
            )?),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn index(&self) -> Result<&Arc<dyn VectorIndex>> {
        self.index.as_ref().ok_or_else(|| {
            VidqaError::Config(format!(
                "vector store unavailable, missing credentials: {}",
                self.credentials.missing().join(", ")
            ))
        })
    }

    /// Answer a question about the video at `video_url`.
    ///
    /// Always returns text: the model's answer, or a fixed apology.
    pub async fn answer_question(&self, video_url: &str, question: &str) -> String {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "answer_question",
            %request_id,
            video_id = field::Empty,
            state = field::Empty
        );

        let outcome = AssertUnwindSafe(self.answer_inner(video_url, question))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let _guard = span.enter();
        match outcome {
            Ok(Ok(answer)) => answer,
            Ok(Err(apology)) => {
                info!("Answered with apology: {:?}", apology);
                apology.to_string()
            }
            Err(_) => {
                error!("Request panicked");
                Apology::Unexpected.to_string()
            }
        }
    }

    async fn answer_inner(&self, video_url: &str, question: &str) -> std::result::Result<String, Apology> {
        let pipeline = match (&self.pipeline, self.credentials.is_complete()) {
            (Some(pipeline), true) => pipeline,
            _ => {
                warn!("Missing credentials: {}", self.credentials.missing().join(", "));
                return Err(Apology::MissingCredentials);
            }
        };

        let video_id = VideoId::parse(video_url).ok_or_else(|| {
            info!("Could not extract a video ID from {:?}", video_url);
            Apology::InvalidUrl
        })?;
        Span::current().record("video_id", field::display(&video_id));

        let transcript = pipeline
            .transcripts
            .fetch(video_id.as_str())
            .await
            .map_err(|e| Apology::for_transcript(&e))?;

        let state = pipeline.retrieval.prepare(&transcript).await.map_err(|e| {
            error!("Preparing index failed: {}", e);
            match e {
                VidqaError::NoContent(_) => Apology::NoContent,
                _ => Apology::Processing,
            }
        })?;
        Span::current().record("state", field::display(state));

        let context = pipeline
            .retrieval
            .retrieve(&transcript, question, state)
            .await
            .map_err(|e| {
                error!("Retrieval failed: {}", e);
                Apology::Analyzing
            })?;
        match context.source {
            ContextSource::Search { passages } => info!("Answering from {} passages", passages),
            ContextSource::Fallback(strategy) => info!("Answering from fallback '{}'", strategy),
        }

        let history = self
            .memory
            .recent_window(&video_id, self.settings.memory.history_window);
        let prompt = pipeline.composer.compose(&context.text, &history, question);

        let answer = pipeline.composer.generate(&prompt).await.map_err(|e| {
            error!("Generation failed: {}", e);
            Apology::Generating
        })?;

        self.memory.append_exchange(&video_id, question, &answer);
        Ok(answer)
    }

    /// Clear one video's memory, or all memory (per-video and global) when `None`.
    pub fn clear_memory(&self, video_id: Option<&VideoId>) {
        match video_id {
            Some(id) => self.memory.clear(Some(id)),
            None => {
                self.memory.clear(None);
                self.memory.clear_global();
            }
        }
    }

    /// One video's conversation, or the global log when `None`.
    pub fn history(&self, video_id: Option<&VideoId>) -> Vec<ChatMessage> {
        match video_id {
            Some(id) => self.memory.history(id),
            None => self.memory.global_history(),
        }
    }

    /// Message count per video.
    pub fn all_memories(&self) -> BTreeMap<VideoId, usize> {
        self.memory.all_memories()
    }

    /// Create the shared index if absent.
    pub async fn ensure_index(&self) -> Result<IndexHandle> {
        self.index()?.ensure_index().await
    }

    /// Per-namespace vector counts.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.index()?.describe_stats().await
    }

    /// Delete the shared index. Returns whether it existed.
    pub async fn delete_index(&self) -> Result<bool> {
        let existed = self.index()?.delete_index().await?;
        if let Some(pipeline) = &self.pipeline {
            pipeline.retrieval.mark_index_stale();
        }
        Ok(existed)
    }

    /// Drop a video's vectors so the next question repopulates them.
    pub async fn reindex(&self, video_id: &VideoId) -> Result<()> {
        let namespace = video_id.namespace();
        self.index()?.delete_namespace(&namespace).await?;
        info!("Cleared namespace {} for {}", namespace, video_id);
        Ok(())
    }
}
