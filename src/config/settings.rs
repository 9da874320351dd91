//! Configuration settings for vidqa.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub google: GoogleSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub transcript: TranscriptSettings,
    pub retrieval: RetrievalSettings,
    pub memory: MemorySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.vidqa".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Google AI (Gemini) access, used for both embeddings and generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// OpenAI-compatible endpoint.
    pub api_base: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions; also the index dimension.
    pub dimensions: u32,
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-004".to_string(),
            dimensions: 768,
            batch_size: 100,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// LLM model for answers.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.1,
        }
    }
}

/// Transcript chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
        }
    }
}

/// Vector index backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Pinecone serverless index (default).
    #[default]
    Pinecone,
    /// Local SQLite file.
    Sqlite,
    /// Process memory; lost on exit.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Backend (pinecone, sqlite, memory).
    pub provider: VectorStoreProvider,
    /// Name of the shared index.
    pub index_name: String,
    /// Similarity metric.
    pub metric: String,
    /// Serverless cloud (pinecone).
    pub cloud: String,
    /// Serverless region (pinecone).
    pub region: String,
    /// Pinecone API key. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the Pinecone API key.
    pub api_key_env: String,
    /// Pinecone control-plane URL.
    pub controller_url: String,
    /// Path to SQLite database (sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Pinecone,
            index_name: "youtube-transcriptions".to_string(),
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            api_key: None,
            api_key_env: "PINECONE_API_KEY".to_string(),
            controller_url: "https://api.pinecone.io".to_string(),
            sqlite_path: "~/.vidqa/vectors.db".to_string(),
        }
    }
}

/// Where transcripts come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    /// YouTube caption tracks (default).
    #[default]
    Youtube,
    /// JSON files in `local_dir`.
    Local,
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Youtube => write!(f, "youtube"),
            TranscriptSource::Local => write!(f, "local"),
        }
    }
}

/// Transcript settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    pub provider: TranscriptSource,
    /// Caption languages in order of preference.
    pub languages: Vec<String>,
    /// Directory of `<video_id>.json` caption files (local provider).
    pub local_dir: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptSource::Youtube,
            languages: vec!["en".to_string()],
            local_dir: "~/.vidqa/transcripts".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Retrieval and fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Results for the primary search.
    pub top_k: usize,
    /// Minimum similarity for the primary search.
    pub min_score: f32,
    /// Query used by the overview fallback.
    pub overview_query: String,
    /// Results for the overview fallback.
    pub overview_top_k: usize,
    /// Results for the any-documents fallback.
    pub any_top_k: usize,
    /// Characters of raw transcript used when retrieval yields nothing.
    pub excerpt_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: 0.3,
            overview_query: "video content overview".to_string(),
            overview_top_k: 3,
            any_top_k: 5,
            excerpt_chars: 1500,
        }
    }
}

/// Conversation memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Most recent messages surfaced into the prompt.
    pub history_window: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self { history_window: 6 }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VidqaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded local transcript directory.
    pub fn transcript_dir(&self) -> PathBuf {
        Self::expand_path(&self.transcript.local_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 768);
        assert_eq!(settings.vector_store.metric, "cosine");
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.chunking.chunk_overlap, 150);
        assert_eq!(settings.memory.history_window, 6);
        assert_eq!(settings.retrieval.excerpt_chars, 1500);
        assert!((settings.generation.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [vector_store]
            provider = "sqlite"

            [chunking]
            chunk_size = 200
            chunk_overlap = 50
            "#,
        )
        .unwrap();

        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Sqlite);
        assert_eq!(settings.vector_store.index_name, "youtube-transcriptions");
        assert_eq!(settings.chunking.chunk_size, 200);
        assert_eq!(settings.retrieval.top_k, 4);
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.transcript.provider = TranscriptSource::Local;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.transcript.provider, TranscriptSource::Local);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Pinecone".parse::<VectorStoreProvider>(), Ok(VectorStoreProvider::Pinecone));
        assert!("chroma".parse::<VectorStoreProvider>().is_err());
    }
}
