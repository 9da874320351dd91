//! Gemini embeddings through the OpenAI-compatible endpoint.

use super::Embedder;
use crate::config::{EmbeddingSettings, GoogleSettings};
use crate::error::{Result, VidqaError};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Gemini-based embedder.
pub struct GeminiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
    batch_size: usize,
    request_dimensions: bool,
}

impl GeminiEmbedder {
    /// Create an embedder from settings.
    pub fn new(api_key: &str, google: &GoogleSettings, embedding: &EmbeddingSettings) -> Result<Self> {
        let client = create_client_with_timeout(
            api_key,
            &google.api_base,
            Duration::from_secs(google.timeout_secs),
        )?;
        Ok(Self::with_client(client, &embedding.model, embedding.dimensions as usize)
            .with_batch_size(embedding.batch_size))
    }

    /// Create an embedder around an existing client.
    pub fn with_client(client: Client<OpenAIConfig>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
            batch_size: 100,
            request_dimensions: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Send `dimensions` with each request, for models that support output truncation.
    pub fn with_dimension_request(mut self, enabled: bool) -> Self {
        self.request_dimensions = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VidqaError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()));
            if self.request_dimensions {
                args.dimensions(self.dimensions as u32);
            }
            let request = args
                .build()
                .map_err(|e| VidqaError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| VidqaError::Llm(format!("Embedding API error: {}", e)))?;

            if response.data.len() != chunk.len() {
                return Err(VidqaError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                if embedding_data.embedding.len() != self.dimensions {
                    return Err(VidqaError::Embedding(format!(
                        "Model returned {} dimensions, expected {}",
                        embedding_data.embedding.len(),
                        self.dimensions
                    )));
                }
                all_embeddings.push(embedding_data.embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
