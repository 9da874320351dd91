//! Gemini chat completions through the OpenAI-compatible endpoint.

use super::TextGenerator;
use crate::config::{GenerationSettings, GoogleSettings};
use crate::error::{Result, VidqaError};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Gemini-based text generator.
pub struct GeminiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl GeminiGenerator {
    /// Create a generator from settings.
    pub fn new(api_key: &str, google: &GoogleSettings, generation: &GenerationSettings) -> Result<Self> {
        let client = create_client_with_timeout(
            api_key,
            &google.api_base,
            Duration::from_secs(google.timeout_secs),
        )?;
        Ok(Self::with_client(client, &generation.model, generation.temperature))
    }

    /// Create a generator around an existing client.
    pub fn with_client(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| VidqaError::Generation(e.to_string()))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| VidqaError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| VidqaError::Llm(format!("Failed to generate response: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| VidqaError::Generation("Empty response from LLM".to_string()))?;

        // A reply without text content is surfaced as its debug rendering.
        let answer = match &choice.message.content {
            Some(content) => content.clone(),
            None => format!("{:?}", choice.message),
        };

        debug!("Generated {} chars", answer.len());
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::create_client;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gemini-2.0-flash",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
        })
    }

    #[tokio::test]
    async fn test_generate_sends_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gemini-2.0-flash",
                "messages": [{ "role": "user", "content": "What is this about?" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!("A song."))))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client("key", &server.uri()).unwrap();
        let generator = GeminiGenerator::with_client(client, "gemini-2.0-flash", 0.1);

        assert_eq!(generator.generate("What is this about?").await.unwrap(), "A song.");
    }

    #[tokio::test]
    async fn test_missing_content_is_stringified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(null))))
            .mount(&server)
            .await;

        let client = create_client("key", &server.uri()).unwrap();
        let generator = GeminiGenerator::with_client(client, "gemini-2.0-flash", 0.1);

        let answer = generator.generate("hi").await.unwrap();
        assert!(!answer.is_empty());
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "bad request", "type": "invalid_request_error", "param": null, "code": null }
            })))
            .mount(&server)
            .await;

        let client = create_client("key", &server.uri()).unwrap();
        let generator = GeminiGenerator::with_client(client, "gemini-2.0-flash", 0.1);

        assert!(matches!(generator.generate("hi").await, Err(VidqaError::Llm(_))));
    }
}
