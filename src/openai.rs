//! OpenAI-compatible client setup for the Gemini endpoint.

use crate::error::{Result, VidqaError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for model API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create a client for an OpenAI-compatible endpoint with the default timeout.
pub fn create_client(api_key: &str, api_base: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_key, api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client for an OpenAI-compatible endpoint with a custom timeout.
pub fn create_client_with_timeout(
    api_key: &str,
    api_base: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VidqaError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base.trim_end_matches('/'));

    Ok(Client::with_config(config).with_http_client(http_client))
}
