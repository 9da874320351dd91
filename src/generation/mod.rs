//! Answer text generation.

mod gemini;

pub use gemini::GeminiGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for single-prompt text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the model producing completions.
    fn model(&self) -> &str;
}
