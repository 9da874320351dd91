//! Prompt assembly and answer generation.

use crate::config::Prompts;
use crate::error::Result;
use crate::generation::TextGenerator;
use crate::memory::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Builds the answer prompt and asks the model for a reply.
pub struct AnswerComposer {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Deterministic prompt from context, recent history and the question.
    pub fn compose(&self, context: &str, history: &[ChatMessage], question: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("history".to_string(), self.render_history(history));
        vars.insert("question".to_string(), question.to_string());

        self.prompts
            .render_with_custom(&self.prompts.answer.template, &vars)
    }

    /// Ask the model to answer `prompt`.
    #[instrument(skip(self, prompt), fields(model = self.generator.model()))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let answer = self.generator.generate(prompt).await?;
        debug!("Answer has {} chars", answer.len());
        Ok(answer)
    }

    /// `Heading\nUser: ...\nAssistant: ...\n\n`, or nothing without history.
    fn render_history(&self, history: &[ChatMessage]) -> String {
        if history.is_empty() {
            return String::new();
        }

        let mut out = format!("{}\n", self.prompts.answer.history_heading);
        for message in history {
            out.push_str(&format!("{}: {}\n", message.role, message.content));
        }
        out.push('\n');
        out
    }
}
