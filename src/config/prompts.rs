//! Prompt templates for vidqa.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for answering a question about one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    /// Full prompt. Placeholders: `{{context}}`, `{{history}}`, `{{question}}`.
    pub template: String,
    /// Heading placed before rendered chat history.
    pub history_heading: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are an expert video analyst. Based on the following content from a YouTube video, provide a comprehensive and detailed answer to the user's question.

Content from the video:
{{context}}

{{history}}User's question: {{question}}

Instructions:
- Provide a thorough, well-structured response that directly addresses the question
- Include relevant details and insights from the video content
- Write in a natural, conversational tone as if you're explaining the video to someone
- Don't mention that you're working with transcripts or video content - just provide the information naturally
- If the question follows up on the previous conversation, use it to understand what is being asked
- Make the answer self-contained so it reads well without the earlier messages
- If the content doesn't contain enough information to answer the question fully, acknowledge this but provide what you can from the available content
- Make your response informative and engaging

Answer:"#
                .to_string(),

            history_heading: "Previous conversation:".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
