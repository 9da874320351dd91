//! Ordered fallbacks for when similarity search finds nothing.
//!
//! Every path through [`FallbackLadder::resolve`] ends in non-empty text: the
//! last rung is a fixed sentinel.

use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::transcript::Transcript;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Context used when nothing else is available.
pub const NO_CONTENT_SENTINEL: &str = "No specific content found for this video.";

/// Passage search over one video's namespace.
#[async_trait]
pub trait PassageSearch: Send + Sync {
    /// Texts of up to `top_k` passages similar to `query`, best first.
    /// With `min_score`, weaker matches are dropped.
    async fn search(&self, query: &str, top_k: usize, min_score: Option<f32>) -> Result<Vec<String>>;
}

/// One rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// Re-search with a generic overview query.
    OverviewQuery,
    /// Re-search with an empty query to approximate "any documents".
    AnyDocuments,
    /// Leading slice of the raw transcript.
    TranscriptExcerpt,
    /// Fixed sentinel text.
    NoContentSentinel,
}

impl FallbackStrategy {
    /// Full ladder, in the order it is tried.
    pub const LADDER: [FallbackStrategy; 4] = [
        FallbackStrategy::OverviewQuery,
        FallbackStrategy::AnyDocuments,
        FallbackStrategy::TranscriptExcerpt,
        FallbackStrategy::NoContentSentinel,
    ];

    /// Whether this rung needs a searchable index.
    pub fn needs_index(&self) -> bool {
        matches!(self, FallbackStrategy::OverviewQuery | FallbackStrategy::AnyDocuments)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FallbackStrategy::OverviewQuery => "overview_query",
            FallbackStrategy::AnyDocuments => "any_documents",
            FallbackStrategy::TranscriptExcerpt => "transcript_excerpt",
            FallbackStrategy::NoContentSentinel => "no_content_sentinel",
        }
    }
}

impl std::fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Context produced by a fallback rung.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackContext {
    pub text: String,
    pub strategy: FallbackStrategy,
}

/// Ladder parameters.
#[derive(Debug, Clone)]
pub struct FallbackLadder {
    overview_query: String,
    overview_top_k: usize,
    any_top_k: usize,
    excerpt_chars: usize,
}

impl Default for FallbackLadder {
    fn default() -> Self {
        Self::from_settings(&RetrievalSettings::default())
    }
}

impl FallbackLadder {
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        Self {
            overview_query: settings.overview_query.clone(),
            overview_top_k: settings.overview_top_k,
            any_top_k: settings.any_top_k,
            excerpt_chars: settings.excerpt_chars,
        }
    }

    /// Rungs to try. Without a searchable index the search rungs are skipped.
    pub fn steps(&self, index_available: bool) -> Vec<FallbackStrategy> {
        FallbackStrategy::LADDER
            .into_iter()
            .filter(|step| index_available || !step.needs_index())
            .collect()
    }

    /// Run a single rung. `None` means the rung produced nothing usable.
    pub async fn attempt(
        &self,
        strategy: FallbackStrategy,
        search: Option<&dyn PassageSearch>,
        transcript: &Transcript,
    ) -> Option<String> {
        let text = match strategy {
            FallbackStrategy::OverviewQuery => {
                Self::search_rung(search?, &self.overview_query, self.overview_top_k, strategy).await?
            }
            FallbackStrategy::AnyDocuments => {
                Self::search_rung(search?, "", self.any_top_k, strategy).await?
            }
            FallbackStrategy::TranscriptExcerpt => transcript.excerpt(self.excerpt_chars),
            FallbackStrategy::NoContentSentinel => NO_CONTENT_SENTINEL.to_string(),
        };

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Try each rung in order, stopping at the first non-empty result.
    pub async fn resolve(
        &self,
        search: Option<&dyn PassageSearch>,
        transcript: &Transcript,
    ) -> FallbackContext {
        for strategy in self.steps(search.is_some()) {
            if let Some(text) = self.attempt(strategy, search, transcript).await {
                debug!("Fallback '{}' produced {} chars of context", strategy, text.len());
                return FallbackContext { text, strategy };
            }
        }

        FallbackContext {
            text: NO_CONTENT_SENTINEL.to_string(),
            strategy: FallbackStrategy::NoContentSentinel,
        }
    }

    async fn search_rung(
        search: &dyn PassageSearch,
        query: &str,
        top_k: usize,
        strategy: FallbackStrategy,
    ) -> Option<String> {
        match search.search(query, top_k, None).await {
            Ok(passages) => Some(join_passages(&passages)),
            Err(e) => {
                warn!("Fallback '{}' search failed: {}", strategy, e);
                None
            }
        }
    }
}

/// Join passage texts into one context block.
pub fn join_passages(passages: &[String]) -> String {
    passages.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VidqaError;
    use crate::video::VideoId;
    use std::sync::Mutex;

    /// Returns canned passages per query and records every call.
    struct ScriptedSearch {
        overview: Vec<String>,
        any: Vec<String>,
        fail: bool,
        calls: Mutex<Vec<(String, usize, Option<f32>)>>,
    }

    impl ScriptedSearch {
        fn new(overview: &[&str], any: &[&str]) -> Self {
            Self {
                overview: overview.iter().map(|s| s.to_string()).collect(),
                any: any.iter().map(|s| s.to_string()).collect(),
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[], &[])
            }
        }
    }

    #[async_trait]
    impl PassageSearch for ScriptedSearch {
        async fn search(&self, query: &str, top_k: usize, min_score: Option<f32>) -> Result<Vec<String>> {
            self.calls.lock().unwrap().push((query.to_string(), top_k, min_score));
            if self.fail {
                return Err(VidqaError::VectorStore("down".to_string()));
            }
            Ok(if query.is_empty() { self.any.clone() } else { self.overview.clone() })
        }
    }

    fn transcript(text: &str) -> Transcript {
        Transcript {
            video_id: VideoId::parse("dQw4w9WgXcQ").unwrap(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_ladder_order() {
        let ladder = FallbackLadder::default();
        assert_eq!(ladder.steps(true), FallbackStrategy::LADDER.to_vec());
        assert_eq!(
            ladder.steps(false),
            vec![FallbackStrategy::TranscriptExcerpt, FallbackStrategy::NoContentSentinel]
        );
    }

    #[tokio::test]
    async fn test_overview_query_wins_first() {
        let search = ScriptedSearch::new(&["overview passage"], &["any passage"]);
        let result = FallbackLadder::default().resolve(Some(&search), &transcript("raw")).await;

        assert_eq!(result.strategy, FallbackStrategy::OverviewQuery);
        assert_eq!(result.text, "overview passage");

        let calls = search.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("video content overview".to_string(), 3, None)]);
    }

    #[tokio::test]
    async fn test_any_documents_uses_empty_query() {
        let search = ScriptedSearch::new(&["   "], &["a", "b"]);
        let result = FallbackLadder::default().resolve(Some(&search), &transcript("raw")).await;

        assert_eq!(result.strategy, FallbackStrategy::AnyDocuments);
        assert_eq!(result.text, "a\nb");
        assert_eq!(search.calls.lock().unwrap()[1], (String::new(), 5, None));
    }

    #[tokio::test]
    async fn test_empty_index_falls_back_to_excerpt() {
        let search = ScriptedSearch::new(&[], &[]);
        let text = "Hello world. ".repeat(200);
        let result = FallbackLadder::default().resolve(Some(&search), &transcript(&text)).await;

        assert_eq!(result.strategy, FallbackStrategy::TranscriptExcerpt);
        assert_eq!(result.text.chars().count(), 1503);
        assert!(result.text.ends_with("..."));
    }

    #[tokio::test]
    async fn test_search_errors_are_skipped() {
        let search = ScriptedSearch::failing();
        let result = FallbackLadder::default().resolve(Some(&search), &transcript("short")).await;

        assert_eq!(result.strategy, FallbackStrategy::TranscriptExcerpt);
        assert_eq!(result.text, "short");
    }

    #[tokio::test]
    async fn test_no_index_and_blank_transcript_yields_sentinel() {
        let result = FallbackLadder::default().resolve(None, &transcript("  ")).await;
        assert_eq!(result.strategy, FallbackStrategy::NoContentSentinel);
        assert_eq!(result.text, NO_CONTENT_SENTINEL);
    }
}
