//! Transcript acquisition.
//!
//! A [`CaptionService`] adapter fetches caption fragments for a video and
//! normalizes whatever shape the upstream returns into [`TranscriptFragment`].
//! [`TranscriptProvider`] validates the ID, calls the adapter, and joins the
//! fragments into a single [`Transcript`].

mod local;
mod youtube;

pub use local::LocalCaptions;
pub use youtube::YoutubeCaptions;

use crate::video::VideoId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Why a transcript could not be produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    #[error("Invalid YouTube video ID format. Please provide a valid 11-character video ID.")]
    InvalidId,

    #[error("Transcripts are disabled for this video.")]
    Disabled,

    #[error("No transcript found for this video. The video may not have captions enabled.")]
    NotFound,

    #[error("Video is unavailable or private ({0}). Please check if the video exists and is publicly accessible.")]
    Unavailable(String),

    #[error("Transcript is empty for this video.")]
    Empty,

    #[error("Error retrieving transcript: {0}")]
    Other(String),
}

impl From<std::io::Error> for TranscriptError {
    fn from(e: std::io::Error) -> Self {
        TranscriptError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for TranscriptError {
    fn from(e: serde_json::Error) -> Self {
        TranscriptError::Other(e.to_string())
    }
}

/// One caption line, in the single shape downstream code works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    /// Start offset in seconds, when the source provides it.
    pub start: Option<f64>,
    /// Duration in seconds, when the source provides it.
    pub duration: Option<f64>,
}

impl TranscriptFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: None,
            duration: None,
        }
    }

    /// Normalize an arbitrary JSON caption entry.
    ///
    /// Accepted shapes: an object with a `text` field (plus optional
    /// `start`/`duration`/`dur`), a YouTube json3 event with `segs[].utf8`,
    /// or a bare string. Anything else is stringified.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::new(s.clone()),
            Value::Object(map) => {
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    return Self {
                        text: text.to_string(),
                        start: map.get("start").and_then(Value::as_f64),
                        duration: map
                            .get("duration")
                            .or_else(|| map.get("dur"))
                            .and_then(Value::as_f64),
                    };
                }

                // json3 events; window-setup events carry no segs
                if map.contains_key("segs") || map.contains_key("tStartMs") {
                    let text: String = map
                        .get("segs")
                        .and_then(Value::as_array)
                        .into_iter()
                        .flatten()
                        .filter_map(|seg| seg.get("utf8").and_then(Value::as_str))
                        .collect();
                    return Self {
                        text,
                        start: map.get("tStartMs").and_then(Value::as_f64).map(|ms| ms / 1000.0),
                        duration: map
                            .get("dDurationMs")
                            .and_then(Value::as_f64)
                            .map(|ms| ms / 1000.0),
                    };
                }

                Self::new(value.to_string())
            }
            other => Self::new(other.to_string()),
        }
    }

    /// Normalize a whole caption payload: a bare array of entries, or an
    /// object wrapping them in `snippets` or `events`.
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        let entries = match value {
            Value::Array(items) => Some(items),
            Value::Object(map) => map
                .get("snippets")
                .or_else(|| map.get("events"))
                .and_then(Value::as_array),
            _ => None,
        };

        match entries {
            Some(items) => items.iter().map(Self::from_value).collect(),
            None => vec![Self::from_value(value)],
        }
    }
}

/// A video's full caption text.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: VideoId,
    pub text: String,
}

impl Transcript {
    /// Join fragments with single spaces; empty fragments are skipped.
    pub fn from_fragments(video_id: VideoId, fragments: &[TranscriptFragment]) -> Self {
        let text = fragments
            .iter()
            .map(|f| f.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self { video_id, text }
    }

    /// First `max_chars` characters, with a marker when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.text[..byte_idx]),
            None => self.text.clone(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Adapter over an external captioning service.
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch caption fragments for a validated video ID.
    async fn fetch_fragments(
        &self,
        video_id: &VideoId,
    ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError>;
}

/// Fetches and normalizes transcripts.
#[derive(Clone)]
pub struct TranscriptProvider {
    service: Arc<dyn CaptionService>,
}

impl TranscriptProvider {
    pub fn new(service: Arc<dyn CaptionService>) -> Self {
        Self { service }
    }

    /// Fetch the transcript for a raw ID or URL.
    #[instrument(skip(self), fields(service = self.service.name()))]
    pub async fn fetch(&self, raw_id: &str) -> std::result::Result<Transcript, TranscriptError> {
        let video_id = VideoId::parse(raw_id).ok_or(TranscriptError::InvalidId)?;

        let fragments = match self.service.fetch_fragments(&video_id).await {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!("Transcript fetch for {} failed: {}", video_id, e);
                return Err(e);
            }
        };

        if fragments.is_empty() {
            return Err(TranscriptError::NotFound);
        }

        let transcript = Transcript::from_fragments(video_id, &fragments);
        if transcript.text.trim().is_empty() {
            return Err(TranscriptError::Empty);
        }

        info!(
            "Fetched transcript for {} ({} fragments, {} chars)",
            transcript.video_id,
            fragments.len(),
            transcript.char_count()
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedCaptions(std::result::Result<Vec<TranscriptFragment>, TranscriptError>);

    #[async_trait]
    impl CaptionService for FixedCaptions {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_fragments(
            &self,
            _video_id: &VideoId,
        ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError> {
            self.0.clone()
        }
    }

    fn provider(result: std::result::Result<Vec<TranscriptFragment>, TranscriptError>) -> TranscriptProvider {
        TranscriptProvider::new(Arc::new(FixedCaptions(result)))
    }

    #[test]
    fn test_fragment_shapes() {
        let obj = TranscriptFragment::from_value(&json!({"text": "hello", "start": 1.5, "duration": 2.0}));
        assert_eq!(obj.text, "hello");
        assert_eq!(obj.start, Some(1.5));
        assert_eq!(obj.duration, Some(2.0));

        let event = TranscriptFragment::from_value(&json!({
            "tStartMs": 2500, "dDurationMs": 1000,
            "segs": [{"utf8": "never "}, {"utf8": "gonna"}]
        }));
        assert_eq!(event.text, "never gonna");
        assert_eq!(event.start, Some(2.5));

        assert_eq!(TranscriptFragment::from_value(&json!("plain")).text, "plain");
        assert_eq!(TranscriptFragment::from_value(&json!(42)).text, "42");
        assert_eq!(
            TranscriptFragment::from_value(&json!({"caption": "x"})).text,
            r#"{"caption":"x"}"#
        );
    }

    #[test]
    fn test_fragment_list_wrappers() {
        let wrapped = json!({"snippets": [{"text": "a"}, {"text": "b"}]});
        assert_eq!(TranscriptFragment::list_from_value(&wrapped).len(), 2);

        let bare = json!(["a", {"text": "b"}]);
        let fragments = TranscriptFragment::list_from_value(&bare);
        assert_eq!(fragments[1].text, "b");
    }

    #[test]
    fn test_excerpt_marks_truncation() {
        let video_id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let transcript = Transcript {
            video_id,
            text: "é".repeat(20),
        };
        assert_eq!(transcript.excerpt(5), format!("{}...", "é".repeat(5)));
        assert_eq!(transcript.excerpt(50), "é".repeat(20));
    }

    #[tokio::test]
    async fn test_fetch_joins_fragments() {
        let p = provider(Ok(vec![
            TranscriptFragment::new(" Hello "),
            TranscriptFragment::new(""),
            TranscriptFragment::new("world."),
        ]));
        let transcript = p.fetch("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert_eq!(transcript.text, "Hello world.");
        assert_eq!(transcript.video_id.as_str(), "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_fetch_keeps_angle_brackets_in_captions() {
        let p = provider(Ok(vec![
            TranscriptFragment::from_value(&json!({"text": "if x < y and y > z then", "start": 0.0})),
            TranscriptFragment::new("<b>not markup</b>"),
        ]));
        let transcript = p.fetch("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(transcript.text, "if x < y and y > z then <b>not markup</b>");
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_id() {
        let p = provider(Ok(vec![TranscriptFragment::new("unused")]));
        assert_eq!(p.fetch("https://invalid-url.com").await, Err(TranscriptError::InvalidId));
    }

    #[tokio::test]
    async fn test_fetch_maps_empty_and_errors() {
        let p = provider(Ok(vec![TranscriptFragment::new("   ")]));
        assert_eq!(p.fetch("dQw4w9WgXcQ").await, Err(TranscriptError::Empty));

        let p = provider(Ok(vec![]));
        assert_eq!(p.fetch("dQw4w9WgXcQ").await, Err(TranscriptError::NotFound));

        let p = provider(Err(TranscriptError::Disabled));
        assert_eq!(p.fetch("dQw4w9WgXcQ").await, Err(TranscriptError::Disabled));
    }
}
