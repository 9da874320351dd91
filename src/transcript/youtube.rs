//! YouTube captions via `yt-transcript-rs`.

use super::{CaptionService, TranscriptError, TranscriptFragment};
use crate::error::{Result, VidqaError};
use crate::video::VideoId;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use yt_transcript_rs::api::YouTubeTranscriptApi;
use yt_transcript_rs::errors::{CouldNotRetrieveTranscript, CouldNotRetrieveTranscriptReason};

/// Caption service backed by YouTube's public transcripts.
pub struct YoutubeCaptions {
    api: YouTubeTranscriptApi,
    languages: Vec<String>,
    timeout: Duration,
}

impl YoutubeCaptions {
    /// Create a client preferring the given caption languages, in order.
    pub fn new(languages: Vec<String>, timeout: Duration) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| VidqaError::Config(format!("Failed to create YouTube client: {}", e)))?;

        Ok(Self {
            api,
            languages,
            timeout,
        })
    }
}

/// Map a library failure onto the transcript error taxonomy.
fn classify(error: &CouldNotRetrieveTranscript) -> TranscriptError {
    match &error.reason {
        Some(CouldNotRetrieveTranscriptReason::TranscriptsDisabled) => TranscriptError::Disabled,
        Some(CouldNotRetrieveTranscriptReason::NoTranscriptFound { .. }) => TranscriptError::NotFound,
        Some(CouldNotRetrieveTranscriptReason::InvalidVideoId) => TranscriptError::InvalidId,
        Some(
            CouldNotRetrieveTranscriptReason::VideoUnavailable
            | CouldNotRetrieveTranscriptReason::VideoUnplayable { .. }
            | CouldNotRetrieveTranscriptReason::AgeRestricted,
        ) => TranscriptError::Unavailable(error.to_string()),
        _ => TranscriptError::Other(error.to_string()),
    }
}

#[async_trait]
impl CaptionService for YoutubeCaptions {
    fn name(&self) -> &str {
        "youtube"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch_fragments(
        &self,
        video_id: &VideoId,
    ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError> {
        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        let fetched = tokio::time::timeout(
            self.timeout,
            self.api.fetch_transcript(video_id.as_str(), &languages, false),
        )
        .await
        .map_err(|_| TranscriptError::Other(format!("timed out after {:?}", self.timeout)))?
        .map_err(|e| classify(&e))?;

        debug!(
            "Fetched {} snippets in {} ({})",
            fetched.snippets.len(),
            fetched.language,
            fetched.language_code
        );

        Ok(fetched
            .snippets
            .into_iter()
            .map(|snippet| TranscriptFragment {
                text: snippet.text,
                start: Some(snippet.start),
                duration: Some(snippet.duration),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(reason: CouldNotRetrieveTranscriptReason) -> CouldNotRetrieveTranscript {
        CouldNotRetrieveTranscript {
            video_id: "dQw4w9WgXcQ".to_string(),
            reason: Some(reason),
        }
    }

    #[test]
    fn test_classify_library_errors() {
        assert_eq!(
            classify(&failure(CouldNotRetrieveTranscriptReason::TranscriptsDisabled)),
            TranscriptError::Disabled
        );
        assert_eq!(
            classify(&failure(CouldNotRetrieveTranscriptReason::InvalidVideoId)),
            TranscriptError::InvalidId
        );
        assert!(matches!(
            classify(&failure(CouldNotRetrieveTranscriptReason::VideoUnavailable)),
            TranscriptError::Unavailable(_)
        ));
        assert!(matches!(
            classify(&failure(CouldNotRetrieveTranscriptReason::AgeRestricted)),
            TranscriptError::Unavailable(_)
        ));
    }

    #[test]
    fn test_classify_without_reason_is_other() {
        let error = CouldNotRetrieveTranscript {
            video_id: "dQw4w9WgXcQ".to_string(),
            reason: None,
        };
        assert!(matches!(classify(&error), TranscriptError::Other(_)));
    }
}
