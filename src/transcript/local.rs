//! Transcripts read from JSON files on disk.
//!
//! Looks for `<dir>/<video_id>.json`. Useful offline and for pre-fetched
//! caption dumps.

use super::{CaptionService, TranscriptError, TranscriptFragment};
use crate::video::VideoId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Caption service backed by a directory of JSON files.
pub struct LocalCaptions {
    dir: PathBuf,
}

impl LocalCaptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, video_id: &VideoId) -> PathBuf {
        self.dir.join(format!("{}.json", video_id))
    }
}

#[async_trait]
impl CaptionService for LocalCaptions {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_fragments(
        &self,
        video_id: &VideoId,
    ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError> {
        let path = self.path_for(video_id);
        debug!("Reading captions from {:?}", path);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranscriptError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&content)?;
        Ok(TranscriptFragment::list_from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_mixed_fragment_shapes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dQw4w9WgXcQ.json"),
            r#"[{"text": "We're no strangers", "start": 0.0}, "to love", {"segs": [{"utf8": "You know"}]}]"#,
        )
        .unwrap();

        let captions = LocalCaptions::new(dir.path());
        let video_id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let fragments = captions.fetch_fragments(&video_id).await.unwrap();

        let texts: Vec<_> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["We're no strangers", "to love", "You know"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let captions = LocalCaptions::new(dir.path());
        let video_id = VideoId::parse("jNQXAC9IVRw").unwrap();

        assert_eq!(
            captions.fetch_fragments(&video_id).await,
            Err(TranscriptError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_other() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jNQXAC9IVRw.json"), "{not json").unwrap();
        let captions = LocalCaptions::new(dir.path());
        let video_id = VideoId::parse("jNQXAC9IVRw").unwrap();

        assert!(matches!(
            captions.fetch_fragments(&video_id).await,
            Err(TranscriptError::Other(_))
        ));
    }
}
