//! YouTube video identifiers.
//!
//! Extraction is permissive and validation is strict: [`extract_video_id`]
//! hands back its input untouched when nothing matches, so callers always
//! follow up with [`validate_video_id`] (or use [`VideoId::parse`], which
//! does both).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Length of every YouTube video ID.
pub const VIDEO_ID_LEN: usize = 11;

static URL_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
        .expect("Invalid regex")
});

static BARE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9_-]{11})$").expect("Invalid regex"));

/// Extract a video ID from a YouTube URL, or return the input unchanged.
///
/// URL forms are tried before the bare-ID form. The result is not
/// guaranteed to be a valid ID.
pub fn extract_video_id(url_or_id: &str) -> String {
    for regex in [&*URL_ID_REGEX, &*BARE_ID_REGEX] {
        if let Some(m) = regex.captures(url_or_id).and_then(|caps| caps.get(1)) {
            return m.as_str().to_string();
        }
    }
    url_or_id.to_string()
}

/// True iff `id` is exactly 11 characters of `[a-zA-Z0-9_-]`.
pub fn validate_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A validated 11-character YouTube video ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Extract and validate a video ID from a URL or raw ID.
    pub fn parse(url_or_id: &str) -> Option<Self> {
        let candidate = extract_video_id(url_or_id.trim());
        validate_video_id(&candidate).then_some(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Vector-index namespace holding this video's chunks.
    pub fn namespace(&self) -> String {
        namespace_for(self)
    }

    /// Canonical watch URL.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if validate_video_id(&value) {
            Ok(Self(value))
        } else {
            Err(format!("Invalid YouTube video ID: {}", value))
        }
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl std::str::FromStr for VideoId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Not a YouTube URL or video ID: {}", s))
    }
}

/// Stable 32-hex-character namespace derived from the MD5 of the video ID.
pub fn namespace_for(video: &VideoId) -> String {
    format!("{:x}", md5::compute(video.as_str().as_bytes()))
}
