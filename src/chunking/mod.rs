//! Transcript chunking for embedding and retrieval.
//!
//! Transcripts are split into overlapping character windows whose ends snap
//! to the nearest paragraph, line, sentence, or word boundary.

mod recursive;

pub use recursive::TextSplitter;

use crate::config::ChunkingSettings;
use serde::{Deserialize, Serialize};

/// A contiguous slice of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Exact text of the slice.
    pub content: String,
    /// Position of this chunk in creation order.
    pub order: usize,
    /// Character offset (not byte) where the slice starts.
    pub start_char: usize,
    /// Character offset one past the end of the slice.
    pub end_char: usize,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.end_char - self.start_char
    }
}

/// Size and overlap policy, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}
