//! Boundary-aware sliding-window splitter.

use super::{Chunk, ChunkingConfig};
use crate::error::{Result, VidqaError};
use tracing::debug;

/// Boundary tiers, tried in order: paragraph, line, sentence, word.
const BOUNDARY_TIERS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

/// Splits text into overlapping chunks of at most `chunk_size` characters.
///
/// Every chunk after the first starts exactly `chunk_overlap` characters
/// before the previous chunk's end, so the non-overlapping parts
/// (`text[chunk[i].start_char..chunk[i + 1].start_char]`, then the whole
/// last chunk) concatenate back to the input.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(VidqaError::Config("chunk_size must be positive".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(VidqaError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split `text`. Empty input yields no chunks; any other input yields at least one.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // char index -> byte index, with a sentinel for the end
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(byte_idx, _)| byte_idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if total - start <= size {
                chunks.push(Self::slice(text, &offsets, start, total, chunks.len()));
                break;
            }

            let hard_end = start + size;
            let end = Self::find_boundary(text, &offsets, start + overlap, hard_end)
                .unwrap_or(hard_end);

            chunks.push(Self::slice(text, &offsets, start, end, chunks.len()));
            start = end - overlap;
        }

        debug!(
            "Split {} chars into {} chunks (size {}, overlap {})",
            total,
            chunks.len(),
            size,
            overlap
        );
        chunks
    }

    /// Latest boundary end in `(floor, hard_end]`, by tier preference.
    fn find_boundary(text: &str, offsets: &[usize], floor: usize, hard_end: usize) -> Option<usize> {
        let window_start = offsets[floor];
        let window = &text[window_start..offsets[hard_end]];

        for tier in BOUNDARY_TIERS {
            let best = tier
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|idx| idx + sep.len()))
                .max();

            if let Some(end_byte) = best {
                let end = floor + window[..end_byte].chars().count();
                if end > floor {
                    return Some(end);
                }
            }
        }

        None
    }

    fn slice(text: &str, offsets: &[usize], start: usize, end: usize, order: usize) -> Chunk {
        Chunk {
            content: text[offsets[start]..offsets[end]].to_string(),
            order,
            start_char: start,
            end_char: end,
        }
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    fn reconstruct(text: &str, chunks: &[Chunk]) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::new();
        for pair in chunks.windows(2) {
            out.extend(&chars[pair[0].start_char..pair[1].start_char]);
        }
        if let Some(last) = chunks.last() {
            out.push_str(&last.content);
        }
        out
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(TextSplitter::new(ChunkingConfig { chunk_size: 100, chunk_overlap: 100 }).is_err());
        assert!(TextSplitter::new(ChunkingConfig { chunk_size: 0, chunk_overlap: 0 }).is_err());
    }

    #[test]
    fn test_empty_and_short_input() {
        let s = TextSplitter::default();
        assert!(s.split("").is_empty());

        let chunks = s.split("   ");
        assert_eq!(chunks.len(), 1);

        let chunks = s.split("Hello world.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello world.");
    }

    #[test]
    fn test_chunk_count_size_and_reconstruction() {
        let text = "Hello world. ".repeat(400);
        let len = text.chars().count();

        for (size, overlap) in [(800, 150), (200, 50), (97, 13)] {
            let chunks = splitter(size, overlap).split(&text);
            let min_chunks = (len - overlap).div_ceil(size - overlap);

            assert!(chunks.len() >= min_chunks, "{} < {} for {}/{}", chunks.len(), min_chunks, size, overlap);
            assert!(chunks.iter().all(|c| c.char_len() <= size));
            assert_eq!(reconstruct(&text, &chunks), text);
            assert!(chunks.iter().enumerate().all(|(i, c)| c.order == i));
        }
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "a".repeat(2000);
        let chunks = splitter(800, 150).split(&text);

        let starts: Vec<_> = chunks.iter().map(|c| c.start_char).collect();
        assert_eq!(starts, vec![0, 650, 1300]);
        assert_eq!(chunks[0].char_len(), 800);
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_prefers_paragraph_over_sentence() {
        let para = format!("{}\n\n", "Short sentence. ".repeat(20));
        let text = para.repeat(5);
        let chunks = splitter(800, 150).split(&text);

        assert!(chunks.len() > 1);
        assert!(chunks[0].content.ends_with("\n\n"));
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_sentence_boundary_before_word() {
        let text = format!("{}. {}", "word ".repeat(30).trim_end(), "tail ".repeat(40));
        let chunks = splitter(200, 20).split(&text);
        assert!(chunks[0].content.ends_with(". "));
    }

    #[test]
    fn test_multibyte_text() {
        let text = "日本語のテキスト。".repeat(100) + &"émoji 🎬 ".repeat(50);
        let chunks = splitter(120, 30).split(&text);
        assert!(chunks.iter().all(|c| c.char_len() <= 120));
        assert_eq!(reconstruct(&text, &chunks), text);
    }
}
