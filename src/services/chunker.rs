//! Text chunking with overlap for embedding.

use crate::error::ChunkError;
use crate::models::{IndexingConfig, TextChunk};

/// Text chunker that splits documents into overlapping fixed-size windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared between adjacent windows
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker, rejecting `chunk_size == 0` and `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidArgument(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ChunkError::InvalidArgument(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from the indexing configuration.
    pub fn from_config(config: &IndexingConfig) -> Result<Self, ChunkError> {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping chunks with character offsets.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let step = self.chunk_size - self.overlap;

        let mut chunks = Vec::with_capacity(total_chars.div_ceil(step));
        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);

            chunks.push(TextChunk {
                content: chars[start..end].iter().collect(),
                start_char: start,
                end_char: end,
            });

            // The window already covers the tail; another one would be a
            // strict suffix of this chunk.
            if end == total_chars {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Split `text` into windows of `chunk_size` characters sharing `overlap` characters.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>, ChunkError> {
    Ok(TextChunker::new(chunk_size, overlap)?.chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(len: usize) -> String {
        "abcdefghijklmnopqrstuvwxyz0123456789"
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            chunk_text("text", 0, 0),
            Err(ChunkError::InvalidArgument(_))
        ));
        assert!(matches!(
            chunk_text("text", 10, 10),
            Err(ChunkError::InvalidArgument(_))
        ));
        assert!(matches!(
            chunk_text("text", 10, 20),
            Err(ChunkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 300, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, 13);

        // Longer than one step but still shorter than a window.
        let text = sample_text(280);
        let chunks = chunk_text(&text, 300, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_char, 280);
    }

    #[test]
    fn test_thousand_chars_scenario() {
        let text = sample_text(1000);
        let chunks = chunk_text(&text, 300, 50).unwrap();

        assert_eq!(chunks.len(), (1000_usize - 50).div_ceil(250));
        assert_eq!(chunks.len(), 4);

        let expected = [(0, 300), (250, 550), (500, 800), (750, 1000)];
        for (chunk, (start, end)) in chunks.iter().zip(expected) {
            assert_eq!(chunk.start_char, start);
            assert_eq!(chunk.end_char, end);
            assert!(chunk.start_char < chunk.end_char);
            assert!(chunk.end_char <= 1000);
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        for (len, size, overlap) in [(1000, 300, 50), (777, 100, 33), (64, 10, 0), (500, 7, 6)] {
            let text = sample_text(len);
            let chunks = chunk_text(&text, size, overlap).unwrap();

            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].content.chars().collect();
                let next: Vec<char> = pair[1].content.chars().collect();
                let tail: String = prev[prev.len() - overlap..].iter().collect();
                let head: String = next[..overlap].iter().collect();
                assert_eq!(tail, head, "len={len} size={size} overlap={overlap}");
                assert_eq!(pair[1].start_char, pair[0].start_char + size - overlap);
            }

            let last = chunks.last().unwrap();
            assert_eq!(last.end_char, len);
        }
    }

    #[test]
    fn test_offsets_count_characters() {
        let text = "héllo wörld ünïcode";
        let chunks = chunk_text(text, 8, 2).unwrap();
        for chunk in &chunks {
            let expected: String = text
                .chars()
                .skip(chunk.start_char)
                .take(chunk.end_char - chunk.start_char)
                .collect();
            assert_eq!(chunk.content, expected);
        }
        assert_eq!(chunks.last().unwrap().end_char, text.chars().count());
    }

    #[test]
    fn test_from_config() {
        let chunker = TextChunker::from_config(&IndexingConfig::default()).unwrap();
        assert_eq!(chunker.chunk_size(), 500);
        assert_eq!(chunker.overlap(), 50);
    }
}
