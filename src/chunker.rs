//! Overlapping fixed-size text chunking
//!
//! Text is consumed left to right. Each chunk holds at most `chunk_size`
//! characters and ends, when possible, on a paragraph, sentence or word
//! boundary close to the size limit. The next chunk starts `overlap`
//! characters before the previous one ended, so a chunk cut exactly at the
//! limit advances by `chunk_size - overlap`.

use crate::error::ChunkingError;
use crate::types::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits extracted document text into overlapping chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextChunker {
    /// Create a chunker, rejecting `chunk_size == 0` and `overlap >= chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered chunks. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();

        if total == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            let limit = start + self.chunk_size;
            let end = if limit >= total {
                total
            } else {
                self.find_break(&chars, start, limit)
            };

            chunks.push(Chunk {
                index: chunks.len(),
                start,
                len: end - start,
                text: chars[start..end].iter().collect(),
            });

            if end >= total {
                break;
            }

            // find_break never returns a position at or before start + overlap
            start = end - self.overlap;
        }

        chunks
    }

    /// Pick the end of a chunk that starts at `start` and may not pass `limit`
    ///
    /// Candidates lie in a lookback window below `limit` and always leave the
    /// next chunk starting after `start`. Preference: paragraph break, sentence
    /// end, word boundary, then a hard cut at `limit`.
    fn find_break(&self, chars: &[char], start: usize, limit: usize) -> usize {
        let lookback = (self.chunk_size / 5).max(1);
        let floor = limit
            .saturating_sub(lookback)
            .max(start + self.overlap + 1);

        let window = || (floor..=limit).rev();
        let paragraph = |p: usize| p >= 2 && chars[p - 1] == '\n' && chars[p - 2] == '\n';
        let sentence = |p: usize| {
            p >= 2 && chars[p - 1].is_whitespace() && matches!(chars[p - 2], '.' | '!' | '?')
        };
        let word = |p: usize| chars[p - 1].is_whitespace() || chars[p].is_whitespace();

        window()
            .find(|&p| paragraph(p))
            .or_else(|| window().find(|&p| sentence(p)))
            .or_else(|| window().find(|&p| word(p)))
            .unwrap_or(limit)
    }
}

/// Split `text` with the given parameters
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkingError> {
    Ok(TextChunker::new(chunk_size, overlap)?.split(text))
}
