//! Tokenizer-safe chunking of the canonical document text.
//!
//! The canonical text is every block's text concatenated with no separators.
//! Chunks partition it exactly: concatenating all chunk texts in order
//! reproduces the canonical text, and each chunk's `base_offset` is the
//! canonical offset of its first character, accumulated from the lengths of
//! the chunks before it.
//!
//! An entity whose text straddles a forced split point is cut in two; chunks
//! are never re-merged to recover it.
//!
//! ## Example
//!
//! ```
//! use pdf_pii::chunking::{ChunkerConfig, Delimiter, TextChunker};
//!
//! let blocks = vec![vec!["AAAAA.BBBBB.CCCCC.".to_string()]];
//! let config = ChunkerConfig::new(10, 4096).with_delimiter(Delimiter::Text(".".into()));
//! let chunker = TextChunker::new(&blocks, &config);
//!
//! let offsets: Vec<usize> = chunker.chunks().map(|c| c.base_offset).collect();
//! assert_eq!(offsets, vec![0, 6, 12]);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Where the chunker may cut between segments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// Every text block is one segment
    #[default]
    Block,
    /// A segment ends after each occurrence of this string
    Text(String),
}

/// Chunk size limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk
    pub max_chars: usize,
    /// Hard byte ceiling of the downstream tokenizer
    pub max_bytes: usize,
    /// Bytes subtracted from `max_bytes` up front
    pub byte_safety_margin: usize,
    /// Segment delimiter
    pub delimiter: Delimiter,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 100_000,
            max_bytes: 49_149,
            byte_safety_margin: 1024,
            delimiter: Delimiter::Block,
        }
    }
}

impl ChunkerConfig {
    /// Limits with the default margin and delimiter.
    pub fn new(max_chars: usize, max_bytes: usize) -> Self {
        Self {
            max_chars,
            max_bytes,
            ..Default::default()
        }
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the byte safety margin.
    pub fn with_byte_safety_margin(mut self, margin: usize) -> Self {
        self.byte_safety_margin = margin;
        self
    }

    /// Byte limit after the safety margin. Never below one 4-byte character.
    pub fn effective_max_bytes(&self) -> usize {
        self.max_bytes.saturating_sub(self.byte_safety_margin).max(4)
    }

    /// Character limit, never below one.
    pub fn effective_max_chars(&self) -> usize {
        self.max_chars.max(1)
    }
}

/// A piece of the canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Canonical offset of the first character
    pub base_offset: usize,
}

impl Chunk {
    /// Number of characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone)]
struct Segment {
    bytes: Range<usize>,
    chars: usize,
}

/// Splits a document's block texts into chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    text: Arc<str>,
    segments: Arc<[Segment]>,
    max_chars: usize,
    max_bytes: usize,
}

impl TextChunker {
    /// Prepare chunking for a page → block → text array.
    pub fn new(blocks: &[Vec<String>], config: &ChunkerConfig) -> Self {
        let max_chars = config.effective_max_chars();
        let max_bytes = config.effective_max_bytes();

        let mut text = String::new();
        let mut block_ranges = Vec::new();
        for block in blocks.iter().flatten() {
            let start = text.len();
            text.push_str(block);
            if !block.is_empty() {
                block_ranges.push(start..text.len());
            }
        }

        let total_chars = text.chars().count();
        let segments: Vec<Range<usize>> = if text.is_empty() {
            Vec::new()
        } else if total_chars <= max_chars && text.len() <= max_bytes {
            vec![0..text.len()]
        } else {
            match &config.delimiter {
                Delimiter::Block => block_ranges,
                Delimiter::Text(delim) => split_after(&text, delim),
            }
        };

        let segments: Vec<Segment> = segments
            .into_iter()
            .map(|bytes| Segment {
                chars: text[bytes.clone()].chars().count(),
                bytes,
            })
            .collect();

        log::debug!(
            "Chunking {} chars / {} bytes in {} segments (limits: {} chars, {} bytes)",
            total_chars,
            text.len(),
            segments.len(),
            max_chars,
            max_bytes
        );

        Self {
            text: Arc::from(text),
            segments: Arc::from(segments),
            max_chars,
            max_bytes,
        }
    }

    /// The canonical text being chunked.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// A fresh pass over the chunks. Each call starts from the beginning.
    pub fn chunks(&self) -> Chunks {
        Chunks {
            text: Arc::clone(&self.text),
            segments: Arc::clone(&self.segments),
            max_chars: self.max_chars,
            max_bytes: self.max_bytes,
            next_segment: 0,
            pending: None,
            emitted_chars: 0,
        }
    }
}

/// Split `text` after each occurrence of `delim`. With no occurrence the
/// whole text is one segment and goes straight to hard splitting.
fn split_after(text: &str, delim: &str) -> Vec<Range<usize>> {
    if delim.is_empty() {
        return vec![0..text.len()];
    }
    let mut ranges = Vec::new();
    let mut start = 0;
    for (idx, matched) in text.match_indices(delim) {
        let end = idx + matched.len();
        ranges.push(start..end);
        start = end;
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }
    ranges
}

/// Byte length of the longest prefix of `text` within both limits.
///
/// Binary search over character end positions, so cuts always land on a char
/// boundary. At least one character is taken, which bounds the number of
/// pieces by the number of characters.
fn split_point(text: &str, max_chars: usize, max_bytes: usize) -> usize {
    let ends: Vec<usize> = text.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
    let limit = ends.len().min(max_chars.max(1));
    let fitting = ends[..limit].partition_point(|&end| end <= max_bytes);
    ends[fitting.max(1) - 1]
}

/// Lazy chunk sequence produced by [`TextChunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks {
    text: Arc<str>,
    segments: Arc<[Segment]>,
    max_chars: usize,
    max_bytes: usize,
    next_segment: usize,
    /// Remainder of an oversized segment being force-split
    pending: Option<Range<usize>>,
    emitted_chars: usize,
}

impl Chunks {
    fn fits(&self, chars: usize, bytes: usize) -> bool {
        chars <= self.max_chars && bytes <= self.max_bytes
    }

    fn emit(&mut self, bytes: Range<usize>) -> Chunk {
        let text = self.text[bytes].to_string();
        let base_offset = self.emitted_chars;
        self.emitted_chars += text.chars().count();
        Chunk { text, base_offset }
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if let Some(rest) = self.pending.take() {
            let cut = rest.start + split_point(&self.text[rest.clone()], self.max_chars, self.max_bytes);
            if cut < rest.end {
                self.pending = Some(cut..rest.end);
            }
            return Some(self.emit(rest.start..cut));
        }

        let mut buffer: Option<Range<usize>> = None;
        let mut buffer_chars = 0usize;

        while let Some(segment) = self.segments.get(self.next_segment) {
            let seg_bytes = segment.bytes.len();
            if !self.fits(segment.chars, seg_bytes) {
                if buffer.is_some() {
                    break;
                }
                log::info!(
                    "Segment at byte {} ({} chars, {} bytes) exceeds chunk limits; force-splitting",
                    segment.bytes.start,
                    segment.chars,
                    seg_bytes
                );
                self.pending = Some(segment.bytes.clone());
                self.next_segment += 1;
                return self.next();
            }

            let extended = match &buffer {
                Some(current) => current.start..segment.bytes.end,
                None => segment.bytes.clone(),
            };
            if buffer.is_some() && !self.fits(buffer_chars + segment.chars, extended.len()) {
                break;
            }
            buffer = Some(extended);
            buffer_chars += segment.chars;
            self.next_segment += 1;
        }

        buffer.map(|range| self.emit(range))
    }
}

/// Chunk a page → block → text array in one call.
pub fn chunk(blocks: &[Vec<String>], config: &ChunkerConfig) -> Chunks {
    TextChunker::new(blocks, config).chunks()
}
