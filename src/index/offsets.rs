//! Canonical offset bookkeeping.
//!
//! The canonical offset of a character is its position in the concatenation
//! of all block texts (pages in order, blocks in order, no separators),
//! counted in `char`s. [`OffsetTable`] converts between that numbering and
//! `(page, block, offset)` positions using nothing but block lengths, so the
//! character index and a persisted document always agree.

use crate::span::TextPosition;
use std::ops::Range;

/// Block-length table for converting canonical offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffsetTable {
    /// page -> block -> canonical start offset
    block_starts: Vec<Vec<usize>>,
    /// page -> block -> char count
    block_lens: Vec<Vec<usize>>,
    /// (start, page, block) for every non-empty block, sorted by start
    runs: Vec<(usize, usize, usize)>,
    total: usize,
}

impl OffsetTable {
    /// Build from char counts (page -> block -> count).
    pub fn from_lengths(block_lens: Vec<Vec<usize>>) -> Self {
        let mut block_starts = Vec::with_capacity(block_lens.len());
        let mut runs = Vec::new();
        let mut total = 0usize;

        for (page, blocks) in block_lens.iter().enumerate() {
            let mut starts = Vec::with_capacity(blocks.len());
            for (block, &len) in blocks.iter().enumerate() {
                starts.push(total);
                if len > 0 {
                    runs.push((total, page, block));
                }
                total += len;
            }
            block_starts.push(starts);
        }

        Self {
            block_starts,
            block_lens,
            runs,
            total,
        }
    }

    /// Build from the 2-D block text array.
    pub fn from_texts(texts: &[Vec<String>]) -> Self {
        Self::from_lengths(
            texts
                .iter()
                .map(|page| page.iter().map(|block| block.chars().count()).collect())
                .collect(),
        )
    }

    /// Total number of characters in the document.
    pub fn len(&self) -> usize {
        self.total
    }

    /// True when the document has no characters.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.block_lens.len()
    }

    /// Number of blocks on a page.
    pub fn block_count(&self, page: usize) -> Option<usize> {
        self.block_lens.get(page).map(Vec::len)
    }

    /// Char count of one block.
    pub fn block_len(&self, page: usize, block: usize) -> Option<usize> {
        self.block_lens.get(page)?.get(block).copied()
    }

    /// Canonical range covered by one block.
    pub fn block_range(&self, page: usize, block: usize) -> Option<Range<usize>> {
        let start = *self.block_starts.get(page)?.get(block)?;
        let len = self.block_len(page, block)?;
        Some(start..start + len)
    }

    /// Canonical offset of a position, if the position names a character.
    pub fn to_canonical(&self, pos: TextPosition) -> Option<usize> {
        let range = self.block_range(pos.page, pos.block)?;
        if pos.offset < range.len() {
            Some(range.start + pos.offset)
        } else {
            None
        }
    }

    /// Position of the character at a canonical offset.
    pub fn to_position(&self, offset: usize) -> Option<TextPosition> {
        if offset >= self.total {
            return None;
        }
        let idx = self.runs.partition_point(|&(start, _, _)| start <= offset);
        let (start, page, block) = *self.runs.get(idx.checked_sub(1)?)?;
        Some(TextPosition::new(page, block, offset - start))
    }

    /// Positions of the first and last character of a half-open canonical
    /// range, i.e. the inclusive-end form used on the wire.
    pub fn to_inclusive_range(&self, start: usize, end: usize) -> Option<(TextPosition, TextPosition)> {
        if end <= start {
            return None;
        }
        Some((self.to_position(start)?, self.to_position(end - 1)?))
    }

    /// Half-open canonical range from inclusive-end positions.
    pub fn from_inclusive_range(&self, start: TextPosition, end: TextPosition) -> Option<Range<usize>> {
        let s = self.to_canonical(start)?;
        let e = self.to_canonical(end)?;
        if e < s {
            return None;
        }
        Some(s..e + 1)
    }

    /// Split a canonical range into per-block pieces in document order.
    ///
    /// Each piece is `(page, block, block_offsets)`.
    pub fn split_by_block(&self, range: Range<usize>) -> Vec<(usize, usize, Range<usize>)> {
        let mut pieces = Vec::new();
        if range.start >= range.end {
            return pieces;
        }
        let first = self.runs.partition_point(|&(start, _, _)| start <= range.start);
        for &(start, page, block) in &self.runs[first.saturating_sub(1)..] {
            if start >= range.end {
                break;
            }
            let len = self.block_lens[page][block];
            let lo = range.start.max(start);
            let hi = range.end.min(start + len);
            if lo < hi {
                pieces.push((page, block, lo - start..hi - start));
            }
        }
        pieces
    }
}
