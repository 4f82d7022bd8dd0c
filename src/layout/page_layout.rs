//! Page layout tree supplied by the text extraction collaborator.
//!
//! Each page is a list of blocks, each block a list of lines, each line a list
//! of spans, and each span a list of characters with one bounding box apiece.
//! The shape mirrors the "rawdict" style output of common PDF extractors, so a
//! JSON dump of such output deserializes directly.

use crate::error::{Error, Result};
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// A single character with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutChar {
    /// The character itself
    #[serde(rename = "char")]
    pub c: char,
    /// Bounding box; `None` when the extractor could not place the glyph
    #[serde(default)]
    pub bbox: Option<Rect>,
}

impl LayoutChar {
    /// Create a positioned character.
    pub fn new(c: char, bbox: Rect) -> Self {
        Self { c, bbox: Some(bbox) }
    }

    /// Create a character without a bounding box.
    pub fn unplaced(c: char) -> Self {
        Self { c, bbox: None }
    }
}

/// A run of characters sharing font attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpan {
    /// Characters in reading order
    #[serde(default)]
    pub chars: Vec<LayoutChar>,
}

/// One visual line within a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutLine {
    /// Spans in reading order
    #[serde(default)]
    pub spans: Vec<LayoutSpan>,
}

/// A contiguous text block on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    /// Bounding box of the whole block
    pub bbox: Rect,
    /// Lines in reading order; empty for image blocks
    #[serde(default)]
    pub lines: Vec<LayoutLine>,
}

impl LayoutBlock {
    /// Iterate over every character of the block in reading order.
    pub fn chars(&self) -> impl Iterator<Item = &LayoutChar> {
        self.lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .flat_map(|span| span.chars.iter())
    }

    /// Build a block holding one line per entry of `lines`, each character
    /// given a fixed-pitch box starting at the line's origin.
    ///
    /// This is how tests and simple callers describe a page without running
    /// an extractor.
    pub fn from_lines(lines: &[(&str, f32, f32)], char_width: f32, char_height: f32) -> Self {
        let mut bbox: Option<Rect> = None;
        let layout_lines = lines
            .iter()
            .map(|(text, x, y)| {
                let chars: Vec<LayoutChar> = text
                    .chars()
                    .enumerate()
                    .map(|(i, c)| {
                        let rect = Rect::new(x + i as f32 * char_width, *y, char_width, char_height);
                        bbox = Some(match bbox {
                            Some(b) => b.union(&rect),
                            None => rect,
                        });
                        LayoutChar::new(c, rect)
                    })
                    .collect();
                LayoutLine {
                    spans: vec![LayoutSpan { chars }],
                }
            })
            .collect();

        Self {
            bbox: bbox.unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0)),
            lines: layout_lines,
        }
    }
}

/// Layout of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Blocks in reading order
    #[serde(default)]
    pub blocks: Vec<LayoutBlock>,
}

impl PageLayout {
    /// Create a page from its blocks.
    pub fn new(blocks: Vec<LayoutBlock>) -> Self {
        Self { blocks }
    }
}

/// Source of page layouts, typically backed by a PDF text extractor.
pub trait LayoutSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Layout of one page (0-indexed).
    fn page_layout(&self, page: usize) -> Result<PageLayout>;
}

/// Layouts already held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLayout {
    /// One entry per page
    pub pages: Vec<PageLayout>,
}

impl InMemoryLayout {
    /// Wrap a list of page layouts.
    pub fn new(pages: Vec<PageLayout>) -> Self {
        Self { pages }
    }

    /// Parse layouts from a JSON array of pages.
    pub fn from_json(json: &str) -> Result<Self> {
        let pages: Vec<PageLayout> = serde_json::from_str(json)?;
        Ok(Self { pages })
    }
}

impl LayoutSource for InMemoryLayout {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_layout(&self, page: usize) -> Result<PageLayout> {
        self.pages.get(page).cloned().ok_or(Error::PageOutOfRange {
            page,
            page_count: self.pages.len(),
        })
    }
}
