//! Detected spans and their provenance.
//!
//! A [`Candidate`] lives in the canonical offset space: the newline-free
//! concatenation of every block's text, pages in order, blocks in order.
//! [`ResolvedSpan`] adds the line rectangles the span occupies on the page.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A character position addressed by page, block and offset inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextPosition {
    /// Page index (0-indexed)
    pub page: usize,
    /// Block index within the page
    pub block: usize,
    /// Character offset within the block
    pub offset: usize,
}

impl TextPosition {
    /// Create a new position.
    pub fn new(page: usize, block: usize, offset: usize) -> Self {
        Self {
            page,
            block,
            offset,
        }
    }
}

/// Provenance of a detected span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Found by the recognizer engine
    Auto,
    /// Found by a configured pattern
    Custom,
    /// Entered by the user
    Manual,
}

impl Origin {
    /// Lowercase name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Auto => "auto",
            Origin::Custom => "custom",
            Origin::Manual => "manual",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected span in canonical offsets, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// First character (canonical offset)
    pub start: usize,
    /// One past the last character (canonical offset)
    pub end: usize,
    /// Entity label, e.g. `PERSON`
    pub entity_type: String,
    /// The covered text
    pub text: String,
    /// Where the span came from
    pub origin: Origin,
    /// Declared priority; lower values win
    pub priority: Option<i32>,
}

impl Candidate {
    /// Create a candidate without a declared priority.
    pub fn new(
        start: usize,
        end: usize,
        entity_type: impl Into<String>,
        text: impl Into<String>,
        origin: Origin,
    ) -> Self {
        Self {
            start,
            end,
            entity_type: entity_type.into(),
            text: text.into(),
            origin,
            priority: None,
        }
    }

    /// Set the declared priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for a degenerate span.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when the two half-open ranges share at least one character.
    pub fn overlaps(&self, other: &Candidate) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely inside this span.
    pub fn contains(&self, other: &Candidate) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Shift the span by `base` characters.
    pub fn offset_by(mut self, base: usize) -> Self {
        self.start += base;
        self.end += base;
        self
    }
}

/// One line rectangle on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineRect {
    /// Page index (0-indexed)
    pub page: usize,
    /// Union of the line's character boxes
    pub rect: Rect,
}

/// A final, de-duplicated span with its page rectangles.
///
/// An empty `line_rects` means the span could not be positioned; renderers
/// skip it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSpan {
    /// The detected span
    pub candidate: Candidate,
    /// Line rectangles in document order
    pub line_rects: Vec<LineRect>,
}

impl ResolvedSpan {
    /// Pair a candidate with its rectangles.
    pub fn new(candidate: Candidate, line_rects: Vec<LineRect>) -> Self {
        Self {
            candidate,
            line_rects,
        }
    }

    /// True when the span has at least one rectangle.
    pub fn is_renderable(&self) -> bool {
        !self.line_rects.is_empty()
    }
}
