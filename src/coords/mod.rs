//! Span → line rectangles.
//!
//! A span is split into per-block pieces; the character boxes of each piece
//! are clustered into visual lines by vertical center, and every line becomes
//! the union of its members' boxes. Blocks without index entries fall back to
//! a persisted coordinate table.

mod legacy;

pub use legacy::{LegacyCoordinateMap, ReverseCoordinateMap, ReverseEntry};

use crate::geometry::Rect;
use crate::index::{CharacterIndex, OffsetTable};
use crate::span::{Candidate, LineRect, ResolvedSpan, TextPosition};
use crate::utils::safe_float_cmp;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Line clustering thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineGroupingConfig {
    /// Minimum vertical deviation (points) that starts a new line
    pub y_tolerance: f32,
    /// Fraction of the median character height used as threshold when larger
    pub height_ratio: f32,
}

impl Default for LineGroupingConfig {
    fn default() -> Self {
        Self {
            y_tolerance: 2.0,
            height_ratio: 0.5,
        }
    }
}

impl LineGroupingConfig {
    /// Create the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the y tolerance.
    pub fn with_y_tolerance(mut self, tolerance: f32) -> Self {
        self.y_tolerance = tolerance;
        self
    }

    /// Set the median height ratio.
    pub fn with_height_ratio(mut self, ratio: f32) -> Self {
        self.height_ratio = ratio;
        self
    }
}

/// Anything that can give the box of a character addressed by block offset.
pub trait CoordinateSource {
    /// Box of the character, if known.
    fn char_bbox(&self, page: usize, block: usize, offset: usize) -> Option<Rect>;
}

impl CoordinateSource for CharacterIndex {
    fn char_bbox(&self, page: usize, block: usize, offset: usize) -> Option<Rect> {
        self.at_position(TextPosition::new(page, block, offset))
            .and_then(|c| c.bbox)
    }
}

impl CoordinateSource for LegacyCoordinateMap {
    fn char_bbox(&self, page: usize, block: usize, offset: usize) -> Option<Rect> {
        self.bbox(page, block, offset)
    }
}

/// Cluster character boxes (given in document order) into line rectangles.
///
/// Boxes are visited by vertical center; a new line starts when a center
/// deviates from the running line's mean center by more than
/// `max(y_tolerance, median_height * height_ratio)`. Lines come back in the
/// document order of their first character.
pub fn group_lines(boxes: &[Rect], config: &LineGroupingConfig) -> Vec<Rect> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let mut heights: Vec<f32> = boxes.iter().map(|b| b.height.abs()).collect();
    heights.sort_by(|a, b| safe_float_cmp(*a, *b));
    let median = heights[heights.len() / 2];
    let threshold = config.y_tolerance.max(median * config.height_ratio);

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| safe_float_cmp(boxes[a].center().y, boxes[b].center().y).then(a.cmp(&b)));

    // (first doc index, union, sum of centers, member count)
    let mut lines: Vec<(usize, Rect, f32, usize)> = Vec::new();
    for idx in order {
        let bbox = boxes[idx];
        let cy = bbox.center().y;
        match lines.last_mut() {
            Some((first, union, sum, count)) if (cy - *sum / *count as f32).abs() <= threshold => {
                *first = (*first).min(idx);
                *union = union.union(&bbox);
                *sum += cy;
                *count += 1;
            },
            _ => lines.push((idx, bbox, cy, 1)),
        }
    }

    lines.sort_by_key(|(first, ..)| *first);
    lines.into_iter().map(|(_, rect, ..)| rect).collect()
}

/// Maps canonical spans to line rectangles.
pub struct CoordinateResolver<'a> {
    offsets: &'a OffsetTable,
    primary: Option<&'a dyn CoordinateSource>,
    fallback: Option<&'a dyn CoordinateSource>,
    config: LineGroupingConfig,
}

impl<'a> CoordinateResolver<'a> {
    /// Resolver backed by a character index.
    pub fn new(index: &'a CharacterIndex, config: &LineGroupingConfig) -> Self {
        Self {
            offsets: index.offsets(),
            primary: Some(index),
            fallback: None,
            config: *config,
        }
    }

    /// Resolver over an explicit offset table and coordinate sources.
    ///
    /// `fallback` is consulted for a block only when `primary` yields no box
    /// for any character of the requested piece.
    pub fn with_sources(
        offsets: &'a OffsetTable,
        primary: Option<&'a dyn CoordinateSource>,
        fallback: Option<&'a dyn CoordinateSource>,
        config: &LineGroupingConfig,
    ) -> Self {
        Self {
            offsets,
            primary,
            fallback,
            config: *config,
        }
    }

    /// Line rectangles for a span given by its first and last character.
    pub fn resolve(&self, start: TextPosition, end: TextPosition) -> Vec<LineRect> {
        match self.offsets.from_inclusive_range(start, end) {
            Some(range) => self.resolve_range(range),
            None => {
                log::warn!("Cannot position span {:?}..={:?}: outside the document", start, end);
                Vec::new()
            },
        }
    }

    /// Line rectangles for a half-open canonical range, in document order.
    pub fn resolve_range(&self, range: Range<usize>) -> Vec<LineRect> {
        let mut rects = Vec::new();
        for (page, block, piece) in self.offsets.split_by_block(range) {
            let mut boxes = self.collect(self.primary, page, block, piece.clone());
            if boxes.is_empty() {
                boxes = self.collect(self.fallback, page, block, piece);
            }
            rects.extend(
                group_lines(&boxes, &self.config)
                    .into_iter()
                    .map(|rect| LineRect { page, rect }),
            );
        }
        rects
    }

    fn collect(
        &self,
        source: Option<&dyn CoordinateSource>,
        page: usize,
        block: usize,
        piece: Range<usize>,
    ) -> Vec<Rect> {
        let Some(source) = source else {
            return Vec::new();
        };
        piece
            .filter_map(|offset| source.char_bbox(page, block, offset))
            .collect()
    }

    /// Attach line rectangles to a candidate.
    pub fn resolve_candidate(&self, candidate: Candidate) -> ResolvedSpan {
        let line_rects = self.resolve_range(candidate.start..candidate.end);
        if line_rects.is_empty() {
            log::warn!(
                "No coordinates for {} '{}' at [{}, {}); it will not be rendered",
                candidate.entity_type,
                candidate.text,
                candidate.start,
                candidate.end
            );
        }
        ResolvedSpan::new(candidate, line_rects)
    }
}

/// Line rectangles of one span using a character index.
pub fn resolve_coordinates(index: &CharacterIndex, span: &Candidate, config: &LineGroupingConfig) -> Vec<LineRect> {
    CoordinateResolver::new(index, config).resolve_range(span.start..span.end)
}
