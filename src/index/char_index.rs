//! Character → bounding box index for one document.
//!
//! Built once from the layout collaborator's page trees and read-only
//! afterwards. The global index of a character is its canonical offset.

use super::offsets::OffsetTable;
use super::spatial::SpatialGrid;
use crate::geometry::{euclidean_distance, Point, Rect};
use crate::layout::{LayoutSource, PageLayout};
use crate::span::TextPosition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Options for building a [`CharacterIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Edge length of a spatial grid cell in points
    pub grid_cell_size: f32,
    /// Maximum centroid distance for the nearest-character fallback
    pub max_search_radius: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 50.0,
            max_search_radius: 20.0,
        }
    }
}

impl IndexConfig {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grid cell size.
    pub fn with_grid_cell_size(mut self, size: f32) -> Self {
        self.grid_cell_size = size;
        self
    }

    /// Set the reverse-lookup radius cap.
    pub fn with_max_search_radius(mut self, radius: f32) -> Self {
        self.max_search_radius = radius;
        self
    }
}

/// One indexed character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharPosition {
    /// Page index
    pub page: usize,
    /// Block index within the page
    pub block: usize,
    /// Offset within the block
    pub block_offset: usize,
    /// Glyph box, absent for characters the extractor could not place
    pub bbox: Option<Rect>,
    /// The character
    pub c: char,
}

/// One text block on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInfo {
    /// Page index
    pub page: usize,
    /// Block index within the page
    pub block: usize,
    /// Concatenated characters of the block
    pub text: String,
    /// Block bounding box
    pub bbox: Rect,
    /// Number of characters
    pub char_count: usize,
}

/// Per-document character index.
#[derive(Debug, Clone)]
pub struct CharacterIndex {
    chars: Vec<CharPosition>,
    pages: Vec<Vec<BlockInfo>>,
    block_map: HashMap<(usize, usize), Range<usize>>,
    offsets: OffsetTable,
    grid: SpatialGrid,
    config: IndexConfig,
}

impl CharacterIndex {
    /// Build the index for every page the source reports.
    ///
    /// A page whose layout cannot be extracted is logged and indexed as
    /// having no blocks, so the rest of the document stays usable.
    pub fn build<L: LayoutSource + ?Sized>(source: &L, config: &IndexConfig) -> Self {
        let pages: Vec<PageLayout> = (0..source.page_count())
            .map(|page| match source.page_layout(page) {
                Ok(layout) => layout,
                Err(e) => {
                    log::warn!("Skipping page {}: {}", page, e);
                    PageLayout::default()
                },
            })
            .collect();
        Self::from_pages(&pages, config)
    }

    /// Build the index from page layouts already in memory.
    pub fn from_pages(layouts: &[PageLayout], config: &IndexConfig) -> Self {
        let mut chars = Vec::new();
        let mut pages = Vec::with_capacity(layouts.len());
        let mut block_map = HashMap::new();
        let mut grid = SpatialGrid::new(config.grid_cell_size, layouts.len());
        let mut unplaced = 0usize;

        for (page, layout) in layouts.iter().enumerate() {
            let mut blocks = Vec::with_capacity(layout.blocks.len());
            for (block, layout_block) in layout.blocks.iter().enumerate() {
                let start = chars.len();
                let mut text = String::new();
                for (block_offset, ch) in layout_block.chars().enumerate() {
                    let global = chars.len();
                    match &ch.bbox {
                        Some(bbox) => {
                            if !grid.insert(page, global, bbox) {
                                log::warn!(
                                    "Character {:?} at page {} block {} offset {} has an unusable box {:?}; \
                                     left out of reverse lookup",
                                    ch.c,
                                    page,
                                    block,
                                    block_offset,
                                    bbox
                                );
                            }
                        },
                        None => unplaced += 1,
                    }
                    text.push(ch.c);
                    chars.push(CharPosition {
                        page,
                        block,
                        block_offset,
                        bbox: ch.bbox,
                        c: ch.c,
                    });
                }
                let end = chars.len();
                block_map.insert((page, block), start..end);
                blocks.push(BlockInfo {
                    page,
                    block,
                    text,
                    bbox: layout_block.bbox,
                    char_count: end - start,
                });
            }
            pages.push(blocks);
        }

        if unplaced > 0 {
            log::debug!("{} characters have no bounding box", unplaced);
        }

        let offsets = OffsetTable::from_lengths(
            pages
                .iter()
                .map(|blocks| blocks.iter().map(|b| b.char_count).collect())
                .collect(),
        );

        log::debug!(
            "Indexed {} characters across {} pages",
            chars.len(),
            pages.len()
        );

        Self {
            chars,
            pages,
            block_map,
            offsets,
            grid,
            config: config.clone(),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True when the document has no characters.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// All characters in canonical order.
    pub fn chars(&self) -> &[CharPosition] {
        &self.chars
    }

    /// Blocks on a page.
    pub fn blocks(&self, page: usize) -> Option<&[BlockInfo]> {
        self.pages.get(page).map(Vec::as_slice)
    }

    /// One block.
    pub fn block(&self, page: usize, block: usize) -> Option<&BlockInfo> {
        self.pages.get(page)?.get(block)
    }

    /// Canonical offset bookkeeping for this document.
    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Global index of the character at `offset` inside a block.
    pub fn global_index(&self, page: usize, block: usize, offset: usize) -> Option<usize> {
        let range = self.block_map.get(&(page, block))?;
        let global = range.start.checked_add(offset)?;
        if global < range.end {
            Some(global)
        } else {
            None
        }
    }

    /// Character at a global index.
    pub fn get(&self, global: usize) -> Option<&CharPosition> {
        self.chars.get(global)
    }

    /// Character at a page/block/offset position.
    pub fn at_position(&self, pos: TextPosition) -> Option<&CharPosition> {
        self.global_index(pos.page, pos.block, pos.offset)
            .and_then(|g| self.chars.get(g))
    }

    /// The page → block → text array that chunking consumes.
    pub fn block_texts(&self) -> Vec<Vec<String>> {
        self.pages
            .iter()
            .map(|blocks| blocks.iter().map(|b| b.text.clone()).collect())
            .collect()
    }

    /// Canonical substring `[start, end)`, or `None` when out of range.
    pub fn text_of(&self, start: usize, end: usize) -> Option<String> {
        if start > end || end > self.chars.len() {
            return None;
        }
        Some(self.chars[start..end].iter().map(|c| c.c).collect())
    }

    /// Reverse lookup: the character under `point` on `page`.
    ///
    /// Exact containment wins (the smallest containing box, first in document
    /// order on ties). Otherwise the character with the nearest box center
    /// within the configured radius is returned; beyond it, `None`.
    pub fn char_at(&self, page: usize, point: Point) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for &idx in self.grid.at(page, &point) {
            let Some(bbox) = self.chars[idx].bbox.map(|b| b.normalized()) else {
                continue;
            };
            if bbox.contains_point(&point) {
                let area = bbox.area();
                if best.map_or(true, |(_, a)| area < a) {
                    best = Some((idx, area));
                }
            }
        }
        if let Some((idx, _)) = best {
            return Some(idx);
        }

        let radius = self.config.max_search_radius;
        if radius <= 0.0 {
            return None;
        }
        let search = Rect::new(point.x - radius, point.y - radius, radius * 2.0, radius * 2.0);
        let mut nearest: Option<(usize, f32)> = None;
        for idx in self.grid.within(page, &search) {
            let Some(bbox) = self.chars[idx].bbox else {
                continue;
            };
            let distance = euclidean_distance(&point, &bbox.center());
            if distance <= radius && nearest.map_or(true, |(_, d)| distance < d) {
                nearest = Some((idx, distance));
            }
        }
        nearest.map(|(idx, _)| idx)
    }

    /// Global indices of characters whose boxes intersect `rect` on `page`,
    /// in canonical order.
    pub fn chars_in_rect(&self, page: usize, rect: &Rect) -> Vec<usize> {
        let rect = rect.normalized();
        self.grid
            .within(page, &rect)
            .into_iter()
            .filter(|&idx| self.chars[idx].bbox.is_some_and(|b| b.normalized().intersects(&rect)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{InMemoryLayout, LayoutBlock, LayoutChar, LayoutLine, LayoutSpan};

    fn two_block_page() -> PageLayout {
        PageLayout::new(vec![
            LayoutBlock::from_lines(&[("Hello", 10.0, 10.0)], 6.0, 12.0),
            LayoutBlock::from_lines(&[("World", 10.0, 40.0)], 6.0, 12.0),
        ])
    }

    #[test]
    fn test_offsets_are_contiguous_across_blocks_and_pages() {
        let index = CharacterIndex::from_pages(
            &[two_block_page(), two_block_page()],
            &IndexConfig::default(),
        );
        assert_eq!(index.len(), 20);
        assert_eq!(index.global_index(0, 1, 0), Some(5));
        assert_eq!(index.global_index(1, 0, 4), Some(14));
        assert_eq!(index.global_index(1, 0, 5), None);
        assert_eq!(index.global_index(2, 0, 0), None);

        let pos = index.get(14).unwrap();
        assert_eq!((pos.page, pos.block, pos.block_offset, pos.c), (1, 0, 4, 'o'));
    }

    #[test]
    fn test_block_texts_and_text_of() {
        let index = CharacterIndex::from_pages(&[two_block_page()], &IndexConfig::default());
        assert_eq!(index.block_texts(), vec![vec!["Hello".to_string(), "World".to_string()]]);
        assert_eq!(index.text_of(3, 7), Some("loWo".to_string()));
        assert_eq!(index.text_of(3, 11), None);
        assert_eq!(index.block(0, 1).unwrap().char_count, 5);
    }

    #[test]
    fn test_unplaced_chars_are_indexed_without_bbox() {
        let block = LayoutBlock {
            bbox: Rect::new(0.0, 0.0, 20.0, 10.0),
            lines: vec![LayoutLine {
                spans: vec![LayoutSpan {
                    chars: vec![
                        LayoutChar::new('a', Rect::new(0.0, 0.0, 5.0, 10.0)),
                        LayoutChar::unplaced('\u{200b}'),
                    ],
                }],
            }],
        };
        let index = CharacterIndex::from_pages(&[PageLayout::new(vec![block])], &IndexConfig::default());
        assert_eq!(index.len(), 2);
        assert!(index.get(1).unwrap().bbox.is_none());
        assert_eq!(index.char_at(0, Point::new(2.0, 5.0)), Some(0));
    }

    #[test]
    fn test_oversized_box_is_kept_out_of_the_grid() {
        let json = r#"[{"blocks":[{"bbox":{"x":0,"y":0,"width":400000,"height":400000},
            "lines":[{"spans":[{"chars":[
                {"char":"A","bbox":{"x":0,"y":0,"width":400000,"height":400000}},
                {"char":"b","bbox":{"x":10,"y":10,"width":5,"height":10}}]}]}]}]}]"#;
        let layout = InMemoryLayout::from_json(json).unwrap();
        let index = CharacterIndex::build(&layout, &IndexConfig::default());

        assert_eq!(index.len(), 2);
        assert_eq!(index.text_of(0, 2).as_deref(), Some("Ab"));
        assert_eq!(index.get(0).unwrap().bbox, Some(Rect::new(0.0, 0.0, 400_000.0, 400_000.0)));
        assert_eq!(index.char_at(0, Point::new(12.0, 15.0)), Some(1));
        assert_eq!(index.char_at(0, Point::new(1000.0, 1000.0)), None);
    }

    #[test]
    fn test_non_finite_boxes_are_kept_out_of_the_grid() {
        let nan = Rect::new(f32::NAN, 0.0, 5.0, 10.0);
        let inf = Rect::new(0.0, 0.0, f32::INFINITY, f32::NEG_INFINITY);
        let block = LayoutBlock {
            bbox: Rect::new(0.0, 0.0, 20.0, 10.0),
            lines: vec![LayoutLine {
                spans: vec![LayoutSpan {
                    chars: vec![
                        LayoutChar::new('x', nan),
                        LayoutChar::new('y', inf),
                        LayoutChar::new('z', Rect::new(10.0, 0.0, 5.0, 10.0)),
                    ],
                }],
            }],
        };
        let index = CharacterIndex::from_pages(&[PageLayout::new(vec![block])], &IndexConfig::default());

        assert_eq!(index.len(), 3);
        assert_eq!(index.text_of(0, 3).as_deref(), Some("xyz"));
        assert!(index.get(0).unwrap().bbox.is_some_and(|b| b.x.is_nan()));
        assert_eq!(index.get(1).unwrap().bbox, Some(inf));
        assert_eq!(index.char_at(0, Point::new(12.0, 5.0)), Some(2));
        assert_eq!(index.chars_in_rect(0, &Rect::new(0.0, 0.0, 20.0, 10.0)), vec![2]);
    }

    #[test]
    fn test_flipped_box_is_found_by_reverse_lookup() {
        let block = LayoutBlock {
            bbox: Rect::new(60.0, 100.0, 6.0, 12.0),
            lines: vec![LayoutLine {
                spans: vec![LayoutSpan {
                    chars: vec![LayoutChar::new('q', Rect::new(60.0, 112.0, 6.0, -12.0))],
                }],
            }],
        };
        let index = CharacterIndex::from_pages(&[PageLayout::new(vec![block])], &IndexConfig::default());

        assert_eq!(index.char_at(0, Point::new(63.0, 105.0)), Some(0));
        assert_eq!(index.chars_in_rect(0, &Rect::new(61.0, 101.0, 2.0, 2.0)), vec![0]);
    }

    #[test]
    fn test_reverse_lookup_exact_then_nearest() {
        let index = CharacterIndex::from_pages(&[two_block_page()], &IndexConfig::default());
        // inside 'e' of "Hello" (x 16..22)
        assert_eq!(index.char_at(0, Point::new(18.0, 15.0)), Some(1));
        // just right of "Hello", within radius of 'o' center (37, 16)
        assert_eq!(index.char_at(0, Point::new(45.0, 16.0)), Some(4));
        // far away
        assert_eq!(index.char_at(0, Point::new(400.0, 400.0)), None);
        // unknown page
        assert_eq!(index.char_at(9, Point::new(18.0, 15.0)), None);
    }

    #[test]
    fn test_chars_in_rect() {
        let index = CharacterIndex::from_pages(&[two_block_page()], &IndexConfig::default());
        let hits = index.chars_in_rect(0, &Rect::new(9.0, 9.0, 13.0, 5.0));
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_build_skips_failing_page() {
        struct Flaky(InMemoryLayout);
        impl LayoutSource for Flaky {
            fn page_count(&self) -> usize {
                2
            }
            fn page_layout(&self, page: usize) -> crate::error::Result<PageLayout> {
                if page == 0 {
                    Err(crate::error::Error::Layout("broken content stream".into()))
                } else {
                    self.0.page_layout(0)
                }
            }
        }
        let source = Flaky(InMemoryLayout::new(vec![two_block_page()]));
        let index = CharacterIndex::build(&source, &IndexConfig::default());
        assert_eq!(index.page_count(), 2);
        assert_eq!(index.blocks(0).map(|b| b.len()), Some(0));
        assert_eq!(index.global_index(1, 0, 0), Some(0));
    }
}
