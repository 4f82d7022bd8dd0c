//! Coordinate caches persisted alongside detection results.
//!
//! Older documents carry no layout, only an offset → box table and its
//! reverse. They are consulted when no [`CharacterIndex`] is available.

use crate::geometry::{euclidean_distance, Point, Rect};
use crate::index::CharacterIndex;
use crate::span::TextPosition;
use crate::utils::safe_float_cmp;
use serde::{Deserialize, Serialize};

/// Offset → box table: page → block → one `[x0, y0, x1, y1]` per character,
/// `null` where the character has no box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyCoordinateMap {
    pages: Vec<Vec<Vec<Option<[f32; 4]>>>>,
}

impl LegacyCoordinateMap {
    /// Wrap a raw table.
    pub fn new(pages: Vec<Vec<Vec<Option<[f32; 4]>>>>) -> Self {
        Self { pages }
    }

    /// Snapshot the boxes of an index.
    pub fn from_index(index: &CharacterIndex) -> Self {
        let pages = (0..index.page_count())
            .map(|page| {
                index
                    .blocks(page)
                    .unwrap_or_default()
                    .iter()
                    .map(|block| {
                        (0..block.char_count)
                            .map(|offset| {
                                index
                                    .at_position(TextPosition::new(page, block.block, offset))
                                    .and_then(|c| c.bbox)
                                    .map(|b| b.corners())
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self { pages }
    }

    /// Number of pages in the table.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Box of one character.
    pub fn bbox(&self, page: usize, block: usize, offset: usize) -> Option<Rect> {
        let corners = (*self.pages.get(page)?.get(block)?.get(offset)?)?;
        Some(Rect::from_corners(corners))
    }
}

/// One entry of the reverse table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverseEntry {
    /// `[x0, y0, x1, y1]`
    pub bbox: [f32; 4],
    /// Block on the page
    pub block: usize,
    /// Offset in the block
    pub offset: usize,
}

/// Box → offset table: page → entries, used for reverse lookup without an
/// index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReverseCoordinateMap {
    pages: Vec<Vec<ReverseEntry>>,
}

impl ReverseCoordinateMap {
    /// Wrap a raw table.
    pub fn new(pages: Vec<Vec<ReverseEntry>>) -> Self {
        Self { pages }
    }

    /// Build the reverse of an offset → box table.
    pub fn from_forward(forward: &LegacyCoordinateMap) -> Self {
        let pages = forward
            .pages
            .iter()
            .map(|blocks| {
                blocks
                    .iter()
                    .enumerate()
                    .flat_map(|(block, boxes)| {
                        boxes.iter().enumerate().filter_map(move |(offset, bbox)| {
                            bbox.map(|bbox| ReverseEntry { bbox, block, offset })
                        })
                    })
                    .collect()
            })
            .collect();
        Self { pages }
    }

    /// Position of the character under `point`: the smallest containing box,
    /// else the nearest center within `max_radius`.
    pub fn lookup(&self, page: usize, point: Point, max_radius: f32) -> Option<TextPosition> {
        let entries = self.pages.get(page)?;

        let contained = entries
            .iter()
            .map(|e| (e, Rect::from_corners(e.bbox)))
            .filter(|(_, r)| r.contains_point(&point))
            .min_by(|(_, a), (_, b)| safe_float_cmp(a.area(), b.area()));
        if let Some((entry, _)) = contained {
            return Some(TextPosition::new(page, entry.block, entry.offset));
        }

        entries
            .iter()
            .map(|e| (e, euclidean_distance(&point, &Rect::from_corners(e.bbox).center())))
            .filter(|(_, d)| *d <= max_radius)
            .min_by(|(_, a), (_, b)| safe_float_cmp(*a, *b))
            .map(|(entry, _)| TextPosition::new(page, entry.block, entry.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward() -> LegacyCoordinateMap {
        LegacyCoordinateMap::new(vec![vec![
            vec![Some([0.0, 0.0, 5.0, 10.0]), None, Some([10.0, 0.0, 15.0, 10.0])],
            vec![Some([0.0, 20.0, 5.0, 30.0])],
        ]])
    }

    #[test]
    fn test_forward_lookup() {
        let map = forward();
        assert_eq!(map.bbox(0, 0, 2), Some(Rect::from_points(10.0, 0.0, 15.0, 10.0)));
        assert_eq!(map.bbox(0, 0, 1), None);
        assert_eq!(map.bbox(0, 2, 0), None);
        assert_eq!(map.bbox(3, 0, 0), None);
    }

    #[test]
    fn test_reverse_lookup() {
        let reverse = ReverseCoordinateMap::from_forward(&forward());
        assert_eq!(reverse.lookup(0, Point::new(12.0, 5.0), 20.0), Some(TextPosition::new(0, 0, 2)));
        assert_eq!(reverse.lookup(0, Point::new(3.0, 33.0), 20.0), Some(TextPosition::new(0, 1, 0)));
        assert_eq!(reverse.lookup(0, Point::new(300.0, 300.0), 20.0), None);
        assert_eq!(reverse.lookup(1, Point::new(0.0, 0.0), 20.0), None);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&forward()).unwrap();
        assert!(json.starts_with("[[[[0.0,0.0,5.0,10.0],null"));
        let back: LegacyCoordinateMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, forward());
    }
}
