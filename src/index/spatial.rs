//! Uniform grid for coordinate → character lookups.

use crate::geometry::{Point, Rect};
use std::collections::HashMap;

type Cell = (i32, i32);

/// Most cells a single character box may occupy.
///
/// A glyph box this large only comes out of a broken font matrix; such
/// characters stay out of the grid.
pub const MAX_CELLS_PER_CHAR: u64 = 4096;

/// Per-page uniform grid of character indices.
///
/// A character is registered in every cell its bounding box overlaps.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    pages: Vec<HashMap<Cell, Vec<usize>>>,
}

/// Inclusive cell range covered by a box.
#[derive(Debug, Clone, Copy)]
struct CellSpan {
    min: Cell,
    max: Cell,
}

impl CellSpan {
    fn count(&self) -> u64 {
        let cols = (i64::from(self.max.0) - i64::from(self.min.0) + 1) as u64;
        let rows = (i64::from(self.max.1) - i64::from(self.min.1) + 1) as u64;
        cols.saturating_mul(rows)
    }

    fn contains(&self, cell: &Cell) -> bool {
        (self.min.0..=self.max.0).contains(&cell.0) && (self.min.1..=self.max.1).contains(&cell.1)
    }

    fn cells(self) -> impl Iterator<Item = Cell> {
        (self.min.0..=self.max.0).flat_map(move |cx| (self.min.1..=self.max.1).map(move |cy| (cx, cy)))
    }
}

impl SpatialGrid {
    /// Create an empty grid for `page_count` pages.
    pub fn new(cell_size: f32, page_count: usize) -> Self {
        Self {
            cell_size: if cell_size > 0.0 && cell_size.is_finite() { cell_size } else { 50.0 },
            pages: vec![HashMap::new(); page_count],
        }
    }

    /// Cell size in points.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, x: f32, y: f32) -> Cell {
        ((x / self.cell_size).floor() as i32, (y / self.cell_size).floor() as i32)
    }

    /// Cells covered by `rect`, whichever way its corners are ordered.
    /// `None` for boxes with a NaN or infinite edge.
    fn span_of(&self, rect: &Rect) -> Option<CellSpan> {
        if !rect.is_finite() {
            return None;
        }
        let rect = rect.normalized();
        Some(CellSpan {
            min: self.cell_of(rect.left(), rect.top()),
            max: self.cell_of(rect.right(), rect.bottom()),
        })
    }

    /// Register a character under every cell its box touches.
    ///
    /// Returns `false`, leaving the grid untouched, when the box is not
    /// finite or covers more than [`MAX_CELLS_PER_CHAR`] cells.
    pub fn insert(&mut self, page: usize, index: usize, bbox: &Rect) -> bool {
        let Some(span) = self.span_of(bbox).filter(|s| s.count() <= MAX_CELLS_PER_CHAR) else {
            return false;
        };
        if page >= self.pages.len() {
            self.pages.resize_with(page + 1, HashMap::new);
        }
        let grid = &mut self.pages[page];
        for cell in span.cells() {
            grid.entry(cell).or_default().push(index);
        }
        true
    }

    /// Characters registered in the cell containing `point`.
    pub fn at(&self, page: usize, point: &Point) -> &[usize] {
        if !(point.x.is_finite() && point.y.is_finite()) {
            return &[];
        }
        let cell = self.cell_of(point.x, point.y);
        self.pages
            .get(page)
            .and_then(|grid| grid.get(&cell))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Characters registered in any cell overlapped by `rect`, sorted and
    /// without duplicates.
    pub fn within(&self, page: usize, rect: &Rect) -> Vec<usize> {
        let (Some(grid), Some(span)) = (self.pages.get(page), self.span_of(rect)) else {
            return Vec::new();
        };
        let mut found: Vec<usize> = if span.count() > grid.len() as u64 {
            // walk occupied cells instead of every covered one
            grid.iter()
                .filter(|(cell, _)| span.contains(cell))
                .flat_map(|(_, chars)| chars.iter().copied())
                .collect()
        } else {
            span.cells()
                .filter_map(|cell| grid.get(&cell))
                .flatten()
                .copied()
                .collect()
        };
        found.sort_unstable();
        found.dedup();
        found
    }
}
