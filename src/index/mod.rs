//! Character index: the leaf of the pipeline.
//!
//! Maps every character of a document to its page, block, in-block offset and
//! bounding box, and back from page coordinates to characters.
//!
//! ## Example
//!
//! ```
//! use pdf_pii::index::{CharacterIndex, IndexConfig};
//! use pdf_pii::layout::{LayoutBlock, PageLayout};
//!
//! let page = PageLayout::new(vec![LayoutBlock::from_lines(&[("Jane Doe", 72.0, 90.0)], 6.0, 12.0)]);
//! let index = CharacterIndex::from_pages(&[page], &IndexConfig::default());
//!
//! assert_eq!(index.len(), 8);
//! assert_eq!(index.global_index(0, 0, 5), Some(5));
//! ```

mod char_index;
mod offsets;
mod spatial;

pub use char_index::{BlockInfo, CharPosition, CharacterIndex, IndexConfig};
pub use offsets::OffsetTable;
pub use spatial::SpatialGrid;

use crate::layout::LayoutSource;

/// Build the character index for a document.
pub fn build_index<L: LayoutSource + ?Sized>(source: &L, config: &IndexConfig) -> CharacterIndex {
    CharacterIndex::build(source, config)
}
