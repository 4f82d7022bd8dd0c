// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::wrong_self_convention)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF PII
//!
//! Locates personally-identifiable text in PDF page layouts and turns it into
//! page rectangles and a de-duplicated annotation list.
//!
//! Every stage agrees on one canonical offset space: the characters of every
//! text block concatenated in page order, then block order, with no
//! separators. Chunks, candidates and persisted detections all speak in these
//! offsets, so a span found in the middle of a long document maps back to the
//! exact characters (and boxes) it came from.
//!
//! ## Pipeline
//!
//! 1. [`index`]: character → page/block/offset/box table, plus reverse lookup
//! 2. [`chunking`]: tokenizer-safe chunks carrying their base offset
//! 3. [`detection`]: pattern additions, recognizer hits, refinement, exclusions
//! 4. [`dedup`]: policy-driven whole-document conflict resolution
//! 5. [`coords`]: span → line rectangles
//! 6. [`render`]: line rectangles → highlight/redaction instructions
//!
//! [`pipeline::PiiPipeline`] runs all of them; each stage is usable on its own.
//!
//! ## Quick Start
//!
//! ```
//! use pdf_pii::{ExclusionSet, NullRecognizer, PatternRegistry, PiiPipeline, PipelineConfig};
//! use pdf_pii::index::CharacterIndex;
//! use pdf_pii::layout::{LayoutBlock, PageLayout};
//!
//! let page = PageLayout::new(vec![
//!     LayoutBlock::from_lines(&[("Contact: jane@example.org", 72.0, 90.0)], 6.0, 12.0),
//! ]);
//! let config = PipelineConfig::default();
//! config.validate()?;
//! let index = CharacterIndex::from_pages(&[page], &config.index);
//!
//! let mut registry = PatternRegistry::new();
//! registry.add_pattern("EMAIL_ADDRESS", r"[\w.+-]+@[\w-]+\.[\w.]+");
//! let exclusions = ExclusionSet::new();
//!
//! let pipeline = PiiPipeline::new(&config, &NullRecognizer, &registry, &exclusions);
//! let spans = pipeline.analyze(&index);
//! let instructions = pipeline.annotate(&spans, &[]);
//!
//! assert_eq!(spans[0].candidate.text, "jane@example.org");
//! assert_eq!(instructions.len(), 1);
//! # Ok::<(), pdf_pii::Error>(())
//! ```
//!
//! ## Features
//!
//! - `parallel`: analyze chunks on the rayon thread pool
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Layout model and geometry
pub mod geometry;
pub mod layout;
pub mod span;

// Core stages
pub mod chunking;
pub mod coords;
pub mod dedup;
pub mod detection;
pub mod index;
pub mod render;

// Persistence
pub mod document;

// Configuration
pub mod config;

// Orchestration
pub mod pipeline;

// Re-exports
pub use chunking::{chunk, Chunk, ChunkerConfig, Delimiter, TextChunker};
pub use config::PipelineConfig;
pub use coords::{resolve_coordinates, CoordinateResolver, LineGroupingConfig};
pub use dedup::{deduplicate, DedupPolicy, OverlapMode, TieBreak};
pub use detection::{
    resolve_candidates, ExclusionSet, NullRecognizer, PatternRegistry, Recognizer, RecognizerResult,
};
pub use document::{apply_redactions, DetectionDocument};
pub use error::{Error, Result};
pub use index::{build_index, CharacterIndex, IndexConfig};
pub use pipeline::PiiPipeline;
pub use render::{render, AnnotationInstruction, RenderStyle};
pub use span::{Candidate, LineRect, Origin, ResolvedSpan, TextPosition};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Compare two floats without panicking on NaN.
    ///
    /// NaN values are equal to each other and greater than every number, so
    /// sorts stay total.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
