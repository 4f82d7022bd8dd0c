//! Candidate detection inside one chunk.
//!
//! Combines configured patterns ("additions"), the external recognizer and
//! exclusion patterns into the chunk's candidates, already shifted into
//! canonical offsets.
//!
//! ## Example
//!
//! ```
//! use pdf_pii::detection::{resolve_candidates, ExclusionSet, NullRecognizer, PatternRegistry, ResolverConfig};
//!
//! let mut registry = PatternRegistry::new();
//! registry.add_pattern("EMAIL", r"[\w.+-]+@[\w-]+\.[\w.]+");
//!
//! let found = resolve_candidates(
//!     "mail jane@example.org",
//!     40,
//!     &[],
//!     &registry,
//!     &ExclusionSet::new(),
//!     &NullRecognizer,
//!     &ResolverConfig::default(),
//! );
//! assert_eq!((found[0].start, found[0].end), (45, 61));
//! ```

mod char_map;
mod patterns;
mod recognizer;
mod refine;
mod resolver;

pub use patterns::{resolve_mark_span, select_by_priority, ExclusionSet, PatternRegistry, PatternSpec};
pub use recognizer::{NullRecognizer, Recognizer, RecognizerResult};
pub use refine::{default_rules, locate_in_window, RefineRule, Refined, Refiner};
pub use resolver::{resolve_candidates, CandidateResolver, ResolverConfig};
