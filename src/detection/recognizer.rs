//! Seam to the named-entity recognizer.
//!
//! The recognizer is a black box: it receives one chunk's text plus the
//! enabled entity types and returns spans in chunk-local character offsets.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One recognizer hit, chunk-local, half-open, in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerResult {
    /// First character
    pub start: usize,
    /// One past the last character
    pub end: usize,
    /// Entity label
    pub entity_type: String,
    /// Confidence in `[0, 1]`
    pub score: f32,
}

impl RecognizerResult {
    /// Create a result.
    pub fn new(start: usize, end: usize, entity_type: impl Into<String>, score: f32) -> Self {
        Self {
            start,
            end,
            entity_type: entity_type.into(),
            score,
        }
    }
}

/// A named-entity recognizer.
pub trait Recognizer {
    /// Analyze `text` for the given entity types.
    fn analyze(&self, text: &str, entity_types: &[String]) -> Result<Vec<RecognizerResult>>;
}

impl<F> Recognizer for F
where
    F: Fn(&str, &[String]) -> Result<Vec<RecognizerResult>>,
{
    fn analyze(&self, text: &str, entity_types: &[String]) -> Result<Vec<RecognizerResult>> {
        self(text, entity_types)
    }
}

/// A recognizer that never finds anything; for pattern-only runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecognizer;

impl Recognizer for NullRecognizer {
    fn analyze(&self, _text: &str, _entity_types: &[String]) -> Result<Vec<RecognizerResult>> {
        Ok(Vec::new())
    }
}
