//! Error types for the PII location pipeline.
//!
//! Only a handful of conditions surface as errors: compiling user-supplied
//! patterns, talking to the layout and recognizer collaborators, and reading
//! persisted documents. Everything else degrades to partial results.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while locating PII.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A user-supplied regular expression failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern source text
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Requested page does not exist
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange {
        /// Requested page (0-indexed)
        page: usize,
        /// Number of pages in the document
        page_count: usize,
    },

    /// The layout extraction collaborator failed
    #[error("Layout extraction failed: {0}")]
    Layout(String),

    /// The recognizer collaborator failed
    #[error("Recognizer failed: {0}")]
    Recognizer(String),

    /// Persisted document failed validation
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
