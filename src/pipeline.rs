//! End-to-end detection run.
//!
//! Scatter/gather: chunks are analyzed independently (in parallel with the
//! `parallel` feature), then all candidates are collected and reduced by one
//! sequential de-duplication pass before coordinates are resolved.
//!
//! Chunk analysis is atomic. Callers that need cancellation drive the stage
//! functions ([`crate::chunking::chunk`], [`crate::detection::resolve_candidates`],
//! [`crate::dedup::deduplicate`], ...) themselves and stop between chunks.

use crate::chunking::{Chunk, TextChunker};
use crate::config::PipelineConfig;
use crate::coords::{CoordinateResolver, CoordinateSource};
use crate::dedup::deduplicate;
use crate::detection::{CandidateResolver, ExclusionSet, PatternRegistry, Recognizer};
use crate::document::DetectionDocument;
use crate::index::CharacterIndex;
use crate::render::{render, AnnotationInstruction, ExistingAnnotation};
use crate::span::{Candidate, ResolvedSpan};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A configured detection pipeline.
///
/// # Example
///
/// ```
/// use pdf_pii::config::PipelineConfig;
/// use pdf_pii::detection::{ExclusionSet, NullRecognizer, PatternRegistry};
/// use pdf_pii::index::CharacterIndex;
/// use pdf_pii::layout::{LayoutBlock, PageLayout};
/// use pdf_pii::pipeline::PiiPipeline;
///
/// let page = PageLayout::new(vec![LayoutBlock::from_lines(&[("Member M1234", 72.0, 90.0)], 6.0, 12.0)]);
/// let config = PipelineConfig::default();
/// let index = CharacterIndex::from_pages(&[page], &config.index);
///
/// let mut registry = PatternRegistry::new();
/// registry.add_pattern("MEMBER_ID", r"M\d{4}");
/// let exclusions = ExclusionSet::new();
///
/// let pipeline = PiiPipeline::new(&config, &NullRecognizer, &registry, &exclusions);
/// let spans = pipeline.analyze(&index);
///
/// assert_eq!(spans.len(), 1);
/// assert_eq!(spans[0].candidate.text, "M1234");
/// assert_eq!(spans[0].line_rects.len(), 1);
/// ```
pub struct PiiPipeline<'a> {
    config: &'a PipelineConfig,
    recognizer: &'a (dyn Recognizer + Sync),
    registry: &'a PatternRegistry,
    exclusions: &'a ExclusionSet,
}

impl<'a> PiiPipeline<'a> {
    /// Assemble a pipeline. The config is expected to have passed
    /// [`PipelineConfig::validate`].
    pub fn new(
        config: &'a PipelineConfig,
        recognizer: &'a (dyn Recognizer + Sync),
        registry: &'a PatternRegistry,
        exclusions: &'a ExclusionSet,
    ) -> Self {
        Self {
            config,
            recognizer,
            registry,
            exclusions,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Detect spans in a page → block text array: chunk, resolve every chunk,
    /// then de-duplicate the whole document.
    pub fn detect_text(&self, blocks: &[Vec<String>]) -> Vec<Candidate> {
        let chunker = TextChunker::new(blocks, &self.config.chunker);
        let resolver = CandidateResolver::new(self.registry, self.exclusions, &self.config.resolver);

        let candidates: Vec<Candidate> = self
            .scatter(&resolver, chunker.chunks().collect())
            .into_iter()
            .flatten()
            .collect();

        log::debug!("{} candidates before de-duplication", candidates.len());
        deduplicate(candidates, &self.config.dedup)
    }

    #[cfg(not(feature = "parallel"))]
    fn scatter(&self, resolver: &CandidateResolver<'_>, chunks: Vec<Chunk>) -> Vec<Vec<Candidate>> {
        chunks
            .iter()
            .map(|chunk| resolver.resolve_chunk(self.recognizer, chunk, &self.config.entity_types))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn scatter(&self, resolver: &CandidateResolver<'_>, chunks: Vec<Chunk>) -> Vec<Vec<Candidate>> {
        chunks
            .par_iter()
            .map(|chunk| resolver.resolve_chunk(self.recognizer, chunk, &self.config.entity_types))
            .collect()
    }

    /// Detect and position spans in an indexed document.
    pub fn analyze(&self, index: &CharacterIndex) -> Vec<ResolvedSpan> {
        let candidates = self.detect_text(&index.block_texts());
        let resolver = CoordinateResolver::new(index, &self.config.line_grouping);
        let spans: Vec<ResolvedSpan> = candidates
            .into_iter()
            .map(|c| resolver.resolve_candidate(c))
            .collect();

        log::info!(
            "Found {} spans in {} pages ({} without coordinates)",
            spans.len(),
            index.page_count(),
            spans.iter().filter(|s| !s.is_renderable()).count()
        );
        spans
    }

    /// Detect spans in a persisted document.
    ///
    /// Stored detections take part in de-duplication next to the new ones.
    /// Coordinates come from `index` when it matches the stored text, and
    /// from the document's legacy coordinate cache otherwise.
    pub fn analyze_document(
        &self,
        document: &DetectionDocument,
        index: Option<&CharacterIndex>,
    ) -> Vec<ResolvedSpan> {
        let mut candidates = document.candidates();
        candidates.extend(self.detect_text(&document.text));
        let candidates = deduplicate(candidates, &self.config.dedup);

        let index = index.filter(|index| {
            let matches = index.block_texts() == document.text;
            if !matches {
                log::warn!("Character index does not match the document text; using stored coordinates");
            }
            matches
        });

        let offsets = document.offsets();
        let primary = index.map(|i| i as &dyn CoordinateSource);
        let fallback = document
            .offset2coords
            .as_ref()
            .map(|m| m as &dyn CoordinateSource);
        let resolver = CoordinateResolver::with_sources(&offsets, primary, fallback, &self.config.line_grouping);

        candidates
            .into_iter()
            .map(|c| resolver.resolve_candidate(c))
            .collect()
    }

    /// Annotation instructions for resolved spans.
    pub fn annotate(&self, spans: &[ResolvedSpan], existing: &[ExistingAnnotation]) -> Vec<AnnotationInstruction> {
        render(spans, &self.config.render, existing)
    }
}
