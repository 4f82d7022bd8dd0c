//! Per-chunk candidate resolution.
//!
//! Precedence is addition > exclusion > auto-detection:
//! 1. addition patterns claim text first, selected greedily by priority;
//! 2. recognizer hits overlapping an addition are dropped, the rest refined;
//! 3. exclusions remove recognizer survivors, never additions.
//!
//! Output candidates are re-offset into canonical space by the chunk's base
//! offset.

use super::char_map::CharMap;
use super::patterns::{is_enabled, select_by_priority, ExclusionSet, PatternRegistry};
use super::recognizer::{Recognizer, RecognizerResult};
use super::refine::{default_rules, locate_in_window, RefineRule, Refiner};
use crate::chunking::Chunk;
use crate::span::{Candidate, Origin};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options for candidate resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Recognizer hits scoring below this are dropped
    pub min_score: f32,
    /// Refinement rule per entity type
    pub refinements: IndexMap<String, RefineRule>,
    /// Rule for entity types without an entry
    pub default_refinement: RefineRule,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            refinements: default_rules(),
            default_refinement: RefineRule::TrimWhitespace,
        }
    }
}

impl ResolverConfig {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum recognizer score.
    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = score;
        self
    }

    /// Set or replace the refinement rule for one entity type.
    pub fn with_refinement(mut self, entity_type: impl Into<String>, rule: RefineRule) -> Self {
        self.refinements.insert(entity_type.into(), rule);
        self
    }
}

/// Resolves one chunk's candidates.
#[derive(Debug, Clone)]
pub struct CandidateResolver<'a> {
    registry: &'a PatternRegistry,
    exclusions: &'a ExclusionSet,
    refiner: Refiner,
    min_score: f32,
}

impl<'a> CandidateResolver<'a> {
    /// Create a resolver over a registry and exclusion set.
    pub fn new(registry: &'a PatternRegistry, exclusions: &'a ExclusionSet, config: &ResolverConfig) -> Self {
        Self {
            registry,
            exclusions,
            refiner: Refiner::new(&config.refinements, &config.default_refinement),
            min_score: config.min_score,
        }
    }

    /// Resolve a chunk produced by the chunker.
    pub fn resolve_chunk<R: Recognizer + ?Sized>(
        &self,
        recognizer: &R,
        chunk: &Chunk,
        entity_types: &[String],
    ) -> Vec<Candidate> {
        self.resolve(recognizer, &chunk.text, chunk.base_offset, entity_types)
    }

    /// Resolve `text`, whose first character sits at canonical `base_offset`.
    ///
    /// A recognizer failure is logged and yields no recognizer candidates
    /// for this chunk; additions are still returned.
    pub fn resolve<R: Recognizer + ?Sized>(
        &self,
        recognizer: &R,
        text: &str,
        base_offset: usize,
        entity_types: &[String],
    ) -> Vec<Candidate> {
        let additions = select_by_priority(self.registry.find_all(text, entity_types));

        let hits = match recognizer.analyze(text, entity_types) {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!(
                    "Recognizer failed on chunk at offset {} ({} chars): {}",
                    base_offset,
                    text.chars().count(),
                    e
                );
                Vec::new()
            },
        };

        let map = CharMap::new(text);
        let mut autos: Vec<Candidate> = hits
            .into_iter()
            .filter_map(|hit| self.accept_hit(hit, text, &map, base_offset, entity_types, &additions))
            .collect();

        if !self.exclusions.is_empty() {
            autos.retain(|c| {
                let excluded = self.exclusions.is_excluded(&c.text);
                if excluded {
                    log::debug!("Excluded '{}' ({}) at {}", c.text, c.entity_type, base_offset + c.start);
                }
                !excluded
            });
        }

        let mut candidates = additions;
        candidates.extend(autos);
        candidates.sort_by_key(|c| (c.start, c.end));
        candidates
            .into_iter()
            .map(|c| c.offset_by(base_offset))
            .collect()
    }

    /// Validate, filter and refine one recognizer hit (chunk-local offsets).
    fn accept_hit(
        &self,
        hit: RecognizerResult,
        text: &str,
        map: &CharMap,
        base_offset: usize,
        entity_types: &[String],
        additions: &[Candidate],
    ) -> Option<Candidate> {
        if hit.start >= hit.end || hit.end > map.char_len() {
            log::warn!(
                "Skipping recognizer hit {} [{}, {}) outside chunk at {} ({} chars)",
                hit.entity_type,
                hit.start,
                hit.end,
                base_offset,
                map.char_len()
            );
            return None;
        }
        if !is_enabled(entity_types, &hit.entity_type) {
            return None;
        }
        if hit.score < self.min_score {
            log::debug!("Dropping {} hit with score {:.2}", hit.entity_type, hit.score);
            return None;
        }

        let raw = Candidate::new(hit.start, hit.end, &hit.entity_type, "", Origin::Auto);
        if additions.iter().any(|a| a.overlaps(&raw)) {
            return None;
        }

        let window_start = map.to_byte(hit.start)?;
        let window_end = map.to_byte(hit.end)?;
        let window = &text[window_start..window_end];

        let Some(refined) = self.refiner.refine(&hit.entity_type, window) else {
            log::warn!(
                "Dropping {} hit '{}' at {}: nothing left after refinement",
                hit.entity_type,
                window,
                base_offset + hit.start
            );
            return None;
        };
        let range = locate_in_window(window, &refined.text, refined.hint)?;

        let start = map.to_char(window_start + range.start)?;
        let end = map.to_char(window_start + range.end)?;
        Some(Candidate::new(start, end, hit.entity_type, refined.text, Origin::Auto))
    }
}

/// Resolve one chunk's text in a single call.
pub fn resolve_candidates<R: Recognizer + ?Sized>(
    chunk_text: &str,
    base_offset: usize,
    entity_types: &[String],
    registry: &PatternRegistry,
    exclusions: &ExclusionSet,
    recognizer: &R,
    config: &ResolverConfig,
) -> Vec<Candidate> {
    CandidateResolver::new(registry, exclusions, config).resolve(recognizer, chunk_text, base_offset, entity_types)
}
