//! Whole-document de-duplication of candidate spans.
//!
//! Two spans conflict according to the policy's [`OverlapMode`]. Among
//! conflicting spans a single winner is chosen by walking the tie-break
//! criteria in order until one of them prefers a span strictly. When every
//! criterion ties (including an empty tie-break list) the span seen first in
//! the input wins, so results are reproducible for identical input order.
//!
//! The output is pairwise non-conflicting, which makes [`deduplicate`]
//! idempotent.

use crate::span::{Candidate, Origin};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// When two spans conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapMode {
    /// Identical ranges only
    Exact,
    /// One range encloses the other; the enclosing span is kept
    Contain,
    /// Any shared character
    Overlap,
}

/// One tie-break criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Rank by the policy's origin priority
    Origin,
    /// Lower declared priority wins; spans without one rank after those with one
    Priority,
    /// Prefer longer or shorter spans
    Length,
    /// Prefer earlier or later starts
    Position,
    /// Rank by the policy's entity priority
    Entity,
}

/// Length preference for [`TieBreak::Length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthPreference {
    /// Longer span wins
    Long,
    /// Shorter span wins
    Short,
}

/// Position preference for [`TieBreak::Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionPreference {
    /// Earlier start wins
    First,
    /// Later start wins
    Last,
}

/// De-duplication policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupPolicy {
    /// Conflict test
    pub overlap_mode: OverlapMode,
    /// Origins from most to least preferred; unlisted origins rank last
    pub origin_priority: Vec<Origin>,
    /// Entity types from most to least preferred; unlisted rank last
    pub entity_priority: Option<Vec<String>>,
    /// Criteria evaluated in order
    pub tie_break: Vec<TieBreak>,
    /// Used by [`TieBreak::Length`]
    pub length_pref: LengthPreference,
    /// Used by [`TieBreak::Position`]
    pub position_pref: PositionPreference,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            overlap_mode: OverlapMode::Overlap,
            origin_priority: vec![Origin::Manual, Origin::Custom, Origin::Auto],
            entity_priority: None,
            tie_break: vec![
                TieBreak::Origin,
                TieBreak::Priority,
                TieBreak::Length,
                TieBreak::Position,
                TieBreak::Entity,
            ],
            length_pref: LengthPreference::Long,
            position_pref: PositionPreference::First,
        }
    }
}

impl DedupPolicy {
    /// Create the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the conflict test.
    pub fn with_overlap_mode(mut self, mode: OverlapMode) -> Self {
        self.overlap_mode = mode;
        self
    }

    /// Set the origin ranking.
    pub fn with_origin_priority(mut self, origins: Vec<Origin>) -> Self {
        self.origin_priority = origins;
        self
    }

    /// Set the entity ranking.
    pub fn with_entity_priority(mut self, entities: Vec<String>) -> Self {
        self.entity_priority = Some(entities);
        self
    }

    /// Set the tie-break criteria.
    pub fn with_tie_break(mut self, criteria: Vec<TieBreak>) -> Self {
        self.tie_break = criteria;
        self
    }

    /// Set the length preference.
    pub fn with_length_pref(mut self, pref: LengthPreference) -> Self {
        self.length_pref = pref;
        self
    }

    /// Set the position preference.
    pub fn with_position_pref(mut self, pref: PositionPreference) -> Self {
        self.position_pref = pref;
        self
    }
}

/// Applies a [`DedupPolicy`] to a document's candidates.
#[derive(Debug, Clone)]
pub struct SpanDeduplicator<'a> {
    policy: &'a DedupPolicy,
}

impl<'a> SpanDeduplicator<'a> {
    /// Create a deduplicator for `policy`.
    pub fn new(policy: &'a DedupPolicy) -> Self {
        Self { policy }
    }

    fn origin_rank(&self, origin: Origin) -> usize {
        self.policy
            .origin_priority
            .iter()
            .position(|o| *o == origin)
            .unwrap_or(self.policy.origin_priority.len())
    }

    fn entity_rank(&self, entity: &str) -> Option<usize> {
        self.policy
            .entity_priority
            .as_ref()
            .map(|list| list.iter().position(|e| e == entity).unwrap_or(list.len()))
    }

    /// Order two spans by preference. `Less` means `a` wins.
    ///
    /// Declared priorities only count through [`TieBreak::Priority`], which
    /// the default policy evaluates right after origin: between two spans of
    /// the same origin the lower declared value wins whatever their length or
    /// input order. `Equal` when every criterion ties; callers fall back to
    /// input order.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        for criterion in &self.policy.tie_break {
            let ord = match criterion {
                TieBreak::Origin => self.origin_rank(a.origin).cmp(&self.origin_rank(b.origin)),
                TieBreak::Priority => priority_rank(a).cmp(&priority_rank(b)),
                TieBreak::Length => match self.policy.length_pref {
                    LengthPreference::Long => b.len().cmp(&a.len()),
                    LengthPreference::Short => a.len().cmp(&b.len()),
                },
                TieBreak::Position => match self.policy.position_pref {
                    PositionPreference::First => a.start.cmp(&b.start),
                    PositionPreference::Last => b.start.cmp(&a.start),
                },
                TieBreak::Entity => self.entity_rank(&a.entity_type).cmp(&self.entity_rank(&b.entity_type)),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Resolve conflicts and return the surviving spans ordered by position.
    pub fn deduplicate(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| {
                if c.is_empty() {
                    log::warn!("Dropping empty span '{}' at {}", c.text, c.start);
                }
                !c.is_empty()
            })
            .collect();

        let keep = match self.policy.overlap_mode {
            OverlapMode::Exact => self.best_per_range(&candidates, |_| true),
            OverlapMode::Contain => {
                let contained = strictly_contained_ranges(&candidates);
                self.best_per_range(&candidates, |c| !contained.contains(&(c.start, c.end)))
            },
            OverlapMode::Overlap => self.greedy_disjoint(&candidates),
        };

        let before = candidates.len();
        let mut survivors: Vec<(usize, Candidate)> = candidates
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep[*i])
            .collect();
        survivors.sort_by_key(|(i, c)| (c.start, c.end, *i));

        log::debug!(
            "De-duplicated {} spans to {} ({:?})",
            before,
            survivors.len(),
            self.policy.overlap_mode
        );
        survivors.into_iter().map(|(_, c)| c).collect()
    }

    /// Keep one winner per identical range among spans passing `eligible`.
    fn best_per_range(&self, candidates: &[Candidate], eligible: impl Fn(&Candidate) -> bool) -> Vec<bool> {
        let mut winners: HashMap<(usize, usize), usize> = HashMap::new();
        for (i, c) in candidates.iter().enumerate() {
            if !eligible(c) {
                continue;
            }
            winners
                .entry((c.start, c.end))
                .and_modify(|w| {
                    if self.compare(c, &candidates[*w]) == Ordering::Less {
                        *w = i;
                    }
                })
                .or_insert(i);
        }
        let mut keep = vec![false; candidates.len()];
        for &i in winners.values() {
            keep[i] = true;
        }
        keep
    }

    /// Best-first greedy: accept a span unless it overlaps one already kept.
    fn greedy_disjoint(&self, candidates: &[Candidate]) -> Vec<bool> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| self.compare(&candidates[a], &candidates[b]).then(a.cmp(&b)));

        // start -> end of accepted, pairwise disjoint spans
        let mut accepted: BTreeMap<usize, usize> = BTreeMap::new();
        let mut keep = vec![false; candidates.len()];
        for i in order {
            let c = &candidates[i];
            let blocked = accepted
                .range(..c.end)
                .next_back()
                .is_some_and(|(_, &end)| end > c.start);
            if blocked {
                continue;
            }
            accepted.insert(c.start, c.end);
            keep[i] = true;
        }
        keep
    }
}

/// `(false, p)` sorts declared priorities ahead of undeclared ones.
fn priority_rank(c: &Candidate) -> (bool, i32) {
    match c.priority {
        Some(p) => (false, p),
        None => (true, 0),
    }
}

/// Ranges strictly enclosed by another, different range.
fn strictly_contained_ranges(candidates: &[Candidate]) -> HashSet<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = candidates.iter().map(|c| (c.start, c.end)).collect();
    ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    ranges.dedup();

    let mut contained = HashSet::new();
    let mut max_end: Option<usize> = None;
    for (start, end) in ranges {
        if max_end.is_some_and(|m| m >= end) {
            contained.insert((start, end));
        }
        max_end = Some(max_end.map_or(end, |m| m.max(end)));
    }
    contained
}

/// De-duplicate a document's candidates under `policy`.
pub fn deduplicate(candidates: Vec<Candidate>, policy: &DedupPolicy) -> Vec<Candidate> {
    SpanDeduplicator::new(policy).deduplicate(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, entity: &str, origin: Origin) -> Candidate {
        Candidate::new(start, end, entity, "x".repeat(end - start), origin)
    }

    #[test]
    fn test_contain_keeps_enclosing_span_regardless_of_tie_break() {
        let policy = DedupPolicy::new()
            .with_overlap_mode(OverlapMode::Contain)
            .with_tie_break(vec![TieBreak::Length])
            .with_length_pref(LengthPreference::Short);
        let out = deduplicate(
            vec![span(2, 5, "A", Origin::Manual), span(0, 10, "B", Origin::Auto)],
            &policy,
        );
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].start, out[0].end), (0, 10));
    }

    #[test]
    fn test_contain_ignores_partial_overlap() {
        let policy = DedupPolicy::new().with_overlap_mode(OverlapMode::Contain);
        let out = deduplicate(vec![span(0, 5, "A", Origin::Auto), span(3, 8, "B", Origin::Auto)], &policy);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_exact_only_merges_identical_ranges() {
        let policy = DedupPolicy::new().with_overlap_mode(OverlapMode::Exact);
        let out = deduplicate(
            vec![
                span(0, 4, "PERSON", Origin::Auto),
                span(0, 4, "PERSON", Origin::Custom),
                span(1, 4, "PERSON", Origin::Auto),
            ],
            &policy,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].origin, Origin::Custom);
        assert_eq!(out[1].start, 1);
    }

    #[test]
    fn test_overlap_origin_then_length() {
        let policy = DedupPolicy::default();
        let out = deduplicate(
            vec![
                span(0, 8, "ADDRESS", Origin::Auto),
                span(6, 9, "PERSON", Origin::Manual),
                span(10, 20, "ORG", Origin::Auto),
                span(12, 14, "ORG", Origin::Auto),
            ],
            &policy,
        );
        let kept: Vec<(usize, usize)> = out.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(kept, vec![(6, 9), (10, 20)]);
    }

    #[test]
    fn test_position_and_entity_preferences() {
        let by_last = DedupPolicy::new()
            .with_tie_break(vec![TieBreak::Position])
            .with_position_pref(PositionPreference::Last);
        let out = deduplicate(vec![span(0, 4, "A", Origin::Auto), span(2, 6, "B", Origin::Auto)], &by_last);
        assert_eq!(out[0].entity_type, "B");

        let by_entity = DedupPolicy::new()
            .with_tie_break(vec![TieBreak::Entity])
            .with_entity_priority(vec!["EMAIL".into(), "URL".into()]);
        let out = deduplicate(
            vec![
                span(0, 4, "PERSON", Origin::Auto),
                span(0, 4, "URL", Origin::Auto),
                span(0, 4, "EMAIL", Origin::Auto),
            ],
            &by_entity,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity_type, "EMAIL");
    }

    #[test]
    fn test_declared_priority_beats_length_and_order() {
        let low = span(0, 5, "A", Origin::Custom).with_priority(1);
        let high = span(3, 8, "B", Origin::Custom).with_priority(0);
        let longer_low = span(0, 12, "C", Origin::Custom).with_priority(1);

        for input in [vec![low.clone(), high.clone()], vec![high.clone(), low.clone()]] {
            assert_eq!(deduplicate(input, &DedupPolicy::default()), vec![high.clone()]);
        }
        assert_eq!(deduplicate(vec![longer_low, high.clone()], &DedupPolicy::default()), vec![high.clone()]);

        let unranked = span(2, 4, "D", Origin::Custom);
        let policy = DedupPolicy::default();
        let deduplicator = SpanDeduplicator::new(&policy);
        assert_eq!(deduplicator.compare(&high, &unranked), Ordering::Less);
        // origin still decides first
        let manual = span(2, 4, "E", Origin::Manual);
        assert_eq!(deduplicator.compare(&manual, &high), Ordering::Less);
    }

    #[test]
    fn test_policy_reads_priority_criterion() {
        let policy: DedupPolicy = serde_json::from_str(r#"{"tie_break":["priority","length"]}"#).unwrap();
        assert_eq!(policy.tie_break, vec![TieBreak::Priority, TieBreak::Length]);
    }

    #[test]
    fn test_full_tie_first_seen_wins() {
        let policy = DedupPolicy::new().with_tie_break(Vec::new());
        let out = deduplicate(vec![span(3, 6, "B", Origin::Auto), span(0, 5, "A", Origin::Auto)], &policy);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity_type, "B");
    }

    #[test]
    fn test_empty_spans_are_dropped() {
        let out = deduplicate(vec![span(4, 4, "A", Origin::Auto)], &DedupPolicy::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let policy = DedupPolicy::default();
        let input = vec![
            span(0, 3, "A", Origin::Auto),
            span(2, 7, "B", Origin::Custom),
            span(5, 9, "C", Origin::Auto),
            span(8, 12, "D", Origin::Manual),
        ];
        let once = deduplicate(input, &policy);
        let twice = deduplicate(once.clone(), &policy);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_policy_serde_defaults() {
        let policy: DedupPolicy = serde_json::from_str(r#"{"overlap_mode":"contain"}"#).unwrap();
        assert_eq!(policy.overlap_mode, OverlapMode::Contain);
        assert_eq!(policy.origin_priority, vec![Origin::Manual, Origin::Custom, Origin::Auto]);
    }
}
