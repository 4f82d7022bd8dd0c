//! User and configuration patterns ("additions") and exclusions.
//!
//! Additions always own the text they claim: the recognizer's results are
//! discarded wherever they overlap an addition, and exclusions are never
//! applied to additions.

use super::char_map::CharMap;
use crate::error::{Error, Result};
use crate::span::{Candidate, Origin};
use indexmap::IndexMap;
use regex::{Captures, Regex, RegexBuilder};
use std::ops::Range;

/// One compiled addition pattern.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    /// Entity label assigned to matches
    pub entity_type: String,
    /// Source text of the pattern
    pub source: String,
    /// Compiled expression
    pub regex: Regex,
    /// `Custom` for configured regexes, `Manual` for user-entered words
    pub origin: Origin,
}

/// Ordered registry of `entity type → patterns`.
///
/// The entry registered first has the highest priority: each pattern's
/// declared priority is its position in registration order, 0 first.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    entries: IndexMap<String, Vec<PatternSpec>>,
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

impl PatternRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered `entity → [regex]` map, skipping bad patterns.
    pub fn from_map(map: &IndexMap<String, Vec<String>>) -> Self {
        let mut registry = Self::new();
        for (entity, patterns) in map {
            for pattern in patterns {
                registry.add_pattern(entity, pattern);
            }
        }
        registry
    }

    /// Register a configured regex, returning the compile error if any.
    pub fn try_add_pattern(&mut self, entity_type: &str, pattern: &str) -> Result<()> {
        let regex = compile(pattern)?;
        self.push(entity_type, pattern, regex, Origin::Custom);
        Ok(())
    }

    /// Register a configured regex; a malformed pattern is logged and skipped.
    pub fn add_pattern(&mut self, entity_type: &str, pattern: &str) -> &mut Self {
        if let Err(e) = self.try_add_pattern(entity_type, pattern) {
            log::warn!("Skipping pattern for {}: {}", entity_type, e);
        }
        self
    }

    /// Register a user-entered word, matched literally.
    pub fn add_literal(&mut self, entity_type: &str, word: &str) -> &mut Self {
        if word.is_empty() {
            log::warn!("Skipping empty manual word for {}", entity_type);
            return self;
        }
        match compile(&regex::escape(word)) {
            Ok(regex) => self.push(entity_type, word, regex, Origin::Manual),
            Err(e) => log::warn!("Skipping manual word for {}: {}", entity_type, e),
        }
        self
    }

    fn push(&mut self, entity_type: &str, source: &str, regex: Regex, origin: Origin) {
        self.entries
            .entry(entity_type.to_string())
            .or_default()
            .push(PatternSpec {
                entity_type: entity_type.to_string(),
                source: source.to_string(),
                regex,
                origin,
            });
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Patterns with their declared priority, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &PatternSpec)> {
        self.entries
            .values()
            .flatten()
            .enumerate()
            .map(|(i, spec)| (i32::try_from(i).unwrap_or(i32::MAX), spec))
    }

    /// Raw matches of every pattern whose entity is enabled, in chunk-local
    /// character offsets, before priority selection.
    ///
    /// Patterns are evaluated from the last registered to the first; the
    /// order only matters for logging since selection sorts by priority.
    pub fn find_all(&self, text: &str, enabled: &[String]) -> Vec<Candidate> {
        let map = CharMap::new(text);
        let specs: Vec<(i32, &PatternSpec)> = self.iter().collect();
        let mut found = Vec::new();

        for &(priority, spec) in specs.iter().rev() {
            if !is_enabled(enabled, &spec.entity_type) {
                continue;
            }
            for caps in spec.regex.captures_iter(text) {
                let Some(mark) = resolve_mark_span(&caps) else {
                    continue;
                };
                let (Some(start), Some(end)) = (map.to_char(mark.start), map.to_char(mark.end)) else {
                    continue;
                };
                found.push(
                    Candidate::new(start, end, &spec.entity_type, &text[mark], spec.origin)
                        .with_priority(priority),
                );
            }
        }

        log::debug!("{} raw pattern matches in chunk", found.len());
        found
    }
}

/// True when `entity_type` is in `enabled`, or `enabled` is empty (all on).
pub(crate) fn is_enabled(enabled: &[String], entity_type: &str) -> bool {
    enabled.is_empty() || enabled.iter().any(|e| e == entity_type)
}

/// Byte range to mark for one regex match.
///
/// If the expression has capturing groups, the first group that participated
/// with a non-empty span is the mark; otherwise the whole match. `None` when
/// the result would be empty.
pub fn resolve_mark_span(caps: &Captures<'_>) -> Option<Range<usize>> {
    let group = (1..caps.len())
        .filter_map(|i| caps.get(i))
        .find(|m| !m.as_str().is_empty());
    if let Some(m) = group {
        return Some(m.range());
    }
    caps.get(0).filter(|m| !m.as_str().is_empty()).map(|m| m.range())
}

/// Greedy selection by ascending `(priority, start)`.
///
/// A candidate is accepted unless it overlaps one already accepted. Span
/// length never breaks ties. Candidates without a declared priority rank
/// after every declared one. The result is ordered by start.
pub fn select_by_priority(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| (c.priority.unwrap_or(i32::MAX), c.start));

    let mut accepted: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        if let Some(blocker) = accepted.iter().find(|a| a.overlaps(&candidate)) {
            log::debug!(
                "Pattern match '{}' [{}, {}) loses to '{}' [{}, {})",
                candidate.text,
                candidate.start,
                candidate.end,
                blocker.text,
                blocker.start,
                blocker.end
            );
            continue;
        }
        accepted.push(candidate);
    }

    accepted.sort_by_key(|c| c.start);
    accepted
}

/// Exclusion expressions applied to recognizer results only.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a list of expressions, logging and skipping bad ones.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for pattern in patterns {
            set.add(pattern.as_ref());
        }
        set
    }

    /// Add one expression, returning the compile error if any.
    pub fn try_add(&mut self, pattern: &str) -> Result<()> {
        self.patterns.push(compile(pattern)?);
        Ok(())
    }

    /// Add one expression; a malformed pattern is logged and skipped.
    pub fn add(&mut self, pattern: &str) -> &mut Self {
        if let Err(e) = self.try_add(pattern) {
            log::warn!("Skipping exclusion: {}", e);
        }
        self
    }

    /// Number of expressions.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when there are no exclusions.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when any expression matches somewhere in `text`.
    pub fn is_excluded(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_first_registered_has_highest_priority() {
        let mut registry = PatternRegistry::new();
        registry.add_pattern("EMPLOYEE_ID", r"E-\d{4}");
        registry.add_pattern("NUMBER", r"\d+");
        let priorities: Vec<(i32, &str)> = registry.iter().map(|(p, s)| (p, s.source.as_str())).collect();
        assert_eq!(priorities, vec![(0, r"E-\d{4}"), (1, r"\d+")]);

        let selected = select_by_priority(registry.find_all("ID E-1234", &all()));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].entity_type, "EMPLOYEE_ID");
        assert_eq!((selected[0].start, selected[0].end), (3, 9));
    }

    #[test]
    fn test_malformed_pattern_is_skipped() {
        let mut registry = PatternRegistry::new();
        registry.add_pattern("BAD", "([a-z").add_pattern("GOOD", "abc");
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.try_add_pattern("BAD", "(?P<"),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_literal_is_escaped_and_manual() {
        let mut registry = PatternRegistry::new();
        registry.add_literal("PERSON", "J.R.");
        let found = registry.find_all("J.R. and JXRX", &all());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].origin, Origin::Manual);
        assert_eq!(found[0].text, "J.R.");
    }

    #[test]
    fn test_capture_group_is_the_mark() {
        let mut registry = PatternRegistry::new();
        registry.add_pattern("ACCOUNT", r"Account:\s*(\d+)");
        let found = registry.find_all("Account: 98765", &all());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "98765");
        assert_eq!((found[0].start, found[0].end), (9, 14));
    }

    #[test]
    fn test_empty_group_falls_back_to_whole_match() {
        let re = Regex::new(r"x(y*)z").unwrap();
        let caps = re.captures("xz").unwrap();
        assert_eq!(resolve_mark_span(&caps), Some(0..2));
        let empty = Regex::new(r"q*").unwrap();
        assert_eq!(resolve_mark_span(&empty.captures("abc").unwrap()), None);
    }

    #[test]
    fn test_offsets_are_chars() {
        let mut registry = PatternRegistry::new();
        registry.add_pattern("PERSON", "山田");
        let found = registry.find_all("東京の山田さん", &all());
        assert_eq!((found[0].start, found[0].end), (3, 5));
    }

    #[test]
    fn test_disabled_entity_is_ignored() {
        let mut registry = PatternRegistry::new();
        registry.add_pattern("EMAIL", r"\S+@\S+");
        assert!(registry.find_all("a@b.c", &["PERSON".to_string()]).is_empty());
        assert_eq!(registry.find_all("a@b.c", &["EMAIL".to_string()]).len(), 1);
    }

    #[test]
    fn test_selection_ignores_length() {
        let long = Candidate::new(0, 10, "A", "0123456789", Origin::Custom).with_priority(1);
        let short = Candidate::new(2, 4, "B", "23", Origin::Custom).with_priority(0);
        let selected = select_by_priority(vec![long, short.clone()]);
        assert_eq!(selected, vec![short]);
    }

    #[test]
    fn test_exclusions() {
        let set = ExclusionSet::from_patterns(["^Dr\\.?$", "(", "Example"]);
        assert_eq!(set.len(), 2);
        assert!(set.is_excluded("Dr"));
        assert!(set.is_excluded("Example Corp"));
        assert!(!set.is_excluded("Alice"));
    }
}
