//! Deterministic clean-up of recognizer hits.
//!
//! Recognizers routinely swallow neighbouring whitespace, list numbers or
//! punctuation. A refinement rule reduces the hit's text to the part that is
//! actually the entity; the refined text is then located back inside the
//! original window so offsets stay exact.

use super::patterns::resolve_mark_span;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DIGIT_HYPHEN_RUN: Regex = Regex::new(r"\d(?:[\d\-‐－]*\d)?").unwrap();
}

/// How the text of a recognizer hit is refined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "pattern")]
pub enum RefineRule {
    /// Strip leading and trailing whitespace
    TrimWhitespace,
    /// Strip leading and trailing digits and whitespace (names, places)
    TrimDigitsAndWhitespace,
    /// Keep the longest run of digits and hyphens (phone numbers)
    DigitHyphenRun,
    /// Keep the mark of the first match of this expression
    Pattern(String),
}

/// Refined text and where to look for it inside the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refined {
    /// Text after refinement
    pub text: String,
    /// Byte offset in the window near which the refined text was found
    pub hint: usize,
}

#[derive(Debug, Clone)]
enum CompiledRule {
    TrimWhitespace,
    TrimDigitsAndWhitespace,
    DigitHyphenRun,
    Pattern(Regex),
}

impl CompiledRule {
    fn compile(entity_type: &str, rule: &RefineRule) -> Self {
        match rule {
            RefineRule::TrimWhitespace => Self::TrimWhitespace,
            RefineRule::TrimDigitsAndWhitespace => Self::TrimDigitsAndWhitespace,
            RefineRule::DigitHyphenRun => Self::DigitHyphenRun,
            RefineRule::Pattern(source) => match Regex::new(source) {
                Ok(regex) => Self::Pattern(regex),
                Err(e) => {
                    log::warn!(
                        "Refinement pattern for {} is invalid ({}); trimming whitespace instead",
                        entity_type,
                        e
                    );
                    Self::TrimWhitespace
                },
            },
        }
    }

    fn apply(&self, text: &str) -> Option<Refined> {
        let range = match self {
            Self::TrimWhitespace => trim_range(text, char::is_whitespace),
            Self::TrimDigitsAndWhitespace => trim_range(text, |c| c.is_whitespace() || c.is_numeric()),
            Self::DigitHyphenRun => DIGIT_HYPHEN_RUN
                .find_iter(text)
                .fold(None, |best: Option<regex::Match<'_>>, m| match best {
                    Some(b) if b.as_str().chars().count() >= m.as_str().chars().count() => Some(b),
                    _ => Some(m),
                })
                .map(|m| m.range()),
            Self::Pattern(regex) => regex.captures(text).and_then(|caps| resolve_mark_span(&caps)),
        }?;

        if range.is_empty() {
            return None;
        }
        Some(Refined {
            text: text[range.clone()].to_string(),
            hint: range.start,
        })
    }
}

fn trim_range(text: &str, strip: impl Fn(char) -> bool + Copy) -> Option<std::ops::Range<usize>> {
    let start = text.len() - text.trim_start_matches(strip).len();
    let end = text.trim_end_matches(strip).len();
    if start < end {
        Some(start..end)
    } else {
        None
    }
}

/// Find `refined` inside `window`, preferring the occurrence closest to
/// `hint`. Returns the byte range within the window.
pub fn locate_in_window(window: &str, refined: &str, hint: usize) -> Option<std::ops::Range<usize>> {
    if refined.is_empty() {
        return None;
    }
    window
        .match_indices(refined)
        .map(|(idx, _)| idx)
        .min_by_key(|&idx| idx.abs_diff(hint))
        .map(|idx| idx..idx + refined.len())
}

/// Per-entity refinement rules, default rules built in.
#[derive(Debug, Clone)]
pub struct Refiner {
    rules: IndexMap<String, CompiledRule>,
    fallback: CompiledRule,
}

impl Refiner {
    /// Compile the configured rules.
    pub fn new(rules: &IndexMap<String, RefineRule>, fallback: &RefineRule) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(entity, rule)| (entity.clone(), CompiledRule::compile(entity, rule)))
                .collect(),
            fallback: CompiledRule::compile("*", fallback),
        }
    }

    /// Refine the text of one hit. `None` when nothing is left.
    pub fn refine(&self, entity_type: &str, text: &str) -> Option<Refined> {
        self.rules
            .get(entity_type)
            .unwrap_or(&self.fallback)
            .apply(text)
    }
}

/// The built-in rule table.
pub fn default_rules() -> IndexMap<String, RefineRule> {
    let mut rules = IndexMap::new();
    for entity in ["PERSON", "LOCATION", "ORGANIZATION", "NRP"] {
        rules.insert(entity.to_string(), RefineRule::TrimDigitsAndWhitespace);
    }
    rules.insert("PHONE_NUMBER".to_string(), RefineRule::DigitHyphenRun);
    rules
}
