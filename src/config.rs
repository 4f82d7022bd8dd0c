//! Configuration for a detection run.
//!
//! A [`PipelineConfig`] is built once, validated, and passed by reference to
//! every stage. No stage reads configuration from anywhere else.

use crate::chunking::{ChunkerConfig, Delimiter};
use crate::coords::LineGroupingConfig;
use crate::dedup::DedupPolicy;
use crate::detection::ResolverConfig;
use crate::error::{Error, Result};
use crate::index::IndexConfig;
use crate::render::RenderStyle;
use serde::{Deserialize, Serialize};

/// False for negative values and NaN.
fn non_negative(value: f32) -> bool {
    value >= 0.0
}

/// Settings for every pipeline stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Entity types to detect; empty enables every type
    pub entity_types: Vec<String>,
    /// Character index
    pub index: IndexConfig,
    /// Chunk limits
    pub chunker: ChunkerConfig,
    /// Candidate resolution
    pub resolver: ResolverConfig,
    /// Whole-document de-duplication
    pub dedup: DedupPolicy,
    /// Line rectangle clustering
    pub line_grouping: LineGroupingConfig,
    /// Annotation output
    pub render: RenderStyle,
}

impl PipelineConfig {
    /// Create configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict detection to these entity types.
    pub fn with_entity_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the index options.
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    /// Set the chunk limits.
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Set the resolver options.
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the de-duplication policy.
    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Set the line clustering thresholds.
    pub fn with_line_grouping(mut self, line_grouping: LineGroupingConfig) -> Self {
        self.line_grouping = line_grouping;
        self
    }

    /// Set the render style.
    pub fn with_render(mut self, render: RenderStyle) -> Self {
        self.render = render;
        self
    }

    /// Reject limits no run can honour.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };

        if self.chunker.max_chars == 0 {
            return invalid("chunker.max_chars must be positive".into());
        }
        if self.chunker.byte_safety_margin >= self.chunker.max_bytes {
            return invalid(format!(
                "chunker.byte_safety_margin ({}) must be below max_bytes ({})",
                self.chunker.byte_safety_margin, self.chunker.max_bytes
            ));
        }
        if matches!(&self.chunker.delimiter, Delimiter::Text(d) if d.is_empty()) {
            return invalid("chunker.delimiter must not be empty".into());
        }
        if !(self.index.grid_cell_size.is_finite() && self.index.grid_cell_size > 0.0) {
            return invalid(format!("index.grid_cell_size must be positive, got {}", self.index.grid_cell_size));
        }
        if !non_negative(self.index.max_search_radius) {
            return invalid(format!(
                "index.max_search_radius must not be negative, got {}",
                self.index.max_search_radius
            ));
        }
        if !(0.0..=1.0).contains(&self.resolver.min_score) {
            return invalid(format!("resolver.min_score must be within [0, 1], got {}", self.resolver.min_score));
        }
        if !(non_negative(self.line_grouping.y_tolerance) && non_negative(self.line_grouping.height_ratio)) {
            return invalid("line_grouping thresholds must not be negative".into());
        }
        if !(non_negative(self.render.merge_gap) && non_negative(self.render.duplicate_tolerance)) {
            return invalid("render gap and tolerance must not be negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.entity_types.is_empty());
        assert_eq!(config.chunker.byte_safety_margin, 1024);
        assert_eq!(config.line_grouping.y_tolerance, 2.0);
        assert_eq!(config.index.grid_cell_size, 50.0);
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .with_entity_types(["PERSON", "EMAIL_ADDRESS"])
            .with_chunker(ChunkerConfig::new(500, 4096));
        assert_eq!(config.entity_types, vec!["PERSON".to_string(), "EMAIL_ADDRESS".to_string()]);
        assert_eq!(config.chunker.max_chars, 500);
    }

    #[test]
    fn test_nonsensical_limits_are_rejected() {
        let bad = [
            PipelineConfig::new().with_chunker(ChunkerConfig::new(0, 4096)),
            PipelineConfig::new().with_chunker(ChunkerConfig::new(10, 512)),
            PipelineConfig::new().with_chunker(ChunkerConfig::new(10, 4096).with_delimiter(Delimiter::Text(String::new()))),
            PipelineConfig::new().with_index(IndexConfig::new().with_grid_cell_size(0.0)),
            PipelineConfig::new().with_resolver(ResolverConfig::new().with_min_score(1.5)),
            PipelineConfig::new().with_line_grouping(LineGroupingConfig::new().with_y_tolerance(-1.0)),
            PipelineConfig::new().with_render(RenderStyle::new().with_merge_gap(f32::NAN)),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"entity_types":["PERSON"],"chunker":{"max_chars":2000}}"#).unwrap();
        assert_eq!(config.chunker.max_chars, 2000);
        assert_eq!(config.chunker.max_bytes, 49_149);
        assert_eq!(config.dedup, DedupPolicy::default());
        assert!(config.validate().is_ok());
    }
}
