//! Per-entity annotation styles.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Annotation color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationColor {
    /// Grayscale (1 component)
    Gray(f32),
    /// RGB color (3 components)
    Rgb(f32, f32, f32),
}

impl AnnotationColor {
    /// Yellow, the usual highlight color.
    pub fn yellow() -> Self {
        Self::Rgb(1.0, 1.0, 0.0)
    }

    /// Red.
    pub fn red() -> Self {
        Self::Rgb(1.0, 0.0, 0.0)
    }

    /// Black, the usual redaction fill.
    pub fn black() -> Self {
        Self::Gray(0.0)
    }

    /// Components as RGB.
    pub fn to_rgb(&self) -> (f32, f32, f32) {
        match *self {
            Self::Gray(g) => (g, g, g),
            Self::Rgb(r, g, b) => (r, g, b),
        }
    }
}

impl Default for AnnotationColor {
    fn default() -> Self {
        Self::yellow()
    }
}

/// What an annotation does to the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum RenderMode {
    /// Mark the text, leave it in place
    #[default]
    Highlight,
    /// Remove the text under the rectangles and draw `placeholder` glyphs
    Redact {
        /// Glyph substituted for every removed character
        placeholder: char,
    },
}

/// Style for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityStyle {
    /// Stroke/fill color
    pub color: AnnotationColor,
    /// Fill alpha (0.0 = transparent, 1.0 = opaque)
    pub opacity: f32,
    /// Highlight or redaction
    pub mode: RenderMode,
}

impl Default for EntityStyle {
    fn default() -> Self {
        Self {
            color: AnnotationColor::yellow(),
            opacity: 0.4,
            mode: RenderMode::Highlight,
        }
    }
}

impl EntityStyle {
    /// A highlight in `color`.
    pub fn highlight(color: AnnotationColor) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// An opaque black redaction drawing `placeholder`.
    pub fn redaction(placeholder: char) -> Self {
        Self {
            color: AnnotationColor::black(),
            opacity: 1.0,
            mode: RenderMode::Redact { placeholder },
        }
    }

    /// Set the color.
    pub fn with_color(mut self, color: AnnotationColor) -> Self {
        self.color = color;
        self
    }

    /// Set the opacity, clamped to `[0, 1]`.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Rendering options for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Style for entity types without their own entry
    pub default: EntityStyle,
    /// Per-entity overrides
    pub per_entity: IndexMap<String, EntityStyle>,
    /// Largest horizontal gap (points) bridged when merging same-line rectangles
    pub merge_gap: f32,
    /// Corner distance (points) under which two annotations count as duplicates
    pub duplicate_tolerance: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            default: EntityStyle::default(),
            per_entity: IndexMap::new(),
            merge_gap: 3.0,
            duplicate_tolerance: 1.0,
        }
    }
}

impl RenderStyle {
    /// Create the default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback style.
    pub fn with_default(mut self, style: EntityStyle) -> Self {
        self.default = style;
        self
    }

    /// Set the style of one entity type.
    pub fn with_entity(mut self, entity_type: impl Into<String>, style: EntityStyle) -> Self {
        self.per_entity.insert(entity_type.into(), style);
        self
    }

    /// Set the merge gap.
    pub fn with_merge_gap(mut self, gap: f32) -> Self {
        self.merge_gap = gap;
        self
    }

    /// Set the duplicate tolerance.
    pub fn with_duplicate_tolerance(mut self, tolerance: f32) -> Self {
        self.duplicate_tolerance = tolerance;
        self
    }

    /// Style applied to `entity_type`.
    pub fn style_for(&self, entity_type: &str) -> &EntityStyle {
        self.per_entity.get(entity_type).unwrap_or(&self.default)
    }
}
