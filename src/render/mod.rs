//! Resolved spans → highlight/redaction instructions.
//!
//! Each span yields one instruction per page it touches. Line rectangles on
//! the same visual line separated by a small gap are merged into one
//! quadrilateral; the rest stay separate quads under the same instruction.
//! Instructions that duplicate an existing annotation, or one emitted earlier
//! in the same call, are suppressed.
//!
//! # Example
//!
//! ```
//! use pdf_pii::geometry::Rect;
//! use pdf_pii::render::{render, RenderStyle};
//! use pdf_pii::span::{Candidate, LineRect, Origin, ResolvedSpan};
//!
//! let span = ResolvedSpan::new(
//!     Candidate::new(0, 8, "PERSON", "Jane Doe", Origin::Auto),
//!     vec![
//!         LineRect { page: 0, rect: Rect::new(72.0, 90.0, 24.0, 12.0) },
//!         LineRect { page: 0, rect: Rect::new(97.0, 90.0, 18.0, 12.0) },
//!     ],
//! );
//! let instructions = render(&[span], &RenderStyle::default(), &[]);
//!
//! assert_eq!(instructions.len(), 1);
//! assert_eq!(instructions[0].quad_points.len(), 1);
//! ```

mod style;

pub use style::{AnnotationColor, EntityStyle, RenderMode, RenderStyle};

use crate::geometry::Rect;
use crate::span::{Origin, ResolvedSpan};
use serde::{Deserialize, Serialize};

/// Kind of annotation to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnnotationKind {
    /// Text markup highlight
    Highlight,
    /// Content redaction; text under the quads is removed and replaced by
    /// `placeholder` glyphs
    Redaction {
        /// Replacement glyph
        placeholder: char,
    },
}

/// One annotation to draw on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationInstruction {
    /// Page index (0-indexed)
    pub page: usize,
    /// Entity label
    pub entity_type: String,
    /// Covered text
    pub text: String,
    /// Provenance of the span
    pub origin: Origin,
    /// Highlight or redaction
    pub kind: AnnotationKind,
    /// Bounding rectangle of all quads
    pub rect: Rect,
    /// One 8-number quadrilateral per merged line rectangle
    pub quad_points: Vec<[f64; 8]>,
    /// Color
    pub color: AnnotationColor,
    /// Opacity (0.0 = transparent, 1.0 = opaque)
    pub opacity: f32,
}

/// An annotation already present on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingAnnotation {
    /// Page index (0-indexed)
    pub page: usize,
    /// Text the annotation covers
    pub text: String,
    /// Bounding rectangle
    pub rect: Rect,
}

impl ExistingAnnotation {
    /// Create a record of an existing annotation.
    pub fn new(page: usize, text: impl Into<String>, rect: Rect) -> Self {
        Self {
            page,
            text: text.into(),
            rect,
        }
    }
}

impl From<&AnnotationInstruction> for ExistingAnnotation {
    fn from(instruction: &AnnotationInstruction) -> Self {
        Self::new(instruction.page, instruction.text.clone(), instruction.rect)
    }
}

fn same_visual_line(a: &Rect, b: &Rect) -> bool {
    let tolerance = a.height.abs().min(b.height.abs()) / 2.0;
    (a.center().y - b.center().y).abs() <= tolerance
}

/// Merge rectangles that sit on the same visual line with a horizontal gap of
/// at most `max_gap`. Input order is kept.
pub fn merge_line_rects(rects: &[Rect], max_gap: f32) -> Vec<Rect> {
    let mut merged: Vec<Rect> = Vec::with_capacity(rects.len());
    for rect in rects {
        match merged.last_mut() {
            Some(last) if same_visual_line(last, rect) && last.horizontal_gap(rect) <= max_gap => {
                *last = last.union(rect);
            },
            _ => merged.push(*rect),
        }
    }
    merged
}

/// Builds annotation instructions for one run.
#[derive(Debug, Clone)]
pub struct AnnotationRenderer<'a> {
    style: &'a RenderStyle,
    seen: Vec<ExistingAnnotation>,
}

impl<'a> AnnotationRenderer<'a> {
    /// Create a renderer that suppresses duplicates of `existing`.
    pub fn new(style: &'a RenderStyle, existing: &[ExistingAnnotation]) -> Self {
        Self {
            style,
            seen: existing.to_vec(),
        }
    }

    fn is_duplicate(&self, page: usize, text: &str, rect: &Rect) -> bool {
        self.seen.iter().any(|e| {
            e.page == page && e.text == text && e.rect.corners_within(rect, self.style.duplicate_tolerance)
        })
    }

    /// Instructions for one span; spans without rectangles yield none.
    pub fn render_span(&mut self, span: &ResolvedSpan) -> Vec<AnnotationInstruction> {
        let candidate = &span.candidate;
        let entity_style = self.style.style_for(&candidate.entity_type);
        let kind = match entity_style.mode {
            RenderMode::Highlight => AnnotationKind::Highlight,
            RenderMode::Redact { placeholder } => AnnotationKind::Redaction { placeholder },
        };

        let mut pages: Vec<usize> = span.line_rects.iter().map(|l| l.page).collect();
        pages.dedup();

        let mut out = Vec::new();
        for page in pages {
            let rects: Vec<Rect> = span
                .line_rects
                .iter()
                .filter(|l| l.page == page)
                .map(|l| l.rect)
                .collect();
            let merged = merge_line_rects(&rects, self.style.merge_gap);
            let Some(bounds) = merged.iter().copied().reduce(|a, b| a.union(&b)) else {
                continue;
            };

            if self.is_duplicate(page, &candidate.text, &bounds) {
                log::debug!(
                    "Skipping duplicate annotation for '{}' on page {}",
                    candidate.text,
                    page
                );
                continue;
            }

            let instruction = AnnotationInstruction {
                page,
                entity_type: candidate.entity_type.clone(),
                text: candidate.text.clone(),
                origin: candidate.origin,
                kind: kind.clone(),
                rect: bounds,
                quad_points: merged.iter().map(Rect::to_quad).collect(),
                color: entity_style.color,
                opacity: entity_style.opacity,
            };
            self.seen.push(ExistingAnnotation::from(&instruction));
            out.push(instruction);
        }
        out
    }

    /// Instructions for every renderable span, in input order.
    pub fn render_all(&mut self, spans: &[ResolvedSpan]) -> Vec<AnnotationInstruction> {
        let mut out = Vec::new();
        for span in spans {
            if !span.is_renderable() {
                log::debug!(
                    "Span '{}' at [{}, {}) has no rectangles",
                    span.candidate.text,
                    span.candidate.start,
                    span.candidate.end
                );
                continue;
            }
            out.extend(self.render_span(span));
        }
        out
    }
}

/// Render spans with `style`, suppressing duplicates of `existing`.
pub fn render(
    spans: &[ResolvedSpan],
    style: &RenderStyle,
    existing: &[ExistingAnnotation],
) -> Vec<AnnotationInstruction> {
    AnnotationRenderer::new(style, existing).render_all(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Candidate, LineRect};

    fn span(text: &str, rects: &[(usize, Rect)]) -> ResolvedSpan {
        ResolvedSpan::new(
            Candidate::new(0, text.chars().count(), "PERSON", text, Origin::Auto),
            rects.iter().map(|&(page, rect)| LineRect { page, rect }).collect(),
        )
    }

    #[test]
    fn test_merge_same_line_small_gap() {
        let merged = merge_line_rects(
            &[
                Rect::new(0.0, 0.0, 10.0, 12.0),
                Rect::new(12.0, 0.5, 10.0, 12.0),
                Rect::new(40.0, 0.0, 10.0, 12.0),
                Rect::new(0.0, 14.0, 10.0, 12.0),
            ],
            3.0,
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], Rect::from_points(0.0, 0.0, 22.0, 12.5));
    }

    #[test]
    fn test_one_instruction_per_page() {
        let s = span("Jane Doe", &[
            (0, Rect::new(500.0, 700.0, 30.0, 12.0)),
            (1, Rect::new(72.0, 60.0, 20.0, 12.0)),
        ]);
        let out = render(&[s], &RenderStyle::default(), &[]);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].page, out[1].page), (0, 1));
        assert_eq!(out[0].kind, AnnotationKind::Highlight);
        assert_eq!(out[0].quad_points, vec![Rect::new(500.0, 700.0, 30.0, 12.0).to_quad()]);
    }

    #[test]
    fn test_unmergeable_rects_stay_separate_quads() {
        let s = span("Jane Doe", &[(0, Rect::new(200.0, 10.0, 30.0, 12.0)), (0, Rect::new(10.0, 24.0, 20.0, 12.0))]);
        let out = render(&[s], &RenderStyle::default(), &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quad_points.len(), 2);
        assert_eq!(out[0].rect, Rect::from_points(10.0, 10.0, 230.0, 36.0));
    }

    #[test]
    fn test_existing_duplicate_is_suppressed() {
        let rect = Rect::new(10.0, 10.0, 30.0, 12.0);
        let existing = [ExistingAnnotation::new(0, "Ann", Rect::new(10.4, 9.7, 30.0, 12.0))];
        let style = RenderStyle::default();
        assert!(render(&[span("Ann", &[(0, rect)])], &style, &existing).is_empty());
        // different text is not a duplicate
        assert_eq!(render(&[span("Bob", &[(0, rect)])], &style, &existing).len(), 1);
    }

    #[test]
    fn test_repeat_within_one_call_is_suppressed() {
        let rect = Rect::new(10.0, 10.0, 30.0, 12.0);
        let out = render(&[span("Ann", &[(0, rect)]), span("Ann", &[(0, rect)])], &RenderStyle::default(), &[]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_redaction_style_and_unrenderable_span() {
        let style = RenderStyle::new().with_entity("PERSON", EntityStyle::redaction('*'));
        let out = render(
            &[span("Ann", &[]), span("Bob", &[(0, Rect::new(0.0, 0.0, 5.0, 5.0))])],
            &style,
            &[],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, AnnotationKind::Redaction { placeholder: '*' });
        assert_eq!(out[0].color, AnnotationColor::black());
        assert_eq!(out[0].opacity, 1.0);
    }
}
