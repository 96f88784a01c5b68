//! Freeform annotations and their JSON form
//!
//! Annotations reach the engine from an external collaborator as a list; each
//! kind carries only the geometry it needs. Coordinates are PDF user space.

use crate::color::Rgb;
use crate::coords::{DocPoint, DocRect};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        AnnotationId(id.to_string())
    }
}

impl From<String> for AnnotationId {
    fn from(id: String) -> Self {
        AnnotationId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    Highlight {
        rects: Vec<DocRect>,
    },
    Note {
        /// Baseline origin of the first line
        anchor: DocPoint,
        text: String,
        #[serde(default = "default_note_size")]
        font_size: f64,
        /// Cover color behind the note; page background when unset
        #[serde(default)]
        background: Option<Rgb>,
    },
    Rectangle {
        rect: DocRect,
        #[serde(default)]
        fill: Option<Rgb>,
    },
    Circle {
        rect: DocRect,
        #[serde(default)]
        fill: Option<Rgb>,
    },
    Arrow {
        start: DocPoint,
        end: DocPoint,
    },
    Ink {
        strokes: Vec<Vec<DocPoint>>,
    },
}

fn default_note_size() -> f64 {
    12.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    /// Stroke color (fill color for highlights); kind default when unset
    pub color: Option<Rgb>,
    pub stroke_width: f64,
    /// Kind default when unset (the configured highlight opacity, otherwise opaque)
    pub opacity: Option<f64>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: None,
            stroke_width: 1.0,
            opacity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page number
    pub page: u32,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub style: AnnotationStyle,
}

impl Annotation {
    pub fn new(id: impl Into<AnnotationId>, page: u32, kind: AnnotationKind) -> Self {
        Self {
            id: id.into(),
            page,
            kind,
            style: AnnotationStyle::default(),
        }
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    /// Highlight covering the hit boxes of selected text.
    pub fn highlight(id: impl Into<AnnotationId>, page: u32, rects: Vec<DocRect>) -> Self {
        Self::new(id, page, AnnotationKind::Highlight { rects })
    }

    pub fn color(&self) -> Rgb {
        self.style.color.unwrap_or(match self.kind {
            AnnotationKind::Highlight { .. } => Rgb::YELLOW,
            _ => Rgb::BLACK,
        })
    }

    /// Check geometry and style before anything is drawn.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EngineError::InvalidGeometry(format!("{}: {}", self.id, msg)));

        if !self.style.stroke_width.is_finite() || self.style.stroke_width <= 0.0 {
            return invalid(format!("stroke width {} must be positive", self.style.stroke_width));
        }
        if let Some(opacity) = self.style.opacity {
            if !(opacity > 0.0 && opacity <= 1.0) {
                return invalid(format!("opacity {} must be in (0, 1]", opacity));
            }
        }
        if self.style.color.is_some_and(|c| !c.is_valid()) {
            return invalid("color channels must be within 0-1".to_string());
        }

        match &self.kind {
            AnnotationKind::Highlight { rects } => {
                if rects.is_empty() {
                    return invalid("highlight has no rectangles".to_string());
                }
                if rects.iter().any(|r| !r.is_drawable()) {
                    return invalid("highlight rectangle is empty or not finite".to_string());
                }
            }
            AnnotationKind::Note {
                anchor, text, font_size, ..
            } => {
                if !anchor.is_finite() {
                    return invalid("note anchor is not finite".to_string());
                }
                if text.trim().is_empty() {
                    return invalid("note text is empty".to_string());
                }
                if !font_size.is_finite() || *font_size <= 0.0 {
                    return invalid(format!("note font size {} must be positive", font_size));
                }
            }
            AnnotationKind::Rectangle { rect, .. } | AnnotationKind::Circle { rect, .. } => {
                if !rect.is_drawable() {
                    return invalid("shape rectangle is empty or not finite".to_string());
                }
            }
            AnnotationKind::Arrow { start, end } => {
                if !start.is_finite() || !end.is_finite() {
                    return invalid("arrow endpoints are not finite".to_string());
                }
                if start == end {
                    return invalid("arrow has zero length".to_string());
                }
            }
            AnnotationKind::Ink { strokes } => {
                if strokes.is_empty() {
                    return invalid("ink has no strokes".to_string());
                }
                if strokes.iter().any(|s| s.len() < 2) {
                    return invalid("ink stroke needs at least two points".to_string());
                }
                if strokes.iter().flatten().any(|p| !p.is_finite()) {
                    return invalid("ink point is not finite".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Parse an annotation list handed across the boundary as JSON.
pub fn from_json(json: &str) -> Result<Vec<Annotation>> {
    serde_json::from_str(json).map_err(|e| EngineError::InvalidGeometry(format!("annotation JSON: {}", e)))
}

pub fn to_json(annotations: &[Annotation]) -> Result<String> {
    serde_json::to_string(annotations).map_err(|e| EngineError::SerializationError(e.to_string()))
}
