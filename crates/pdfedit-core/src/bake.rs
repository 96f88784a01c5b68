//! Annotation baking
//!
//! Draws annotations into page content, after everything already there. Each
//! annotation is wrapped in a marked-content sequence carrying its id, which
//! makes baking idempotent: ids found in the document are never drawn again.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind};
use crate::color::Rgb;
use crate::config::EngineConfig;
use crate::coords::DocPoint;
use crate::document::RawDocument;
use crate::draw::{Overlay, Transparency};
use crate::encoding::encode_win_ansi;
use crate::error::{EngineError, Result};
use crate::fonts::StandardFont;
use crate::layout::{self, PageLayout};
use crate::metrics::MetricsProvider;
use crate::mutator::{self, Plan};
use crate::operations::{ItemKind, MutationOutcome, MutationWarning, WarningItem};
use crate::replace::cover_rect;
use lopdf::Document;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Arrowhead length as a multiple of the stroke width, with a floor in points
const ARROW_HEAD_FACTOR: f64 = 4.0;
const MIN_ARROW_HEAD: f64 = 6.0;

pub struct AnnotationBaker<'a> {
    config: &'a EngineConfig,
    metrics: &'a dyn MetricsProvider,
}

impl<'a> AnnotationBaker<'a> {
    pub fn new(config: &'a EngineConfig, metrics: &'a dyn MetricsProvider) -> Self {
        Self { config, metrics }
    }

    pub fn bake(&self, document: &RawDocument, annotations: &[Annotation]) -> Result<MutationOutcome> {
        let mut doc = document.parse()?;
        let plan = self.plan(document, &doc, annotations)?;
        mutator::commit(document, &mut doc, plan, self.config)
    }

    fn plan(&self, document: &RawDocument, doc: &Document, annotations: &[Annotation]) -> Result<Plan> {
        let mut plan = Plan::new(ItemKind::Annotation, annotations.len());

        let mut layouts: HashMap<u32, PageLayout> = HashMap::new();
        for info in document.pages() {
            let page_layout =
                layout::extract_from(doc, info.object_id, info.number, document.fingerprint(), self.metrics)?;
            layouts.insert(info.number, page_layout);
        }
        let mut seen: BTreeSet<AnnotationId> = layouts
            .values()
            .flat_map(|l| l.baked_ids.iter().cloned().map(AnnotationId))
            .collect();

        for annotation in annotations {
            let result = if seen.contains(&annotation.id) {
                Err(EngineError::DuplicateAnnotation(annotation.id.to_string()))
            } else {
                document
                    .page(annotation.page)
                    .and_then(|_| annotation.validate())
                    .and_then(|_| self.draw(annotation, layouts.get(&annotation.page)))
            };

            match result {
                Ok(overlay) => {
                    seen.insert(annotation.id.clone());
                    plan.add(annotation.page, overlay);
                }
                Err(error) => {
                    warn!(id = %annotation.id, page = annotation.page, %error, "skipping annotation");
                    plan.warnings.push(MutationWarning {
                        item: WarningItem::Annotation(annotation.id.clone()),
                        error,
                    });
                }
            }
        }

        debug!(
            attempted = annotations.len(),
            skipped = plan.warnings.len(),
            "planned annotation bake"
        );
        Ok(plan)
    }

    fn draw(&self, annotation: &Annotation, page_layout: Option<&PageLayout>) -> Result<Overlay> {
        let color = annotation.color();
        let style = &annotation.style;
        let mut overlay = Overlay::default();

        overlay.begin_mark(annotation.id.as_str());
        overlay.save();
        match &annotation.kind {
            AnnotationKind::Highlight { rects } => {
                overlay.set_transparency(Transparency {
                    opacity: style.opacity.unwrap_or(self.config.highlight_opacity),
                    multiply: true,
                });
                overlay.fill_color(color);
                for rect in rects {
                    overlay.rect(rect);
                }
                overlay.fill();
            }
            AnnotationKind::Rectangle { rect, fill } | AnnotationKind::Circle { rect, fill } => {
                self.stroke_style(&mut overlay, annotation);
                if let Some(fill) = fill {
                    overlay.fill_color(*fill);
                }
                if matches!(annotation.kind, AnnotationKind::Circle { .. }) {
                    overlay.ellipse(rect);
                } else {
                    overlay.rect(rect);
                }
                if fill.is_some() {
                    overlay.fill_and_stroke();
                } else {
                    overlay.stroke();
                }
            }
            AnnotationKind::Arrow { start, end } => {
                self.stroke_style(&mut overlay, annotation);
                let head = arrow_head(*start, *end, style.stroke_width);
                overlay.move_to(*start);
                overlay.line_to(head.base);
                overlay.stroke();
                overlay.fill_color(color);
                overlay.move_to(*end);
                overlay.line_to(head.left);
                overlay.line_to(head.right);
                overlay.close_path();
                overlay.fill();
            }
            AnnotationKind::Ink { strokes } => {
                self.stroke_style(&mut overlay, annotation);
                overlay.round_line_style();
                for stroke in strokes {
                    let mut points = stroke.iter();
                    if let Some(first) = points.next() {
                        overlay.move_to(*first);
                        points.for_each(|p| overlay.line_to(*p));
                    }
                }
                overlay.stroke();
            }
            AnnotationKind::Note {
                anchor,
                text,
                font_size,
                background,
            } => {
                self.note(&mut overlay, *anchor, text, *font_size, *background, color, page_layout)?;
            }
        }
        overlay.restore();
        overlay.end_mark();
        Ok(overlay)
    }

    fn stroke_style(&self, overlay: &mut Overlay, annotation: &Annotation) {
        if let Some(opacity) = annotation.style.opacity.filter(|o| *o < 1.0) {
            overlay.set_transparency(Transparency {
                opacity,
                multiply: false,
            });
        }
        overlay.stroke_color(annotation.color());
        overlay.line_width(annotation.style.stroke_width);
    }

    /// Cover plus one text line per `\n`-separated line, first baseline at `anchor`.
    #[allow(clippy::too_many_arguments)]
    fn note(
        &self,
        overlay: &mut Overlay,
        anchor: DocPoint,
        text: &str,
        font_size: f64,
        background: Option<Rgb>,
        color: Rgb,
        page_layout: Option<&PageLayout>,
    ) -> Result<()> {
        let font = StandardFont::Helvetica;
        let line_height = font_size * self.config.cover_height_factor;
        let lines: Vec<&str> = text.lines().collect();

        let mut encoded_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            let encoded = encode_win_ansi(line).ok_or_else(|| {
                EngineError::UnsupportedEncoding(format!("{:?} cannot be encoded for {}", line, font.base_font()))
            })?;
            encoded_lines.push(encoded);
        }

        let width = lines
            .iter()
            .map(|line| self.metrics.text_width(Some(font), line, font_size))
            .fold(0.0, f64::max);
        let mut cover = cover_rect(self.config, anchor.x, anchor.y, font_size, width);
        let extra = line_height * (lines.len().saturating_sub(1)) as f64;
        cover.y -= extra;
        cover.height += extra;

        let fill = background
            .or_else(|| page_layout.and_then(|l| l.background_at(&cover)))
            .unwrap_or(self.config.default_background);
        overlay.cover(&cover, fill);

        for (i, encoded) in encoded_lines.into_iter().enumerate() {
            if encoded.is_empty() {
                continue;
            }
            let origin = DocPoint::new(anchor.x, anchor.y - line_height * i as f64);
            overlay.text(font, font_size, origin, color, encoded);
        }
        Ok(())
    }
}

struct ArrowHead {
    /// Where the shaft ends
    base: DocPoint,
    left: DocPoint,
    right: DocPoint,
}

fn arrow_head(start: DocPoint, end: DocPoint, stroke_width: f64) -> ArrowHead {
    let (dx, dy) = (end.x - start.x, end.y - start.y);
    let length = dx.hypot(dy);
    let head = (stroke_width * ARROW_HEAD_FACTOR).max(MIN_ARROW_HEAD).min(length);
    let (ux, uy) = (dx / length, dy / length);
    let base = DocPoint::new(end.x - ux * head, end.y - uy * head);
    let half = head / 2.0;
    ArrowHead {
        base,
        left: DocPoint::new(base.x - uy * half, base.y + ux * half),
        right: DocPoint::new(base.x + uy * half, base.y - ux * half),
    }
}
