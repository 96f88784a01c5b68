//! Cover-and-redraw text replacement
//!
//! Original glyphs stay in the content stream. Each replacement paints an
//! opaque rectangle in the sampled page background over the old text, then
//! draws the new text at the same baseline in a standard font.

use crate::color::Rgb;
use crate::config::EngineConfig;
use crate::coords::{DocPoint, DocRect};
use crate::document::{self, RawDocument};
use crate::draw::Overlay;
use crate::encoding::encode_win_ansi;
use crate::error::{EngineError, Result};
use crate::fonts::{FontRef, StandardFont};
use crate::layout::{self, PageLayout, TextRun};
use crate::metrics::MetricsProvider;
use crate::mutator::{self, Plan};
use crate::operations::{ItemKind, MutationOutcome, MutationWarning, WarningItem};
use lopdf::{Document, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    /// 1-based page number
    pub page: u32,
    pub old_text: String,
    pub new_text: String,
    /// Baseline origin
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    /// Configured default text color when unset
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub font: FontRef,
    /// Width of the old text as extracted; covers at least this much
    #[serde(default)]
    pub old_width: Option<f64>,
}

impl Replacement {
    /// Replace an extracted run, keeping its origin, size and font.
    pub fn from_run(run: &TextRun, new_text: impl Into<String>) -> Self {
        Self {
            page: run.page,
            old_text: run.text.clone(),
            new_text: new_text.into(),
            x: run.origin_x,
            y: run.origin_y,
            font_size: run.font_size,
            color: None,
            font: run.font_ref.clone(),
            old_width: Some(run.estimated_width),
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_font(mut self, font: FontRef) -> Self {
        self.font = font;
        self
    }
}

pub struct ReplacementEngine<'a> {
    config: &'a EngineConfig,
    metrics: &'a dyn MetricsProvider,
}

impl<'a> ReplacementEngine<'a> {
    pub fn new(config: &'a EngineConfig, metrics: &'a dyn MetricsProvider) -> Self {
        Self { config, metrics }
    }

    /// Apply replacements in list order. Items that cannot be applied are
    /// reported as warnings; the rest still land in the returned snapshot.
    pub fn apply(&self, document: &RawDocument, replacements: &[Replacement]) -> Result<MutationOutcome> {
        let mut doc = document.parse()?;
        let plan = self.plan(document, &doc, replacements);
        mutator::commit(document, &mut doc, plan, self.config)
    }

    pub(crate) fn plan(&self, document: &RawDocument, doc: &Document, replacements: &[Replacement]) -> Plan {
        let mut plan = Plan::new(ItemKind::Replacement, replacements.len());
        let mut layouts: HashMap<u32, PageLayout> = HashMap::new();

        for (index, replacement) in replacements.iter().enumerate() {
            let result = self.draw(document, doc, replacement, &mut layouts);
            match result {
                Ok(overlay) => plan.add(replacement.page, overlay),
                Err(error) => {
                    warn!(
                        index,
                        page = replacement.page,
                        old_text = %replacement.old_text,
                        %error,
                        "skipping replacement"
                    );
                    plan.warnings.push(MutationWarning {
                        item: WarningItem::Replacement {
                            index,
                            old_text: replacement.old_text.clone(),
                        },
                        error,
                    });
                }
            }
        }

        debug!(
            attempted = replacements.len(),
            skipped = plan.warnings.len(),
            pages = plan.overlays.len(),
            "planned replacements"
        );
        plan
    }

    fn draw(
        &self,
        document: &RawDocument,
        doc: &Document,
        replacement: &Replacement,
        layouts: &mut HashMap<u32, PageLayout>,
    ) -> Result<Overlay> {
        let page_id = document.page(replacement.page)?.object_id;
        check_geometry(replacement)?;

        let font = resolve_font(doc, page_id, &replacement.font)?;
        let encoded = encode_win_ansi(&replacement.new_text).ok_or_else(|| {
            EngineError::UnsupportedEncoding(format!(
                "{:?} cannot be encoded for {}",
                replacement.new_text,
                font.base_font()
            ))
        })?;

        let size = replacement.font_size;
        let old_width = self
            .metrics
            .text_width(Some(font), &replacement.old_text, size)
            .max(replacement.old_width.unwrap_or(0.0));
        let new_width = self.metrics.text_width(Some(font), &replacement.new_text, size);
        let cover = cover_rect(self.config, replacement.x, replacement.y, size, old_width.max(new_width));

        if !layouts.contains_key(&replacement.page) {
            let page_layout = layout::extract_from(doc, page_id, replacement.page, document.fingerprint(), self.metrics)?;
            layouts.insert(replacement.page, page_layout);
        }
        let background = layouts
            .get(&replacement.page)
            .and_then(|l| l.background_at(&cover))
            .unwrap_or(self.config.default_background);

        let mut overlay = Overlay::default();
        overlay.cover(&cover, background);
        if !replacement.new_text.is_empty() {
            overlay.text(
                font,
                size,
                DocPoint::new(replacement.x, replacement.y),
                replacement.color.unwrap_or(self.config.default_text_color),
                encoded,
            );
        }
        Ok(overlay)
    }
}

/// Opaque area that hides text of `width` at a baseline origin.
pub(crate) fn cover_rect(config: &EngineConfig, x: f64, y: f64, font_size: f64, width: f64) -> DocRect {
    DocRect::new(
        x - config.cover_margin / 2.0,
        y - config.descent_factor * font_size,
        width + config.cover_margin,
        font_size * config.cover_height_factor,
    )
}

fn check_geometry(replacement: &Replacement) -> Result<()> {
    if !replacement.x.is_finite() || !replacement.y.is_finite() {
        return Err(EngineError::InvalidGeometry(format!(
            "origin ({}, {}) is not finite",
            replacement.x, replacement.y
        )));
    }
    if !replacement.font_size.is_finite() || replacement.font_size <= 0.0 {
        return Err(EngineError::InvalidGeometry(format!(
            "font size {} must be positive",
            replacement.font_size
        )));
    }
    if let Some(color) = replacement.color {
        if !color.is_valid() {
            return Err(EngineError::InvalidGeometry(
                "color channels must be within 0-1".to_string(),
            ));
        }
    }
    Ok(())
}

/// Map a font reference to the standard font the new text is drawn with.
pub(crate) fn resolve_font(doc: &Document, page_id: ObjectId, font: &FontRef) -> Result<StandardFont> {
    let resolved = match font {
        FontRef::Default => StandardFont::Helvetica,
        FontRef::Named(name) => StandardFont::from_name(name).ok_or_else(|| {
            EngineError::FontResolutionFailure(format!("no standard font matches {:?}", name))
        })?,
        FontRef::PageResource(resource) => {
            let base = document::font_base_name(doc, page_id, resource).ok_or_else(|| {
                EngineError::FontResolutionFailure(format!("page has no font resource {}", resource))
            })?;
            StandardFont::from_name(&base).ok_or_else(|| {
                EngineError::FontResolutionFailure(format!(
                    "font {} ({}) has no standard equivalent",
                    resource, base
                ))
            })?
        }
    };
    if resolved.is_symbolic() {
        return Err(EngineError::FontResolutionFailure(format!(
            "{} cannot draw text",
            resolved.base_font()
        )));
    }
    Ok(resolved)
}
