//! Text width estimation
//!
//! Extraction and cover sizing both need the advance width of a string. The
//! engine never embeds or parses font programs, so widths are estimated from a
//! per-family average glyph width behind the [`MetricsProvider`] seam; a host
//! with real font metrics can plug in its own provider.

use crate::fonts::{FontFamily, StandardFont};

/// Estimates advance widths in text space units (points at a given size)
pub trait MetricsProvider: Send + Sync {
    /// Average advance of one glyph as a fraction of the font size.
    fn glyph_width_ratio(&self, font: Option<StandardFont>, ch: char) -> f64;

    fn text_width(&self, font: Option<StandardFont>, text: &str, font_size: f64) -> f64 {
        text.chars()
            .map(|c| self.glyph_width_ratio(font, c))
            .sum::<f64>()
            * font_size
    }
}

/// One average ratio per font family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageGlyphMetrics {
    pub sans: f64,
    pub serif: f64,
    pub mono: f64,
    /// Used for fonts that do not map to a standard family
    pub fallback: f64,
}

impl Default for AverageGlyphMetrics {
    fn default() -> Self {
        Self {
            sans: 0.55,
            serif: 0.5,
            mono: 0.6,
            fallback: 0.55,
        }
    }
}

impl MetricsProvider for AverageGlyphMetrics {
    fn glyph_width_ratio(&self, font: Option<StandardFont>, _ch: char) -> f64 {
        match font.map(|f| f.family()) {
            Some(FontFamily::Helvetica) => self.sans,
            Some(FontFamily::Times) => self.serif,
            Some(FontFamily::Courier) => self.mono,
            Some(FontFamily::Symbol) | Some(FontFamily::ZapfDingbats) | None => self.fallback,
        }
    }
}
