//! Standard font resolution
//!
//! Redrawn text is always set in one of the PDF standard 14 fonts. Font names
//! found in documents ("BCDEEE+ArialMT", "TimesNewRomanPSMT", ...) are mapped
//! onto the closest standard family and style.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// PostScript name used as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    pub fn family(&self) -> FontFamily {
        match self {
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique
            | StandardFont::HelveticaBoldOblique => FontFamily::Helvetica,
            StandardFont::TimesRoman
            | StandardFont::TimesBold
            | StandardFont::TimesItalic
            | StandardFont::TimesBoldItalic => FontFamily::Times,
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => FontFamily::Courier,
            StandardFont::Symbol => FontFamily::Symbol,
            StandardFont::ZapfDingbats => FontFamily::ZapfDingbats,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            StandardFont::HelveticaBold
                | StandardFont::HelveticaBoldOblique
                | StandardFont::TimesBold
                | StandardFont::TimesBoldItalic
                | StandardFont::CourierBold
                | StandardFont::CourierBoldOblique
        )
    }

    /// Symbol and ZapfDingbats have their own built-in encodings.
    pub fn is_symbolic(&self) -> bool {
        matches!(self.family(), FontFamily::Symbol | FontFamily::ZapfDingbats)
    }

    /// Resource name used when this font is added to a page
    pub fn resource_name(&self) -> String {
        format!("PdfEdit{}", self.base_font().replace('-', ""))
    }

    /// Resolve a font name as found in a PDF or supplied by a caller.
    ///
    /// Exact standard names resolve directly. Other names resolve when they
    /// contain a recognizable family ("Arial", "TimesNewRoman", "Consolas", CSS
    /// generic families); style is read from "Bold"/"Italic"/"Oblique".
    /// Returns `None` for names with no recognizable family.
    pub fn from_name(name: &str) -> Option<StandardFont> {
        if let Some(exact) = Self::ALL.iter().find(|f| f.base_font() == name) {
            return Some(*exact);
        }

        // Drop a subset tag like "BCDEEE+"
        let stripped = match name.split_once('+') {
            Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => {
                rest
            }
            _ => name,
        };
        let lower = stripped.to_lowercase();

        let family = match lower.as_str() {
            "serif" => Some(FontFamily::Times),
            "sans-serif" => Some(FontFamily::Helvetica),
            "monospace" => Some(FontFamily::Courier),
            _ => None,
        }
        .or_else(|| family_from_keywords(&lower))?;

        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");
        Some(Self::styled(family, bold, italic))
    }

    pub fn styled(family: FontFamily, bold: bool, italic: bool) -> StandardFont {
        match family {
            FontFamily::Helvetica => match (bold, italic) {
                (true, true) => StandardFont::HelveticaBoldOblique,
                (true, false) => StandardFont::HelveticaBold,
                (false, true) => StandardFont::HelveticaOblique,
                (false, false) => StandardFont::Helvetica,
            },
            FontFamily::Times => match (bold, italic) {
                (true, true) => StandardFont::TimesBoldItalic,
                (true, false) => StandardFont::TimesBold,
                (false, true) => StandardFont::TimesItalic,
                (false, false) => StandardFont::TimesRoman,
            },
            FontFamily::Courier => match (bold, italic) {
                (true, true) => StandardFont::CourierBoldOblique,
                (true, false) => StandardFont::CourierBold,
                (false, true) => StandardFont::CourierOblique,
                (false, false) => StandardFont::Courier,
            },
            FontFamily::Symbol => StandardFont::Symbol,
            FontFamily::ZapfDingbats => StandardFont::ZapfDingbats,
        }
    }
}

impl Default for StandardFont {
    fn default() -> Self {
        StandardFont::Helvetica
    }
}

fn family_from_keywords(lower: &str) -> Option<FontFamily> {
    // Times/serif
    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return Some(FontFamily::Times);
    }

    // Courier/monospace
    if lower.contains("courier")
        || lower.contains("mono")
        || lower.contains("consolas")
        || lower.contains("monaco")
    {
        return Some(FontFamily::Courier);
    }

    // Helvetica/sans-serif
    if lower.contains("arial")
        || lower.contains("helvetica")
        || lower.contains("sans")
        || lower.contains("gothic")
        || lower.contains("calibri")
        || lower.contains("verdana")
    {
        return Some(FontFamily::Helvetica);
    }

    if lower.contains("symbol") {
        return Some(FontFamily::Symbol);
    }
    if lower.contains("zapf") || lower.contains("dingbat") {
        return Some(FontFamily::ZapfDingbats);
    }

    None
}

/// Which font a piece of text should be drawn with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "name")]
pub enum FontRef {
    /// Helvetica
    #[default]
    Default,
    /// A font name, resolved with [`StandardFont::from_name`]
    Named(String),
    /// A font resource on the page (e.g. "F1" from a `Tf` operator)
    PageResource(String),
}
