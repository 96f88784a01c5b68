//! Overlay content: the operators appended to a page, plus the resources
//! (standard fonts, transparency states) they reference.

use crate::color::Rgb;
use crate::coords::{DocPoint, DocRect};
use crate::fonts::StandardFont;
use crate::layout::EDIT_MARK_TAG;
use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Object, StringFormat};
use std::collections::{BTreeMap, BTreeSet};

/// Cubic Bézier control point distance for a quarter circle
const KAPPA: f64 = 0.552_284_749_8;

/// Transparency state registered on a page as an ExtGState resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transparency {
    pub opacity: f64,
    pub multiply: bool,
}

impl Transparency {
    /// Resource name; identical states share one entry.
    pub fn resource_name(&self) -> String {
        let percent = (self.opacity.clamp(0.0, 1.0) * 100.0).round() as u32;
        if self.multiply {
            format!("PdfEditGS{}M", percent)
        } else {
            format!("PdfEditGS{}", percent)
        }
    }

    pub fn to_dictionary(self) -> Dictionary {
        let alpha = Object::Real(self.opacity.clamp(0.0, 1.0) as f32);
        let mut gs = dictionary! {
            "Type" => "ExtGState",
            "ca" => alpha.clone(),
            "CA" => alpha,
        };
        if self.multiply {
            gs.set("BM", Object::Name(b"Multiply".to_vec()));
        }
        gs
    }
}

/// Operators for one page, in paint order
#[derive(Debug, Clone, Default)]
pub(crate) struct Overlay {
    pub operations: Vec<Operation>,
    pub fonts: BTreeSet<StandardFont>,
    pub transparencies: BTreeMap<String, Transparency>,
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn extend(&mut self, other: Overlay) {
        self.operations.extend(other.operations);
        self.fonts.extend(other.fonts);
        self.transparencies.extend(other.transparencies);
    }

    pub fn save(&mut self) {
        self.operations.push(op("q", vec![]));
    }

    pub fn restore(&mut self) {
        self.operations.push(op("Q", vec![]));
    }

    pub fn begin_mark(&mut self, id: &str) {
        let properties = dictionary! {
            "Id" => Object::String(id.as_bytes().to_vec(), StringFormat::Hexadecimal),
        };
        self.operations.push(op(
            "BDC",
            vec![
                Object::Name(EDIT_MARK_TAG.as_bytes().to_vec()),
                Object::Dictionary(properties),
            ],
        ));
    }

    pub fn end_mark(&mut self) {
        self.operations.push(op("EMC", vec![]));
    }

    pub fn set_transparency(&mut self, transparency: Transparency) {
        let name = transparency.resource_name();
        self.operations
            .push(op("gs", vec![Object::Name(name.as_bytes().to_vec())]));
        self.transparencies.insert(name, transparency);
    }

    pub fn fill_color(&mut self, color: Rgb) {
        let c = color.clamped();
        self.operations.push(op(
            "rg",
            vec![real(c.r as f64), real(c.g as f64), real(c.b as f64)],
        ));
    }

    pub fn stroke_color(&mut self, color: Rgb) {
        let c = color.clamped();
        self.operations.push(op(
            "RG",
            vec![real(c.r as f64), real(c.g as f64), real(c.b as f64)],
        ));
    }

    pub fn line_width(&mut self, width: f64) {
        self.operations.push(op("w", vec![real(width)]));
    }

    /// Round caps and joins
    pub fn round_line_style(&mut self) {
        self.operations.push(op("J", vec![Object::Integer(1)]));
        self.operations.push(op("j", vec![Object::Integer(1)]));
    }

    pub fn rect(&mut self, rect: &DocRect) {
        self.operations.push(op(
            "re",
            vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)],
        ));
    }

    pub fn move_to(&mut self, p: DocPoint) {
        self.operations.push(op("m", vec![real(p.x), real(p.y)]));
    }

    pub fn line_to(&mut self, p: DocPoint) {
        self.operations.push(op("l", vec![real(p.x), real(p.y)]));
    }

    pub fn curve_to(&mut self, c1: DocPoint, c2: DocPoint, p: DocPoint) {
        self.operations.push(op(
            "c",
            vec![real(c1.x), real(c1.y), real(c2.x), real(c2.y), real(p.x), real(p.y)],
        ));
    }

    pub fn close_path(&mut self) {
        self.operations.push(op("h", vec![]));
    }

    pub fn fill(&mut self) {
        self.operations.push(op("f", vec![]));
    }

    pub fn stroke(&mut self) {
        self.operations.push(op("S", vec![]));
    }

    pub fn fill_and_stroke(&mut self) {
        self.operations.push(op("B", vec![]));
    }

    /// Ellipse inscribed in `rect` as four Bézier arcs (path only).
    pub fn ellipse(&mut self, rect: &DocRect) {
        let center = rect.center();
        let (rx, ry) = (rect.width / 2.0, rect.height / 2.0);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        let (cx, cy) = (center.x, center.y);

        self.move_to(DocPoint::new(cx + rx, cy));
        self.curve_to(
            DocPoint::new(cx + rx, cy + ky),
            DocPoint::new(cx + kx, cy + ry),
            DocPoint::new(cx, cy + ry),
        );
        self.curve_to(
            DocPoint::new(cx - kx, cy + ry),
            DocPoint::new(cx - rx, cy + ky),
            DocPoint::new(cx - rx, cy),
        );
        self.curve_to(
            DocPoint::new(cx - rx, cy - ky),
            DocPoint::new(cx - kx, cy - ry),
            DocPoint::new(cx, cy - ry),
        );
        self.curve_to(
            DocPoint::new(cx + kx, cy - ry),
            DocPoint::new(cx + rx, cy - ky),
            DocPoint::new(cx + rx, cy),
        );
        self.close_path();
    }

    /// Opaque rectangle in its own graphics state.
    pub fn cover(&mut self, rect: &DocRect, color: Rgb) {
        self.save();
        self.fill_color(color);
        self.rect(rect);
        self.fill();
        self.restore();
    }

    /// One line of text at a baseline origin. `encoded` must already be in
    /// the font's WinAnsi encoding.
    pub fn text(&mut self, font: StandardFont, font_size: f64, origin: DocPoint, color: Rgb, encoded: Vec<u8>) {
        self.fonts.insert(font);
        self.save();
        self.fill_color(color);
        self.operations.push(op("BT", vec![]));
        self.operations.push(op(
            "Tf",
            vec![
                Object::Name(font.resource_name().into_bytes()),
                real(font_size),
            ],
        ));
        self.operations.push(op(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                real(origin.x),
                real(origin.y),
            ],
        ));
        self.operations.push(op(
            "Tj",
            vec![Object::String(encoded, StringFormat::Hexadecimal)],
        ));
        self.operations.push(op("ET", vec![]));
        self.restore();
    }
}

/// Font resource dictionary for a standard font.
pub(crate) fn font_dictionary(font: StandardFont) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(font.base_font().as_bytes().to_vec()),
    };
    // Symbol and ZapfDingbats keep their built-in encodings
    if !font.is_symbolic() {
        dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    }
    dict
}
