//! Text layout extraction
//!
//! Walks a page's content streams and reports every text-showing operation as
//! a [`TextRun`] in emission order. Runs are derived data: they are recomputed
//! from the bytes on every pass and carry the fingerprint of the snapshot they
//! came from.
//!
//! Besides text, the walk records opaque filled rectangles. A run that is
//! completely painted over by a later opaque fill is not visible, so it is
//! left out of the layout; cover-and-redraw edits are observable this way.

use crate::color::Rgb;
use crate::coords::{DocPoint, DocRect};
use crate::document::{self, RawDocument};
use crate::encoding::{glyph_name_to_char, BaseEncoding, FontEncoding, ToUnicodeMap};
use crate::error::{EngineError, Result};
use crate::fonts::{FontRef, StandardFont};
use crate::metrics::MetricsProvider;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Marked-content tag wrapping everything this engine bakes into a page
pub const EDIT_MARK_TAG: &str = "PdfEditMark";

/// Fills are compared against ink boxes with this slack (points)
const OCCLUSION_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// 1-based page number
    pub page: u32,
    pub origin_x: f64,
    pub origin_y: f64,
    pub font_size: f64,
    pub estimated_width: f64,
    pub font_ref: FontRef,
    /// Fingerprint of the snapshot this run was extracted from
    pub fingerprint: String,
}

impl TextRun {
    pub fn origin(&self) -> DocPoint {
        DocPoint::new(self.origin_x, self.origin_y)
    }

    /// Clickable area: from a quarter em below the baseline to one em above it.
    pub fn hit_box(&self) -> DocRect {
        DocRect::new(
            self.origin_x,
            self.origin_y - 0.25 * self.font_size,
            self.estimated_width,
            1.25 * self.font_size,
        )
    }

    /// Approximate area covered by glyph ink.
    pub fn ink_box(&self) -> DocRect {
        DocRect::new(
            self.origin_x,
            self.origin_y - 0.2 * self.font_size,
            self.estimated_width,
            self.font_size,
        )
    }
}

/// An opaque filled rectangle painted on the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpaqueFill {
    pub rect: DocRect,
    pub color: Rgb,
}

/// A text-showing operation that could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRun {
    pub font_resource: String,
    pub error: EngineError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    pub page: u32,
    /// Visible runs in content-stream order (not reading order)
    pub runs: Vec<TextRun>,
    pub skipped: Vec<SkippedRun>,
    /// Opaque fills in content-stream order
    pub fills: Vec<OpaqueFill>,
    /// Ids of annotations already baked into this page
    pub baked_ids: BTreeSet<String>,
}

impl PageLayout {
    /// Topmost opaque fill that contains `rect`.
    pub fn background_at(&self, rect: &DocRect) -> Option<Rgb> {
        self.fills
            .iter()
            .rev()
            .find(|fill| fill.rect.contains_rect(rect, OCCLUSION_TOLERANCE))
            .map(|fill| fill.color)
    }
}

/// Extract the text layout of one page.
pub fn extract_page(
    document: &RawDocument,
    page: u32,
    metrics: &dyn MetricsProvider,
) -> Result<PageLayout> {
    let info = document.page(page)?;
    let doc = document.parse()?;
    extract_from(&doc, info.object_id, page, document.fingerprint(), metrics)
}

/// Extract every page, in page order.
pub fn extract_all(document: &RawDocument, metrics: &dyn MetricsProvider) -> Result<Vec<PageLayout>> {
    let doc = document.parse()?;
    document
        .pages()
        .iter()
        .map(|info| extract_from(&doc, info.object_id, info.number, document.fingerprint(), metrics))
        .collect()
}

pub(crate) fn extract_from(
    doc: &Document,
    page_id: ObjectId,
    page: u32,
    fingerprint: &str,
    metrics: &dyn MetricsProvider,
) -> Result<PageLayout> {
    let bytes = document::page_content(doc, page_id);
    let content = Content::decode(&bytes).map_err(|e| {
        EngineError::MalformedDocument(format!("page {} content stream: {}", page, e))
    })?;

    let resources = document::page_resources(doc, page_id);
    let mut walker = Walker::new(doc, resources, page, fingerprint, metrics);
    for op in &content.operations {
        walker.apply(op);
    }
    let layout = walker.finish();

    debug!(
        page,
        runs = layout.runs.len(),
        skipped = layout.skipped.len(),
        fills = layout.fills.len(),
        "extracted page layout"
    );
    Ok(layout)
}

/// Affine matrix [a b c d e f] in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    fn x_scale(&self) -> f64 {
        self.0[0].hypot(self.0[1])
    }

    fn y_scale(&self) -> f64 {
        self.0[2].hypot(self.0[3])
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = document::number(obj)?;
        }
        Some(Matrix(m))
    }
}

/// State saved by `q` and restored by `Q`
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill_color: Rgb,
    fill_alpha: f64,
    /// `/BM` is Normal (or Compatible); other modes let content show through
    normal_blend: bool,
    font: Option<String>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_color: Rgb::BLACK,
            fill_alpha: 1.0,
            normal_blend: true,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
        }
    }
}

/// A page font as far as extraction cares
#[derive(Debug, Clone)]
struct PageFont {
    standard: Option<StandardFont>,
    encoding: FontEncoding,
    /// Bytes per character code
    code_width: usize,
}

enum Event {
    Run(TextRun),
    Fill(OpaqueFill),
}

struct Walker<'a> {
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    page: u32,
    fingerprint: &'a str,
    metrics: &'a dyn MetricsProvider,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path_rects: Vec<DocRect>,
    path_is_rects: bool,
    fonts: HashMap<String, PageFont>,
    events: Vec<Event>,
    skipped: Vec<SkippedRun>,
    baked_ids: BTreeSet<String>,
}

impl<'a> Walker<'a> {
    fn new(
        doc: &'a Document,
        resources: Option<&'a Dictionary>,
        page: u32,
        fingerprint: &'a str,
        metrics: &'a dyn MetricsProvider,
    ) -> Self {
        Self {
            doc,
            resources,
            page,
            fingerprint,
            metrics,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path_rects: Vec::new(),
            path_is_rects: true,
            fonts: HashMap::new(),
            events: Vec::new(),
            skipped: Vec::new(),
            baked_ids: BTreeSet::new(),
        }
    }

    fn apply(&mut self, op: &Operation) {
        let operands = op.operands.as_slice();
        let num = |i: usize| operands.get(i).and_then(document::number);

        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "gs" => {
                if let Some(gstate) = operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| self.ext_gstate(name))
                {
                    if let Some(alpha) = gstate.get(b"ca").ok().and_then(document::number) {
                        self.state.fill_alpha = alpha;
                    }
                    if let Ok(mode) = gstate.get(b"BM") {
                        self.state.normal_blend = is_normal_blend(mode);
                    }
                }
            }

            // Non-stroking color
            "g" => {
                if let Some(level) = num(0) {
                    self.state.fill_color = Rgb::gray(level as f32);
                }
            }
            "rg" => {
                if let (Some(r), Some(g), Some(b)) = (num(0), num(1), num(2)) {
                    self.state.fill_color = Rgb::new(r as f32, g as f32, b as f32);
                }
            }
            "k" => {
                if let (Some(c), Some(m), Some(y), Some(k)) = (num(0), num(1), num(2), num(3)) {
                    self.state.fill_color = Rgb::from_cmyk(c as f32, m as f32, y as f32, k as f32);
                }
            }
            "sc" | "scn" => {
                let components: Vec<f32> = operands
                    .iter()
                    .filter_map(document::number)
                    .map(|v| v as f32)
                    .collect();
                match components.as_slice() {
                    [level] => self.state.fill_color = Rgb::gray(*level),
                    [r, g, b] => self.state.fill_color = Rgb::new(*r, *g, *b),
                    [c, m, y, k] => self.state.fill_color = Rgb::from_cmyk(*c, *m, *y, *k),
                    _ => {}
                }
            }

            // Paths
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) = (num(0), num(1), num(2), num(3)) {
                    let rect = self.device_rect(x, y, w, h);
                    self.path_rects.push(rect);
                }
            }
            "m" | "l" | "c" | "v" | "y" | "h" => self.path_is_rects = false,
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                if self.path_is_rects && self.state.fill_alpha >= 1.0 && self.state.normal_blend {
                    let color = self.state.fill_color;
                    for rect in self.path_rects.drain(..) {
                        self.events.push(Event::Fill(OpaqueFill { rect, color }));
                    }
                }
                self.end_path();
            }
            "S" | "s" | "n" => self.end_path(),

            // Text objects and state
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.state.font = Some(String::from_utf8_lossy(name).into_owned());
                }
                if let Some(size) = num(1) {
                    self.state.font_size = size;
                }
            }
            "Tc" => self.state.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = num(0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(&[TextPiece::Bytes(bytes)]);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(&[TextPiece::Bytes(bytes)]);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(&[TextPiece::Bytes(bytes)]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let pieces: Vec<TextPiece> = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(TextPiece::Bytes(bytes)),
                            other => document::number(other).map(TextPiece::Adjust),
                        })
                        .collect();
                    self.show(&pieces);
                }
            }

            // Marked content
            "BDC" => {
                if let Some(id) = self.edit_mark_id(operands) {
                    self.baked_ids.insert(id);
                }
            }
            _ => {}
        }
    }

    fn end_path(&mut self) {
        self.path_rects.clear();
        self.path_is_rects = true;
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    /// Bounding box in default user space of a rectangle in the current CTM.
    fn device_rect(&self, x: f64, y: f64, w: f64, h: f64) -> DocRect {
        let corners = [
            self.state.ctm.apply(x, y),
            self.state.ctm.apply(x + w, y),
            self.state.ctm.apply(x, y + h),
            self.state.ctm.apply(x + w, y + h),
        ];
        let (min_x, max_x) = corners
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (cx, _)| (lo.min(*cx), hi.max(*cx)));
        let (min_y, max_y) = corners
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, cy)| (lo.min(*cy), hi.max(*cy)));
        DocRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    fn show(&mut self, pieces: &[TextPiece<'_>]) {
        let resource_name = self.state.font.clone().unwrap_or_default();
        let font = self.font(&resource_name);
        let font_size = self.state.font_size;
        let h_scale = self.state.horizontal_scale;

        let mut text = String::new();
        let mut advance = 0.0; // unscaled text space
        for piece in pieces {
            match piece {
                TextPiece::Bytes(bytes) => match font.encoding.decode(bytes) {
                    Ok(decoded) => {
                        let glyphs = bytes.len() / font.code_width.max(1);
                        let spaces = decoded.chars().filter(|c| *c == ' ').count();
                        advance += self.metrics.text_width(font.standard, &decoded, font_size)
                            + self.state.char_spacing * glyphs as f64
                            + self.state.word_spacing * spaces as f64;
                        text.push_str(&decoded);
                    }
                    Err(error) => {
                        warn!(page = self.page, font = %resource_name, %error, "skipping undecodable text");
                        self.skipped.push(SkippedRun {
                            font_resource: resource_name,
                            error,
                        });
                        return;
                    }
                },
                TextPiece::Adjust(amount) => advance -= amount / 1000.0 * font_size,
            }
        }

        let rendering = self.text_matrix.then(&self.state.ctm);
        let (origin_x, origin_y) = rendering.apply(0.0, 0.0);
        let run_width = advance * h_scale * rendering.x_scale();
        self.text_matrix = Matrix::translate(advance * h_scale, 0.0).then(&self.text_matrix);

        if text.is_empty() {
            return;
        }
        self.events.push(Event::Run(TextRun {
            text,
            page: self.page,
            origin_x,
            origin_y,
            font_size: font_size * rendering.y_scale(),
            estimated_width: run_width.max(0.0),
            font_ref: FontRef::PageResource(resource_name),
            fingerprint: self.fingerprint.to_string(),
        }));
    }

    fn font(&mut self, resource_name: &str) -> PageFont {
        if let Some(font) = self.fonts.get(resource_name) {
            return font.clone();
        }
        let font = self
            .resources
            .and_then(|res| document::resource(self.doc, res, b"Font", resource_name.as_bytes()))
            .map(|dict| load_font(self.doc, dict))
            .unwrap_or(PageFont {
                standard: None,
                encoding: FontEncoding::win_ansi(),
                code_width: 1,
            });
        self.fonts.insert(resource_name.to_string(), font.clone());
        font
    }

    fn ext_gstate(&self, name: &[u8]) -> Option<&'a Dictionary> {
        document::resource(self.doc, self.resources?, b"ExtGState", name)
    }

    fn edit_mark_id(&self, operands: &[Object]) -> Option<String> {
        let tag = operands.first()?.as_name().ok()?;
        if tag != EDIT_MARK_TAG.as_bytes() {
            return None;
        }
        let properties = document::resolve_dict(self.doc, operands.get(1)?)?;
        match properties.get(b"Id").ok()? {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    fn finish(self) -> PageLayout {
        let mut runs = Vec::new();
        let mut fills = Vec::new();
        // Walk backwards so every run is checked against the fills painted after it
        for event in self.events.into_iter().rev() {
            match event {
                Event::Fill(fill) => fills.push(fill),
                Event::Run(run) => {
                    let ink = run.ink_box();
                    let covered = fills
                        .iter()
                        .any(|fill: &OpaqueFill| fill.rect.contains_rect(&ink, OCCLUSION_TOLERANCE));
                    if !covered {
                        runs.push(run);
                    }
                }
            }
        }
        runs.reverse();
        fills.reverse();

        PageLayout {
            page: self.page,
            runs,
            skipped: self.skipped,
            fills,
            baked_ids: self.baked_ids,
        }
    }
}

enum TextPiece<'b> {
    Bytes(&'b [u8]),
    Adjust(f64),
}

fn load_font(doc: &Document, dict: &Dictionary) -> PageFont {
    let name_of = |key: &[u8]| -> Option<String> {
        dict.get(key)
            .ok()
            .map(|obj| document::resolve(doc, obj))
            .and_then(|obj| obj.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
    };
    let base_font = name_of(b"BaseFont");
    let subtype = name_of(b"Subtype");
    let standard = base_font.as_deref().and_then(StandardFont::from_name);
    let is_type0 = subtype.as_deref() == Some("Type0");

    if let Some(map) = dict
        .get(b"ToUnicode")
        .ok()
        .and_then(|obj| document::resolve(doc, obj).as_stream().ok())
        .and_then(|stream| {
            let data = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            ToUnicodeMap::parse(&data).ok()
        })
    {
        return PageFont {
            standard,
            code_width: if is_type0 { 2 } else { 1 },
            encoding: FontEncoding::ToUnicode(map),
        };
    }

    let unsupported = |reason: String| PageFont {
        standard,
        encoding: FontEncoding::Unsupported(reason),
        code_width: if is_type0 { 2 } else { 1 },
    };

    if is_type0 {
        return unsupported(format!(
            "composite font {} has no ToUnicode map",
            base_font.as_deref().unwrap_or("(unnamed)")
        ));
    }

    let encoding = dict.get(b"Encoding").ok().map(|obj| document::resolve(doc, obj));
    match encoding {
        Some(Object::Name(name)) => match BaseEncoding::from_name(name) {
            Some(base) => simple_font(standard, base, HashMap::new()),
            None => unsupported(format!("unknown encoding {}", String::from_utf8_lossy(name))),
        },
        Some(Object::Dictionary(enc)) => {
            let base = match enc.get(b"BaseEncoding").ok().and_then(|o| o.as_name().ok()) {
                Some(name) => match BaseEncoding::from_name(name) {
                    Some(base) => base,
                    None => {
                        return unsupported(format!(
                            "unknown base encoding {}",
                            String::from_utf8_lossy(name)
                        ))
                    }
                },
                None => BaseEncoding::default(),
            };
            let overrides = enc
                .get(b"Differences")
                .ok()
                .map(|obj| document::resolve(doc, obj))
                .and_then(|obj| obj.as_array().ok())
                .map(|arr| parse_differences(arr))
                .unwrap_or_default();
            simple_font(standard, base, overrides)
        }
        _ if standard.is_some_and(|f| f.is_symbolic()) => {
            unsupported("symbolic font without ToUnicode".to_string())
        }
        _ => simple_font(standard, BaseEncoding::default(), HashMap::new()),
    }
}

/// For an array of blend modes the first entry is the preferred one.
fn is_normal_blend(mode: &Object) -> bool {
    let name = match mode {
        Object::Array(modes) => modes.first().and_then(|m| m.as_name().ok()),
        other => other.as_name().ok(),
    };
    matches!(name, Some(b"Normal") | Some(b"Compatible") | None)
}

fn simple_font(
    standard: Option<StandardFont>,
    base: BaseEncoding,
    overrides: HashMap<u8, char>,
) -> PageFont {
    PageFont {
        standard,
        encoding: FontEncoding::SingleByte { base, overrides },
        code_width: 1,
    }
}

fn parse_differences(arr: &[Object]) -> HashMap<u8, char> {
    let mut overrides = HashMap::new();
    let mut code: Option<i64> = None;
    for item in arr {
        match item {
            Object::Integer(start) => code = Some(*start),
            Object::Name(name) => {
                if let Some(current) = code {
                    if let (Ok(byte), Some(ch)) = (
                        u8::try_from(current),
                        glyph_name_to_char(&String::from_utf8_lossy(name)),
                    ) {
                        overrides.insert(byte, ch);
                    }
                    code = Some(current + 1);
                }
            }
            _ => {}
        }
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AverageGlyphMetrics;
    use crate::test_support::{
        helvetica_resources, pdf_with_content, pdf_with_resources_from, single_page_pdf,
    };
    use lopdf::{dictionary, Stream};
    use pretty_assertions::assert_eq;

    fn layout_of(bytes: &[u8]) -> PageLayout {
        let doc = RawDocument::from_bytes(bytes).unwrap();
        extract_page(&doc, 1, &AverageGlyphMetrics::default()).unwrap()
    }

    fn texts(layout: &PageLayout) -> Vec<&str> {
        layout.runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_extracts_runs_in_emission_order() {
        let layout = layout_of(&single_page_pdf(&[
            ("Footer", 50.0, 40.0, 9.0),
            ("Hello", 50.0, 700.0, 14.0),
        ]));
        assert_eq!(texts(&layout), vec!["Footer", "Hello"]);
        let hello = &layout.runs[1];
        assert!((hello.origin_x - 50.0).abs() < 1e-3);
        assert!((hello.origin_y - 700.0).abs() < 1e-3);
        assert!((hello.font_size - 14.0).abs() < 1e-6);
        assert!((hello.estimated_width - 5.0 * 0.55 * 14.0).abs() < 1e-3);
        assert_eq!(hello.font_ref, FontRef::PageResource("F1".into()));
    }

    #[test]
    fn test_text_matrix_and_ctm() {
        let content = b"q 2 0 0 2 10 20 cm BT /F1 10 Tf 1 0 0 1 5 5 Tm (Big) Tj ET Q\n";
        let layout = layout_of(&pdf_with_content(content, helvetica_resources()));
        let run = &layout.runs[0];
        assert!((run.origin_x - 20.0).abs() < 1e-6);
        assert!((run.origin_y - 30.0).abs() < 1e-6);
        assert!((run.font_size - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_successive_shows_advance() {
        let content = b"BT /F1 10 Tf 100 500 Td (One) Tj (Two) Tj 0 -14 Td (Three) Tj ET\n";
        let layout = layout_of(&pdf_with_content(content, helvetica_resources()));
        assert_eq!(texts(&layout), vec!["One", "Two", "Three"]);
        assert!(layout.runs[1].origin_x > layout.runs[0].origin_x);
        assert!((layout.runs[2].origin_x - 100.0).abs() < 1e-6);
        assert!((layout.runs[2].origin_y - 486.0).abs() < 1e-6);
    }

    #[test]
    fn test_tj_array_and_quote_operators() {
        let content = b"BT /F1 12 Tf 14 TL 72 720 Td [(Ke) -80 (rned)] TJ (Next) ' ET\n";
        let layout = layout_of(&pdf_with_content(content, helvetica_resources()));
        assert_eq!(texts(&layout), vec!["Kerned", "Next"]);
        assert!((layout.runs[1].origin_y - 706.0).abs() < 1e-6);
        assert!((layout.runs[1].origin_x - 72.0).abs() < 1e-6);
    }

    #[test]
    fn test_type0_without_to_unicode_is_skipped() {
        let mut resources = helvetica_resources();
        resources.set(
            "Font",
            dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica",
                },
                "F2" => dictionary! {
                    "Type" => "Font", "Subtype" => "Type0", "BaseFont" => "ABCDEF+NotoSansCJK",
                    "Encoding" => "Identity-H",
                },
            },
        );
        let content = b"BT /F2 12 Tf 50 600 Td <00110022> Tj /F1 12 Tf 0 -20 Td (Visible) Tj ET\n";
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["Visible"]);
        assert_eq!(layout.skipped.len(), 1);
        assert_eq!(layout.skipped[0].font_resource, "F2");
        assert!(matches!(layout.skipped[0].error, EngineError::UnsupportedEncoding(_)));
    }

    #[test]
    fn test_to_unicode_font() {
        let cmap = b"begincmap\n1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
            2 beginbfchar <0001> <0048> <0002> <0069> endbfchar\nendcmap\n";
        let bytes = pdf_with_resources_from(b"BT /F3 10 Tf 10 10 Td <00010002> Tj ET\n", |doc| {
            let cmap_id = doc.add_object(Stream::new(Dictionary::new(), cmap.to_vec()));
            dictionary! {
                "Font" => dictionary! {
                    "F3" => dictionary! {
                        "Type" => "Font", "Subtype" => "Type0", "BaseFont" => "Custom",
                        "Encoding" => "Identity-H",
                        "ToUnicode" => cmap_id,
                    },
                },
            }
        });
        let layout = layout_of(&bytes);
        assert_eq!(texts(&layout), vec!["Hi"]);
    }

    #[test]
    fn test_differences_encoding() {
        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Times-Roman",
                    "Encoding" => dictionary! {
                        "Type" => "Encoding",
                        "Differences" => vec![1.into(), Object::Name(b"O".to_vec()), Object::Name(b"k".to_vec())],
                    },
                },
            },
        };
        let content = b"BT /F1 10 Tf 10 10 Td <0102> Tj ET\n";
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["Ok"]);
    }

    fn latin_font(encoding: Object) -> Dictionary {
        dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica",
                    "Encoding" => encoding,
                },
            },
        }
    }

    #[test]
    fn test_mac_roman_font_decodes_high_bytes() {
        let content = b"BT /F1 12 Tf 10 10 Td <4361668E> Tj ET\n";
        let resources = latin_font(Object::Name(b"MacRomanEncoding".to_vec()));
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["Caf\u{E9}"]);
    }

    #[test]
    fn test_standard_and_pdf_doc_fonts() {
        let content = b"BT /F1 12 Tf 10 10 Td <6974277320AE> Tj ET\n";
        let resources = latin_font(Object::Name(b"StandardEncoding".to_vec()));
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["it\u{2019}s \u{FB01}"]);

        let content = b"BT /F1 12 Tf 10 10 Td <8441A0> Tj ET\n";
        let resources = latin_font(Object::Name(b"PDFDocEncoding".to_vec()));
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["\u{2014}A\u{20AC}"]);
    }

    #[test]
    fn test_differences_keep_base_encoding() {
        let resources = latin_font(Object::Dictionary(dictionary! {
            "Type" => "Encoding",
            "BaseEncoding" => "MacRomanEncoding",
            "Differences" => vec![1.into(), Object::Name(b"O".to_vec())],
        }));
        let content = b"BT /F1 12 Tf 10 10 Td <018E> Tj ET\n";
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["O\u{E9}"]);
    }

    #[test]
    fn test_unknown_encoding_name_is_skipped() {
        let content = b"BT /F1 12 Tf 10 10 Td (x) Tj ET\n";
        let resources = latin_font(Object::Name(b"MacExpertEncoding".to_vec()));
        let layout = layout_of(&pdf_with_content(content, resources));
        assert!(layout.runs.is_empty());
        assert_eq!(layout.skipped.len(), 1);
    }

    #[test]
    fn test_later_opaque_fill_hides_text() {
        let content = b"BT /F1 12 Tf 50 700 Td (Old) Tj ET\n\
            1 1 1 rg 48 695 40 16 re f\n\
            BT /F1 12 Tf 50 700 Td (New) Tj ET\n";
        let layout = layout_of(&pdf_with_content(content, helvetica_resources()));
        assert_eq!(texts(&layout), vec!["New"]);
        assert_eq!(layout.fills.len(), 1);
        assert_eq!(layout.fills[0].color, Rgb::WHITE);
    }

    #[test]
    fn test_earlier_or_translucent_fill_keeps_text() {
        let content = b"0.9 g 0 0 612 792 re f\n\
            BT /F1 12 Tf 50 700 Td (Kept) Tj ET\n\
            q /GS1 gs 1 1 0 rg 48 695 60 16 re f Q\n\
            BT /F1 12 Tf 50 600 Td (Partly) Tj ET\n\
            1 g 50 598 5 5 re f\n";
        let mut resources = helvetica_resources();
        resources.set(
            "ExtGState",
            dictionary! { "GS1" => dictionary! { "Type" => "ExtGState", "ca" => 0.4 } },
        );
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["Kept", "Partly"]);
        // The translucent highlight is not an opaque fill
        assert_eq!(layout.fills.len(), 2);
        let spot = DocRect::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(layout.background_at(&spot), Some(Rgb::gray(0.9)));
    }

    #[test]
    fn test_multiply_fill_does_not_hide_text() {
        let content = b"BT /F1 12 Tf 50 700 Td (Marked) Tj ET\n\
            q /HL gs 1 1 0 rg 48 695 60 16 re f Q\n\
            BT /F1 12 Tf 50 600 Td (Covered) Tj ET\n\
            /Plain gs 1 g 48 595 80 16 re f\n";
        let mut resources = helvetica_resources();
        resources.set(
            "ExtGState",
            dictionary! {
                "HL" => dictionary! { "Type" => "ExtGState", "ca" => 1.0, "BM" => "Multiply" },
                "Plain" => dictionary! { "Type" => "ExtGState", "BM" => vec![Object::Name(b"Normal".to_vec())] },
            },
        );
        let layout = layout_of(&pdf_with_content(content, resources));
        assert_eq!(texts(&layout), vec!["Marked"]);
        assert_eq!(layout.fills.len(), 1);
    }

    #[test]
    fn test_collects_baked_ids() {
        let content = b"/PdfEditMark <</Id (note-1)>> BDC 0 0 1 RG 10 10 50 50 re S EMC\n\
            /Other <</Id (x)>> BDC EMC\n";
        let layout = layout_of(&pdf_with_content(content, helvetica_resources()));
        assert_eq!(layout.baked_ids.iter().collect::<Vec<_>>(), vec!["note-1"]);
    }

    #[test]
    fn test_page_out_of_range() {
        let doc = RawDocument::from_bytes(&single_page_pdf(&[])).unwrap();
        let err = extract_page(&doc, 2, &AverageGlyphMetrics::default()).unwrap_err();
        assert_eq!(err, EngineError::PageNotFound(2));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let bytes = single_page_pdf(&[("A", 10.0, 10.0, 10.0), ("B", 20.0, 20.0, 10.0)]);
        assert_eq!(layout_of(&bytes), layout_of(&bytes));
    }

    #[test]
    fn test_runs_carry_fingerprint() {
        let doc = RawDocument::from_bytes(&single_page_pdf(&[("A", 10.0, 10.0, 10.0)])).unwrap();
        let layout = extract_page(&doc, 1, &AverageGlyphMetrics::default()).unwrap();
        assert_eq!(layout.runs[0].fingerprint, doc.fingerprint());
    }
}
