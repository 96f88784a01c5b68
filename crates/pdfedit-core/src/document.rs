//! Immutable document snapshots
//!
//! A [`RawDocument`] pairs an [`OwnedBuffer`] with the page metadata every
//! component needs (object ids, media boxes, content streams) and a content
//! fingerprint. Snapshots are never modified; mutations build new ones.

use crate::buffer::{self, OwnedBuffer};
use crate::coords::PageGeometry;
use crate::error::{EngineError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Bound on Parent chains and reference hops, against cyclic page trees
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// 1-based page number
    pub number: u32,
    pub object_id: ObjectId,
    pub geometry: PageGeometry,
    pub contents: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct RawDocument {
    buffer: OwnedBuffer,
    pages: Vec<PageInfo>,
    fingerprint: String,
}

impl PartialEq for RawDocument {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.buffer == other.buffer
    }
}

impl RawDocument {
    /// Parse page metadata out of a guarded buffer.
    pub fn load(buffer: OwnedBuffer) -> Result<Self> {
        buffer::validate_header(buffer.as_bytes())?;
        let doc = parse_bytes(buffer.as_bytes())?;

        let pages: Vec<PageInfo> = doc
            .get_pages()
            .into_iter()
            .map(|(number, object_id)| PageInfo {
                number,
                object_id,
                geometry: media_box(&doc, object_id),
                contents: doc.get_page_contents(object_id),
            })
            .collect();

        if pages.is_empty() {
            return Err(EngineError::MalformedDocument(
                "Document has no pages".to_string(),
            ));
        }

        let fingerprint = fingerprint(buffer.as_bytes());
        debug!(
            pages = pages.len(),
            bytes = buffer.len(),
            fingerprint = %&fingerprint[..12],
            "loaded document"
        );

        Ok(Self {
            buffer,
            pages,
            fingerprint,
        })
    }

    /// Copy caller bytes through the buffer guard, then load.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::load(buffer::copy(bytes)?)
    }

    pub fn buffer(&self) -> &OwnedBuffer {
        &self.buffer
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    pub fn page(&self, number: u32) -> Result<&PageInfo> {
        self.pages
            .iter()
            .find(|p| p.number == number)
            .ok_or(EngineError::PageNotFound(number))
    }

    /// Hex SHA-256 of the document bytes
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Fresh object graph for reading or for building the next snapshot.
    pub(crate) fn parse(&self) -> Result<Document> {
        parse_bytes(self.buffer.as_bytes())
    }
}

pub(crate) fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn parse_bytes(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes)
        .map_err(|e| EngineError::MalformedDocument(format!("Failed to parse PDF: {}", e)))
}

/// Follow references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).as_dict().ok()
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Look up an inheritable page attribute, walking the Parent chain.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited(doc, page_id, b"Resources").and_then(|res| resolve_dict(doc, res))
}

/// A named entry of a resource category, e.g. `/Font /F1`.
pub(crate) fn resource<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    category: &[u8],
    name: &[u8],
) -> Option<&'a Dictionary> {
    let entries = resolve_dict(doc, resources.get(category).ok()?)?;
    resolve_dict(doc, entries.get(name).ok()?)
}

/// `/BaseFont` of a page font resource.
pub(crate) fn font_base_name(doc: &Document, page_id: ObjectId, resource_name: &str) -> Option<String> {
    let resources = page_resources(doc, page_id)?;
    let font = resource(doc, resources, b"Font", resource_name.as_bytes())?;
    font.get(b"BaseFont")
        .ok()
        .and_then(|name| name.as_name().ok())
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

/// Page content streams joined with newlines, decompressed where possible.
pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Vec<u8> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        if let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) {
            match stream.decompressed_content() {
                Ok(data) => content.extend_from_slice(&data),
                Err(_) => content.extend_from_slice(&stream.content),
            }
            content.push(b'\n');
        }
    }
    content
}

/// MediaBox as [x, y, width, height], US Letter when absent or unreadable.
fn media_box(doc: &Document, page_id: ObjectId) -> PageGeometry {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| parse_rect(doc, obj))
        .map(|media_box| PageGeometry { media_box })
        .unwrap_or_default()
}

fn parse_rect(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0f64; 4];
    for (i, item) in arr.iter().enumerate() {
        values[i] = number(resolve(doc, item))?;
    }
    let (x0, x1) = (values[0].min(values[2]), values[0].max(values[2]));
    let (y0, y1) = (values[1].min(values[3]), values[1].max(values[3]));
    Some([x0, y0, x1 - x0, y1 - y0])
}
