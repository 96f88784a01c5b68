//! Document mutator
//!
//! The only component that produces new document bytes. Planned overlays
//! are appended to their pages, required resources are added, and the result
//! is serialized and loaded back as a fresh snapshot. On any failure the input
//! is left as it was and no partial result is returned.

use crate::bake::AnnotationBaker;
use crate::buffer::{self, OwnedBuffer};
use crate::config::EngineConfig;
use crate::document::{self, RawDocument};
use crate::draw::{font_dictionary, Overlay};
use crate::error::{EngineError, Result};
use crate::layout;
use crate::metrics::{AverageGlyphMetrics, MetricsProvider};
use crate::operations::{EditOperation, ItemKind, MutationOutcome, MutationWarning, WarningItem};
use crate::replace::ReplacementEngine;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Content stream opening the save/restore pair around original page content
const WRAP_OPEN: &[u8] = b"q\n";
const WRAP_CLOSE: &[u8] = b"\nQ\n";
/// Private stream dictionary key marking the streams this engine wrapped a page with
const WRAP_KEY: &[u8] = b"PdfEditWrap";

/// Overlays per page plus the items that were skipped while planning
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub kind: ItemKind,
    pub attempted: usize,
    pub overlays: BTreeMap<u32, Overlay>,
    pub warnings: Vec<MutationWarning>,
}

impl Plan {
    pub fn new(kind: ItemKind, attempted: usize) -> Self {
        Self {
            kind,
            attempted,
            overlays: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add(&mut self, page: u32, overlay: Overlay) {
        self.overlays.entry(page).or_default().extend(overlay);
    }

    fn is_empty(&self) -> bool {
        self.overlays.values().all(Overlay::is_empty)
    }
}

#[derive(Clone)]
pub struct DocumentMutator {
    config: EngineConfig,
    metrics: Arc<dyn MetricsProvider>,
}

impl Default for DocumentMutator {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            metrics: Arc::new(AverageGlyphMetrics::default()),
        }
    }
}

impl DocumentMutator {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: Arc::new(AverageGlyphMetrics::default()),
        })
    }

    pub fn with_metrics(config: EngineConfig, metrics: Arc<dyn MetricsProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, metrics })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &dyn MetricsProvider {
        self.metrics.as_ref()
    }

    /// Validate and load `buffer`, then apply one operation to it.
    pub fn mutate(&self, buffer: &OwnedBuffer, operation: &EditOperation) -> Result<MutationOutcome> {
        let document = RawDocument::load(buffer.clone())?;
        self.apply(&document, operation)
    }

    pub fn apply(&self, document: &RawDocument, operation: &EditOperation) -> Result<MutationOutcome> {
        debug!(kind = ?operation.kind(), items = operation.item_count(), "applying operation");
        match operation {
            EditOperation::Replace { replacements } => {
                ReplacementEngine::new(&self.config, self.metrics.as_ref()).apply(document, replacements)
            }
            EditOperation::BakeAnnotations { annotations } => {
                AnnotationBaker::new(&self.config, self.metrics.as_ref()).bake(document, annotations)
            }
            EditOperation::Whiteout { page, rect, color } => {
                let mut doc = document.parse()?;
                let mut plan = Plan::new(operation.kind(), operation.item_count());
                let planned = document.page(*page).and_then(|info| {
                    if !rect.is_drawable() {
                        return Err(EngineError::InvalidGeometry(format!(
                            "whiteout rectangle {:?} is empty or not finite",
                            rect
                        )));
                    }
                    let fill = match color {
                        Some(color) => *color,
                        None => layout::extract_from(
                            &doc,
                            info.object_id,
                            *page,
                            document.fingerprint(),
                            self.metrics.as_ref(),
                        )?
                        .background_at(rect)
                        .unwrap_or(self.config.default_background),
                    };
                    let mut overlay = Overlay::default();
                    overlay.cover(rect, fill);
                    Ok(overlay)
                });
                match planned {
                    Ok(overlay) => plan.add(*page, overlay),
                    Err(error) => {
                        warn!(page, %error, "skipping whiteout");
                        plan.warnings.push(MutationWarning {
                            item: WarningItem::Whiteout { page: *page },
                            error,
                        });
                    }
                }
                commit(document, &mut doc, plan, &self.config)
            }
        }
    }
}

/// Write planned overlays into `doc` and serialize it as the next snapshot.
pub(crate) fn commit(
    document: &RawDocument,
    doc: &mut Document,
    plan: Plan,
    config: &EngineConfig,
) -> Result<MutationOutcome> {
    if plan.is_empty() {
        debug!(kind = ?plan.kind, "nothing to write, keeping snapshot");
        return Ok(MutationOutcome {
            document: document.clone(),
            warnings: plan.warnings,
            kind: plan.kind,
            attempted: plan.attempted,
        });
    }

    for (page, overlay) in &plan.overlays {
        if overlay.is_empty() {
            continue;
        }
        let page_id = document.page(*page)?.object_id;
        add_resources(doc, page_id, overlay)?;
        append_overlay(doc, page_id, overlay)?;
        debug!(page, operators = overlay.operations.len(), "wrote page overlay");
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| EngineError::SerializationError(e.to_string()))?;

    if let Some(limit) = config.max_output_bytes {
        if output.len() > limit {
            return Err(EngineError::SerializationError(format!(
                "output is {} bytes, limit is {}",
                output.len(),
                limit
            )));
        }
    }
    buffer::validate_header(&output)
        .map_err(|e| EngineError::SerializationError(format!("invalid output: {}", e)))?;

    let document = OwnedBuffer::from_vec(output)
        .and_then(RawDocument::load)
        .map_err(|e| EngineError::SerializationError(format!("output does not reload: {}", e)))?;

    Ok(MutationOutcome {
        document,
        warnings: plan.warnings,
        kind: plan.kind,
        attempted: plan.attempted,
    })
}

/// Give the page its own resource dictionary holding the overlay's fonts and
/// transparency states. Shared or inherited resources are copied, never edited.
fn add_resources(doc: &mut Document, page_id: ObjectId, overlay: &Overlay) -> Result<()> {
    let mut resources = document::page_resources(doc, page_id)
        .cloned()
        .unwrap_or_default();

    if !overlay.fonts.is_empty() {
        let mut fonts = category(doc, &resources, b"Font");
        for font in &overlay.fonts {
            fonts.set(font.resource_name(), Object::Dictionary(font_dictionary(*font)));
        }
        resources.set("Font", Object::Dictionary(fonts));
    }

    if !overlay.transparencies.is_empty() {
        let mut states = category(doc, &resources, b"ExtGState");
        for (name, transparency) in &overlay.transparencies {
            states.set(name.as_str(), Object::Dictionary(transparency.to_dictionary()));
        }
        resources.set("ExtGState", Object::Dictionary(states));
    }

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Resolved copy of one resource category, empty when absent.
fn category(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| document::resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default()
}

fn wrap_dictionary() -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set(WRAP_KEY, Object::Boolean(true));
    dict
}

fn append_overlay(doc: &mut Document, page_id: ObjectId, overlay: &Overlay) -> Result<()> {
    let mut encoded = Content {
        operations: overlay.operations.clone(),
    }
    .encode()
    .map_err(|e| EngineError::SerializationError(e.to_string()))?;
    // lopdf joins content streams without separators
    encoded.insert(0, b'\n');
    encoded.push(b'\n');

    let existing = doc.get_page_contents(page_id);
    let already_wrapped = existing
        .first()
        .and_then(|id| doc.get_object(*id).ok())
        .and_then(|obj| obj.as_stream().ok())
        .is_some_and(|stream| stream.dict.has(WRAP_KEY));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if already_wrapped || existing.is_empty() {
        contents.extend(existing.iter().copied());
    } else {
        let open = doc.add_object(Stream::new(wrap_dictionary(), WRAP_OPEN.to_vec()));
        let close = doc.add_object(Stream::new(wrap_dictionary(), WRAP_CLOSE.to_vec()));
        contents.push(open);
        contents.extend(existing.iter().copied());
        contents.push(close);
    }
    contents.push(doc.add_object(Stream::new(Dictionary::new(), encoded)));

    page_dict_mut(doc, page_id)?.set(
        "Contents",
        Object::Array(contents.into_iter().map(Object::Reference).collect()),
    );
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| EngineError::MalformedDocument(format!("page object {:?}: {}", page_id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::coords::DocRect;
    use crate::layout::extract_page;
    use crate::replace::Replacement;
    use crate::test_support::{multi_page_pdf, single_page_pdf};
    use pretty_assertions::assert_eq;

    fn texts(document: &RawDocument, page: u32) -> Vec<String> {
        extract_page(document, page, &AverageGlyphMetrics::default())
            .unwrap()
            .runs
            .into_iter()
            .map(|r| r.text)
            .collect()
    }

    #[test]
    fn test_mutate_from_buffer() {
        let buffer = buffer::copy(&single_page_pdf(&[("Hello", 50.0, 700.0, 14.0)])).unwrap();
        let op = EditOperation::Replace {
            replacements: vec![Replacement {
                page: 1,
                old_text: "Hello".into(),
                new_text: "Howdy".into(),
                x: 50.0,
                y: 700.0,
                font_size: 14.0,
                color: None,
                font: Default::default(),
                old_width: None,
            }],
        };
        let outcome = DocumentMutator::default().mutate(&buffer, &op).unwrap();
        assert_eq!(texts(&outcome.document, 1), vec!["Howdy"]);
        assert!(buffer::is_plausible(outcome.document.bytes()));
    }

    #[test]
    fn test_rejects_malformed_input() {
        let buffer = buffer::copy(b"not a pdf at all").unwrap();
        let op = EditOperation::Whiteout {
            page: 1,
            rect: DocRect::new(0.0, 0.0, 10.0, 10.0),
            color: None,
        };
        let err = DocumentMutator::default().mutate(&buffer, &op).unwrap_err();
        assert!(matches!(err, EngineError::MalformedDocument(_)));
    }

    #[test]
    fn test_whiteout_hides_text_on_one_page_only() {
        let document = RawDocument::from_bytes(&multi_page_pdf(2)).unwrap();
        let op = EditOperation::Whiteout {
            page: 2,
            rect: DocRect::new(90.0, 690.0, 100.0, 30.0),
            color: Some(Rgb::WHITE),
        };
        let outcome = DocumentMutator::default().apply(&document, &op).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(texts(&outcome.document, 1), vec!["Page 1"]);
        assert!(texts(&outcome.document, 2).is_empty());
    }

    #[test]
    fn test_whiteout_bad_rect_is_warning() {
        let document = RawDocument::from_bytes(&multi_page_pdf(1)).unwrap();
        let op = EditOperation::Whiteout {
            page: 1,
            rect: DocRect::new(0.0, 0.0, 0.0, 10.0),
            color: None,
        };
        let outcome = DocumentMutator::default().apply(&document, &op).unwrap();
        assert_eq!(outcome.document, document);
        assert!(matches!(outcome.warnings[0].error, EngineError::InvalidGeometry(_)));
    }

    #[test]
    fn test_output_limit() {
        let config = EngineConfig {
            max_output_bytes: Some(64),
            ..EngineConfig::default()
        };
        let mutator = DocumentMutator::new(config).unwrap();
        let document = RawDocument::from_bytes(&multi_page_pdf(1)).unwrap();
        let op = EditOperation::Whiteout {
            page: 1,
            rect: DocRect::new(0.0, 0.0, 10.0, 10.0),
            color: None,
        };
        let err = mutator.apply(&document, &op).unwrap_err();
        assert!(matches!(err, EngineError::SerializationError(_)));
    }

    #[test]
    fn test_shared_resources_are_not_modified() {
        let document = RawDocument::from_bytes(&multi_page_pdf(2)).unwrap();
        let op = EditOperation::Replace {
            replacements: vec![Replacement {
                page: 1,
                old_text: "Page 1".into(),
                new_text: "First".into(),
                x: 100.0,
                y: 700.0,
                font_size: 12.0,
                color: None,
                font: crate::fonts::FontRef::Named("Courier".into()),
                old_width: None,
            }],
        };
        let outcome = DocumentMutator::default().apply(&document, &op).unwrap();
        let doc = outcome.document.parse().unwrap();
        let page2 = outcome.document.page(2).unwrap().object_id;
        let resources = document::page_resources(&doc, page2).unwrap();
        let fonts = document::resolve_dict(&doc, resources.get(b"Font").unwrap()).unwrap();
        assert!(fonts.get(b"PdfEditCourier").is_err());
        assert_eq!(texts(&outcome.document, 2), vec!["Page 2"]);
    }

    #[test]
    fn test_repeated_edits_wrap_once() {
        let mutator = DocumentMutator::default();
        let mut document = RawDocument::from_bytes(&multi_page_pdf(1)).unwrap();
        for _ in 0..3 {
            let op = EditOperation::Whiteout {
                page: 1,
                rect: DocRect::new(0.0, 0.0, 10.0, 10.0),
                color: None,
            };
            document = mutator.apply(&document, &op).unwrap().document;
        }
        // open, original, close, three overlays
        assert_eq!(document.page(1).unwrap().contents.len(), 6);
    }

    #[test]
    fn test_page_starting_with_bare_save_is_still_wrapped() {
        // First stream is a lone "q" and the second never restores it
        let mut doc = Document::load_mem(&multi_page_pdf(1)).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let body = doc.add_object(Stream::new(
            Dictionary::new(),
            b"2 0 0 2 0 0 cm BT /F1 6 Tf 50 350 Td (Page 1) Tj ET\n".to_vec(),
        ));
        page_dict_mut(&mut doc, page_id)
            .unwrap()
            .set("Contents", vec![Object::Reference(open), Object::Reference(body)]);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let document = RawDocument::from_bytes(&bytes).unwrap();

        let op = EditOperation::Whiteout {
            page: 1,
            rect: DocRect::new(300.0, 300.0, 10.0, 10.0),
            color: None,
        };
        let outcome = DocumentMutator::default().apply(&document, &op).unwrap();
        let contents = &outcome.document.page(1).unwrap().contents;
        // wrapper open, both original streams, wrapper close, overlay
        assert_eq!(contents.len(), 5);

        let doc = outcome.document.parse().unwrap();
        let first = doc.get_object(contents[0]).unwrap().as_stream().unwrap();
        assert!(first.dict.has(WRAP_KEY));
        // The overlay is drawn in unscaled page space
        let layout = extract_page(&outcome.document, 1, &AverageGlyphMetrics::default()).unwrap();
        assert_eq!(layout.fills.len(), 1);
        assert_eq!(layout.fills[0].rect, DocRect::new(300.0, 300.0, 10.0, 10.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            cover_margin: -1.0,
            ..EngineConfig::default()
        };
        assert!(DocumentMutator::new(config).is_err());
    }
}
