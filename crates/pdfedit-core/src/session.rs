//! Edit session for a single open document
//!
//! Holds the current snapshot, an undoable history of operations and the
//! pending annotation list. Snapshots are swapped in only after a mutation
//! fully succeeds; undo and redo restore stored snapshots instead of
//! replaying inverse operations.

use crate::annotation::{Annotation, AnnotationId};
use crate::buffer::{self, BufferView, OwnedBuffer};
use crate::color::Rgb;
use crate::config::EngineConfig;
use crate::coords::{DocRect, ViewerPoint, Zoom};
use crate::document::RawDocument;
use crate::error::{EngineError, Result};
use crate::hit;
use crate::layout::{self, PageLayout, TextRun};
use crate::metrics::MetricsProvider;
use crate::mutator::DocumentMutator;
use crate::operations::{EditOperation, MutationOutcome};
use crate::replace::Replacement;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document opened yet
    Empty,
    /// Current snapshot matches the last save (or the opened bytes)
    Loaded,
    /// Current snapshot has unsaved changes
    Dirty,
    Closed,
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    operation: EditOperation,
    before: RawDocument,
    after: RawDocument,
    baked_before: BTreeSet<AnnotationId>,
    baked_after: BTreeSet<AnnotationId>,
}

pub struct EditSession {
    mutator: DocumentMutator,
    state: SessionState,
    current: Option<RawDocument>,
    saved_fingerprint: Option<String>,
    history: Vec<HistoryEntry>,
    /// Number of history entries currently applied
    cursor: usize,
    annotations: Vec<Annotation>,
    baked: BTreeSet<AnnotationId>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::from_mutator(DocumentMutator::default())
    }
}

impl EditSession {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self::from_mutator(DocumentMutator::new(config)?))
    }

    pub fn with_metrics(config: EngineConfig, metrics: Arc<dyn MetricsProvider>) -> Result<Self> {
        Ok(Self::from_mutator(DocumentMutator::with_metrics(config, metrics)?))
    }

    fn from_mutator(mutator: DocumentMutator) -> Self {
        Self {
            mutator,
            state: SessionState::Empty,
            current: None,
            saved_fingerprint: None,
            history: Vec::new(),
            cursor: 0,
            annotations: Vec::new(),
            baked: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Copy `bytes` through the buffer guard and open them for editing.
    pub fn open(&mut self, bytes: &[u8]) -> Result<()> {
        match self.state {
            SessionState::Empty => {}
            SessionState::Closed => return Err(EngineError::SessionClosed),
            state => {
                return Err(EngineError::InvalidState(format!(
                    "a document is already open ({:?})",
                    state
                )))
            }
        }

        let document = RawDocument::load(buffer::copy(bytes)?)?;
        info!(
            pages = document.page_count(),
            bytes = document.buffer().len(),
            "opened document for editing"
        );
        self.saved_fingerprint = Some(document.fingerprint().to_string());
        self.current = Some(document);
        self.state = SessionState::Loaded;
        Ok(())
    }

    pub fn current(&self) -> Result<&RawDocument> {
        match self.state {
            SessionState::Closed => Err(EngineError::SessionClosed),
            _ => self
                .current
                .as_ref()
                .ok_or_else(|| EngineError::InvalidState("no document is open".to_string())),
        }
    }

    /// Non-owning view of the current snapshot for a viewer.
    pub fn view(&self) -> Result<BufferView> {
        Ok(self.current()?.buffer().view())
    }

    pub fn page_count(&self) -> Result<u32> {
        Ok(self.current()?.page_count())
    }

    /// Apply one operation. On success the new snapshot becomes current and
    /// the operation is recorded; an operation that changed nothing is not.
    pub fn apply(&mut self, operation: EditOperation) -> Result<MutationOutcome> {
        let before = self.current()?.clone();
        let outcome = self.mutator.apply(&before, &operation)?;

        if outcome.document == before {
            debug!(warnings = outcome.warnings.len(), "operation left the document unchanged");
            return Ok(outcome);
        }

        let baked_before = self.baked.clone();
        let mut baked_after = baked_before.clone();
        if let EditOperation::BakeAnnotations { annotations } = &operation {
            for annotation in annotations {
                match outcome.skipped_annotation(&annotation.id) {
                    None | Some(EngineError::DuplicateAnnotation(_)) => {
                        baked_after.insert(annotation.id.clone());
                    }
                    Some(_) => {}
                }
            }
        }

        self.history.truncate(self.cursor);
        self.history.push(HistoryEntry {
            operation,
            before,
            after: outcome.document.clone(),
            baked_before,
            baked_after: baked_after.clone(),
        });
        if let Some(max) = self.mutator.config().max_history {
            if self.history.len() > max {
                let excess = self.history.len() - max;
                self.history.drain(..excess);
            }
        }
        self.cursor = self.history.len();

        self.current = Some(outcome.document.clone());
        self.baked = baked_after;
        self.refresh_state();
        debug!(history = self.history.len(), "applied operation");
        Ok(outcome)
    }

    pub fn replace(&mut self, replacements: Vec<Replacement>) -> Result<MutationOutcome> {
        self.apply(EditOperation::Replace { replacements })
    }

    /// Replace the text of a run extracted from the current snapshot.
    pub fn replace_run(&mut self, run: &TextRun, new_text: &str) -> Result<MutationOutcome> {
        if run.fingerprint != self.current()?.fingerprint() {
            return Err(EngineError::StaleTextRun);
        }
        self.replace(vec![Replacement::from_run(run, new_text)])
    }

    pub fn whiteout(&mut self, page: u32, rect: DocRect, color: Option<Rgb>) -> Result<MutationOutcome> {
        self.apply(EditOperation::Whiteout { page, rect, color })
    }

    /// Bake every annotation in the list that is not baked yet.
    pub fn bake_pending(&mut self) -> Result<MutationOutcome> {
        self.current()?;
        let pending: Vec<Annotation> = self
            .annotations
            .iter()
            .filter(|a| !self.baked.contains(&a.id))
            .cloned()
            .collect();
        self.apply(EditOperation::BakeAnnotations {
            annotations: pending,
        })
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.history.len()
    }

    /// Step back one operation; a no-op when there is nothing to undo.
    pub fn undo(&mut self) {
        if !self.is_editing() || !self.can_undo() {
            return;
        }
        self.cursor -= 1;
        let entry = &self.history[self.cursor];
        self.current = Some(entry.before.clone());
        self.baked = entry.baked_before.clone();
        self.refresh_state();
        debug!(cursor = self.cursor, "undo");
    }

    /// Re-apply the next undone operation; a no-op when there is none.
    pub fn redo(&mut self) {
        if !self.is_editing() || !self.can_redo() {
            return;
        }
        let entry = &self.history[self.cursor];
        self.current = Some(entry.after.clone());
        self.baked = entry.baked_after.clone();
        self.cursor += 1;
        self.refresh_state();
        debug!(cursor = self.cursor, "redo");
    }

    /// Operations that undo would step back through, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &EditOperation> {
        self.history[..self.cursor].iter().map(|e| &e.operation)
    }

    /// Hand out the current bytes for writing and mark them saved.
    pub fn save(&mut self) -> Result<OwnedBuffer> {
        let buffer = self.current()?.buffer().clone();
        self.saved_fingerprint = self.current.as_ref().map(|d| d.fingerprint().to_string());
        self.state = SessionState::Loaded;
        info!(bytes = buffer.len(), "saved document");
        Ok(buffer)
    }

    /// Release every snapshot. Outstanding views detach.
    pub fn close(&mut self) {
        self.current = None;
        self.history.clear();
        self.cursor = 0;
        self.annotations.clear();
        self.baked.clear();
        self.saved_fingerprint = None;
        self.state = SessionState::Closed;
        info!("closed edit session");
    }

    pub fn extract(&self, page: u32) -> Result<PageLayout> {
        layout::extract_page(self.current()?, page, self.mutator.metrics())
    }

    /// The run under a viewer point on a page, at the given zoom.
    pub fn hit_test(&self, page: u32, point: ViewerPoint, zoom: Zoom) -> Result<Option<TextRun>> {
        let geometry = self.current()?.page(page)?.geometry;
        let doc_point = geometry.to_doc_space(point, zoom);
        let page_layout = self.extract(page)?;
        Ok(hit::find_run_at(doc_point, &page_layout.runs).cloned())
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<()> {
        self.current()?;
        if self.annotations.iter().any(|a| a.id == annotation.id) || self.baked.contains(&annotation.id) {
            return Err(EngineError::DuplicateAnnotation(annotation.id.to_string()));
        }
        self.annotations.push(annotation);
        Ok(())
    }

    /// Replace a pending annotation with the same id. Baked annotations are
    /// part of the page content and cannot change.
    pub fn update_annotation(&mut self, annotation: Annotation) -> Result<()> {
        self.current()?;
        if self.baked.contains(&annotation.id) {
            return Err(EngineError::InvalidState(format!(
                "annotation {} is already baked",
                annotation.id
            )));
        }
        let slot = self
            .annotations
            .iter_mut()
            .find(|a| a.id == annotation.id)
            .ok_or_else(|| EngineError::AnnotationNotFound(annotation.id.to_string()))?;
        *slot = annotation;
        Ok(())
    }

    /// Drop a pending annotation. Baked annotations stay listed so undoing
    /// the bake can return them to pending.
    pub fn remove_annotation(&mut self, id: &AnnotationId) -> Result<Annotation> {
        self.current()?;
        if self.baked.contains(id) {
            return Err(EngineError::InvalidState(format!("annotation {} is already baked", id)));
        }
        let index = self
            .annotations
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| EngineError::AnnotationNotFound(id.to_string()))?;
        Ok(self.annotations.remove(index))
    }

    pub fn is_baked(&self, id: &AnnotationId) -> bool {
        self.baked.contains(id)
    }

    fn is_editing(&self) -> bool {
        matches!(self.state, SessionState::Loaded | SessionState::Dirty)
    }

    fn refresh_state(&mut self) {
        let unchanged = match (&self.current, &self.saved_fingerprint) {
            (Some(current), Some(saved)) => current.fingerprint() == saved,
            _ => false,
        };
        self.state = if unchanged {
            SessionState::Loaded
        } else {
            SessionState::Dirty
        };
    }
}
