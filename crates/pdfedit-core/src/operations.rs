//! Edit operations and their outcomes

use crate::annotation::{Annotation, AnnotationId};
use crate::color::Rgb;
use crate::coords::DocRect;
use crate::document::RawDocument;
use crate::error::EngineError;
use crate::replace::Replacement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One undoable mutation of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditOperation {
    /// Cover-and-redraw text replacements
    Replace { replacements: Vec<Replacement> },
    /// Bake annotations into page content
    BakeAnnotations { annotations: Vec<Annotation> },
    /// Opaque rectangle over existing content, nothing redrawn
    Whiteout {
        page: u32,
        rect: DocRect,
        /// Page background color when unset
        #[serde(default)]
        color: Option<Rgb>,
    },
}

impl EditOperation {
    pub fn kind(&self) -> ItemKind {
        match self {
            EditOperation::Replace { .. } => ItemKind::Replacement,
            EditOperation::BakeAnnotations { .. } => ItemKind::Annotation,
            EditOperation::Whiteout { .. } => ItemKind::Whiteout,
        }
    }

    /// Number of independent items in this operation.
    pub fn item_count(&self) -> usize {
        match self {
            EditOperation::Replace { replacements } => replacements.len(),
            EditOperation::BakeAnnotations { annotations } => annotations.len(),
            EditOperation::Whiteout { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Replacement,
    Annotation,
    Whiteout,
}

impl ItemKind {
    fn noun(&self, count: usize) -> &'static str {
        match (self, count) {
            (ItemKind::Replacement, 1) => "replacement",
            (ItemKind::Replacement, _) => "replacements",
            (ItemKind::Annotation, 1) => "annotation",
            (ItemKind::Annotation, _) => "annotations",
            (ItemKind::Whiteout, 1) => "whiteout",
            (ItemKind::Whiteout, _) => "whiteouts",
        }
    }
}

/// Which item of an operation a warning is about
#[derive(Debug, Clone, PartialEq)]
pub enum WarningItem {
    Replacement { index: usize, old_text: String },
    Annotation(AnnotationId),
    Whiteout { page: u32 },
}

impl fmt::Display for WarningItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningItem::Replacement { index, old_text } => {
                write!(f, "replacement #{} ({:?})", index, old_text)
            }
            WarningItem::Annotation(id) => write!(f, "annotation {}", id),
            WarningItem::Whiteout { page } => write!(f, "whiteout on page {}", page),
        }
    }
}

/// An item that was skipped while the rest of the operation went ahead
#[derive(Debug, Clone, PartialEq)]
pub struct MutationWarning {
    pub item: WarningItem,
    pub error: EngineError,
}

impl fmt::Display for MutationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}

/// A new snapshot plus the items that could not be applied to it
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub document: RawDocument,
    pub warnings: Vec<MutationWarning>,
    pub kind: ItemKind,
    /// Items the operation asked for
    pub attempted: usize,
}

impl MutationOutcome {
    pub fn applied(&self) -> usize {
        self.attempted.saturating_sub(self.warnings.len())
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Whether the annotation with this id was skipped.
    pub fn skipped_annotation(&self, id: &AnnotationId) -> Option<&EngineError> {
        self.warnings.iter().find_map(|w| match &w.item {
            WarningItem::Annotation(skipped) if skipped == id => Some(&w.error),
            _ => None,
        })
    }
}

impl fmt::Display for MutationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.warnings.is_empty() {
            write!(f, "{} {} applied", self.attempted, self.kind.noun(self.attempted))
        } else {
            write!(
                f,
                "{} of {} {} could not be applied",
                self.warnings.len(),
                self.attempted,
                self.kind.noun(self.attempted)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::single_page_pdf;

    fn outcome(kind: ItemKind, attempted: usize, failed: usize) -> MutationOutcome {
        let document = RawDocument::from_bytes(&single_page_pdf(&[])).unwrap();
        let warnings = (0..failed)
            .map(|index| MutationWarning {
                item: WarningItem::Replacement {
                    index,
                    old_text: "x".into(),
                },
                error: EngineError::FontResolutionFailure("F9".into()),
            })
            .collect();
        MutationOutcome {
            document,
            warnings,
            kind,
            attempted,
        }
    }

    #[test]
    fn test_operation_kind_and_item_count() {
        let whiteout = EditOperation::Whiteout {
            page: 1,
            rect: DocRect::new(0.0, 0.0, 10.0, 10.0),
            color: None,
        };
        assert_eq!(whiteout.kind(), ItemKind::Whiteout);
        assert_eq!(whiteout.item_count(), 1);

        let bake = EditOperation::BakeAnnotations {
            annotations: vec![
                Annotation::highlight("a", 1, vec![DocRect::new(0.0, 0.0, 5.0, 5.0)]),
                Annotation::highlight("b", 1, vec![DocRect::new(5.0, 5.0, 5.0, 5.0)]),
            ],
        };
        assert_eq!(bake.kind(), ItemKind::Annotation);
        assert_eq!(bake.item_count(), 2);

        let replace = EditOperation::Replace { replacements: vec![] };
        assert_eq!(replace.kind(), ItemKind::Replacement);
        assert_eq!(replace.item_count(), 0);
    }

    #[test]
    fn test_summary_wording() {
        assert_eq!(
            outcome(ItemKind::Replacement, 5, 2).to_string(),
            "2 of 5 replacements could not be applied"
        );
        assert_eq!(outcome(ItemKind::Replacement, 3, 0).to_string(), "3 replacements applied");
        assert_eq!(outcome(ItemKind::Annotation, 1, 0).to_string(), "1 annotation applied");
        assert_eq!(outcome(ItemKind::Replacement, 5, 2).applied(), 3);
    }

    #[test]
    fn test_operation_serde_is_tagged() {
        let op = EditOperation::Whiteout {
            page: 1,
            rect: DocRect::new(0.0, 0.0, 10.0, 10.0),
            color: None,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "Whiteout");
        let back: EditOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_warning_display_names_item() {
        let warning = MutationWarning {
            item: WarningItem::Replacement {
                index: 1,
                old_text: "B".into(),
            },
            error: EngineError::FontResolutionFailure("no font resource F9".into()),
        };
        assert_eq!(
            warning.to_string(),
            "replacement #1 (\"B\"): Font could not be resolved: no font resource F9"
        );
    }
}
