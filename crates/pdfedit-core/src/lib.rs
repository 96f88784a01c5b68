//! PDF content-mutation engine
//!
//! Click existing text on a rendered page, edit it in place, and have the
//! edit written into the PDF bytes; bake freeform annotations into page
//! content; map viewer coordinates into PDF space and back.
//!
//! Every call is a pure function over immutable snapshots except
//! [`EditSession`], which owns the current snapshot and its undo history.
//! Caller buffers are copied on entry and never modified.
//!
//! ```no_run
//! use pdfedit_core::{EditSession, ViewerPoint, Zoom};
//!
//! # fn run(bytes: &[u8]) -> pdfedit_core::Result<()> {
//! let mut session = EditSession::default();
//! session.open(bytes)?;
//! if let Some(run) = session.hit_test(1, ViewerPoint::new(120.0, 174.0), Zoom::new(2.0)?)? {
//!     session.replace_run(&run, "Hello, world!")?;
//! }
//! let saved = session.save()?;
//! # drop(saved);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod bake;
pub mod buffer;
pub mod color;
pub mod config;
pub mod coords;
pub mod document;
mod draw;
pub mod encoding;
pub mod error;
pub mod fonts;
pub mod hit;
pub mod layout;
pub mod metrics;
pub mod mutator;
pub mod operations;
pub mod replace;
pub mod session;

#[cfg(test)]
mod test_support;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, AnnotationStyle};
pub use bake::AnnotationBaker;
pub use buffer::{BufferView, OwnedBuffer};
pub use color::Rgb;
pub use config::EngineConfig;
pub use coords::{to_doc_space, to_viewer_space, DocPoint, DocRect, PageGeometry, ViewerPoint, ViewerRect, Zoom};
pub use document::{PageInfo, RawDocument};
pub use error::{EngineError, Result};
pub use fonts::{FontRef, StandardFont};
pub use hit::{find_run_at, runs_in_rect};
pub use layout::{extract_all, extract_page, OpaqueFill, PageLayout, SkippedRun, TextRun};
pub use metrics::{AverageGlyphMetrics, MetricsProvider};
pub use mutator::DocumentMutator;
pub use operations::{EditOperation, ItemKind, MutationOutcome, MutationWarning, WarningItem};
pub use replace::{Replacement, ReplacementEngine};
pub use session::{EditSession, SessionState};
