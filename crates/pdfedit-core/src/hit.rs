//! Hit testing of document-space points against extracted text runs

use crate::coords::{DocPoint, DocRect};
use crate::layout::TextRun;

/// The run under `point`, if any.
///
/// Overlapping candidates resolve to the smallest hit box; equal areas resolve
/// to the run emitted first. `None` means the point is over empty page area.
pub fn find_run_at(point: DocPoint, runs: &[TextRun]) -> Option<&TextRun> {
    if !point.is_finite() {
        return None;
    }
    let mut best: Option<(&TextRun, f64)> = None;
    for run in runs {
        let hit_box = run.hit_box();
        if !hit_box.contains_point(point) {
            continue;
        }
        let area = hit_box.area();
        match best {
            Some((_, best_area)) if area >= best_area => {}
            _ => best = Some((run, area)),
        }
    }
    best.map(|(run, _)| run)
}

/// Runs whose hit box intersects a selection rectangle, in emission order.
pub fn runs_in_rect<'a>(rect: &DocRect, runs: &'a [TextRun]) -> Vec<&'a TextRun> {
    if !rect.is_finite() {
        return Vec::new();
    }
    runs.iter().filter(|run| run.hit_box().intersects(rect)).collect()
}
