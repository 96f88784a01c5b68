//! Coordinate transformation between viewer and PDF coordinate systems
//!
//! PDF content space has its origin at the bottom-left in unscaled page units.
//! Viewer space has its origin at the top-left in zoomed pixels. Transforms are
//! stateless: recompute after every zoom change, never cache the results.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Point in PDF content space (points, origin bottom-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Point in viewer space (pixels, origin top-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewerPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewerPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in PDF space; (x, y) is the bottom-left corner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DocRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DocRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two arbitrary corners.
    pub fn from_corners(a: DocPoint, b: DocPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> DocPoint {
        DocPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains_point(&self, p: DocPoint) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.top()
    }

    /// Whether `other` lies entirely inside this rectangle, within `tolerance`.
    pub fn contains_rect(&self, other: &DocRect, tolerance: f64) -> bool {
        other.x >= self.x - tolerance
            && other.y >= self.y - tolerance
            && other.right() <= self.right() + tolerance
            && other.top() <= self.top() + tolerance
    }

    pub fn intersects(&self, other: &DocRect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.top()
            && other.y <= self.top()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Finite with strictly positive extent.
    pub fn is_drawable(&self) -> bool {
        self.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Rectangle in viewer space; (x, y) is the top-left corner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewerRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Validated zoom factor (finite and positive)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Zoom(f64);

impl Zoom {
    pub const ACTUAL_SIZE: Zoom = Zoom(1.0);

    pub fn new(factor: f64) -> Result<Self> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(EngineError::InvalidZoom(factor))
        }
    }

    pub fn factor(&self) -> f64 {
        self.0
    }
}

/// Convert a viewer point to PDF space on a page of the given height.
pub fn to_doc_space(point: ViewerPoint, page_height: f64, zoom: Zoom) -> DocPoint {
    DocPoint {
        x: point.x / zoom.0,
        y: page_height - point.y / zoom.0,
    }
}

/// Inverse of [`to_doc_space`].
pub fn to_viewer_space(point: DocPoint, page_height: f64, zoom: Zoom) -> ViewerPoint {
    ViewerPoint {
        x: point.x * zoom.0,
        y: (page_height - point.y) * zoom.0,
    }
}

/// Page media box, used when the box origin is not (0, 0)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageGeometry {
    /// [x, y, width, height]
    pub media_box: [f64; 4],
}

impl PageGeometry {
    pub const US_LETTER: PageGeometry = PageGeometry {
        media_box: [0.0, 0.0, 612.0, 792.0],
    };

    pub fn width(&self) -> f64 {
        self.media_box[2]
    }

    pub fn height(&self) -> f64 {
        self.media_box[3]
    }

    pub fn to_doc_space(&self, point: ViewerPoint, zoom: Zoom) -> DocPoint {
        let [mb_x, mb_y, _, mb_height] = self.media_box;
        let p = to_doc_space(point, mb_height, zoom);
        DocPoint::new(mb_x + p.x, mb_y + p.y)
    }

    pub fn to_viewer_space(&self, point: DocPoint, zoom: Zoom) -> ViewerPoint {
        let [mb_x, mb_y, _, mb_height] = self.media_box;
        to_viewer_space(
            DocPoint::new(point.x - mb_x, point.y - mb_y),
            mb_height,
            zoom,
        )
    }

    /// Viewer overlay rectangle for a PDF-space rectangle.
    pub fn rect_to_viewer(&self, rect: &DocRect, zoom: Zoom) -> ViewerRect {
        // The PDF top edge becomes the viewer top-left corner
        let top_left = self.to_viewer_space(DocPoint::new(rect.x, rect.top()), zoom);
        ViewerRect {
            x: top_left.x,
            y: top_left.y,
            width: rect.width * zoom.0,
            height: rect.height * zoom.0,
        }
    }

    pub fn rect_to_doc(&self, rect: &ViewerRect, zoom: Zoom) -> DocRect {
        let a = self.to_doc_space(ViewerPoint::new(rect.x, rect.y), zoom);
        let b = self.to_doc_space(
            ViewerPoint::new(rect.x + rect.width, rect.y + rect.height),
            zoom,
        );
        DocRect::from_corners(a, b)
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::US_LETTER
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: viewer -> doc -> viewer returns the original point
        #[test]
        fn roundtrip_viewer_to_doc_to_viewer(
            x in -5000.0f64..5000.0,
            y in -5000.0f64..5000.0,
            page_height in 1.0f64..5000.0,
            zoom in 0.05f64..16.0,
        ) {
            let zoom = Zoom::new(zoom).unwrap();
            let viewer = ViewerPoint::new(x, y);
            let back = to_viewer_space(to_doc_space(viewer, page_height, zoom), page_height, zoom);

            let tolerance = 1e-6 * (1.0 + x.abs().max(y.abs()));
            prop_assert!((back.x - x).abs() < tolerance, "x: {} -> {}", x, back.x);
            prop_assert!((back.y - y).abs() < tolerance, "y: {} -> {}", y, back.y);
        }

        /// Property: doc -> viewer -> doc returns the original point
        #[test]
        fn roundtrip_doc_to_viewer_to_doc(
            x in 0.0f64..2000.0,
            y in 0.0f64..2000.0,
            page_height in 1.0f64..2000.0,
            zoom in 0.05f64..16.0,
        ) {
            let zoom = Zoom::new(zoom).unwrap();
            let doc = DocPoint::new(x, y);
            let back = to_doc_space(to_viewer_space(doc, page_height, zoom), page_height, zoom);

            prop_assert!((back.x - x).abs() < 1e-6);
            prop_assert!((back.y - y).abs() < 1e-6);
        }

        /// Property: moving down in the viewer moves down in PDF space
        #[test]
        fn y_axis_movement_direction(
            y1 in 0.0f64..1000.0,
            delta in 0.1f64..100.0,
            zoom in 0.1f64..8.0,
        ) {
            let zoom = Zoom::new(zoom).unwrap();
            let a = to_doc_space(ViewerPoint::new(0.0, y1), 792.0, zoom);
            let b = to_doc_space(ViewerPoint::new(0.0, y1 + delta), 792.0, zoom);
            prop_assert!(b.y < a.y);
        }

        /// Property: non-zero media box origins survive a roundtrip
        #[test]
        fn offset_media_box_roundtrip(
            offset_x in 0.0f64..100.0,
            offset_y in 0.0f64..100.0,
            width in 1.0f64..2000.0,
            height in 1.0f64..2000.0,
            x in 0.0f64..2000.0,
            y in 0.0f64..2000.0,
            zoom in 0.1f64..8.0,
        ) {
            let geometry = PageGeometry { media_box: [offset_x, offset_y, width, height] };
            let zoom = Zoom::new(zoom).unwrap();
            let viewer = ViewerPoint::new(x, y);
            let back = geometry.to_viewer_space(geometry.to_doc_space(viewer, zoom), zoom);
            prop_assert!((back.x - x).abs() < 1e-6);
            prop_assert!((back.y - y).abs() < 1e-6);
        }
    }
}
