//! Coordinate transforms between content space and viewport space
//!
//! Highlight boxes arrive in content-space units with the origin at the
//! page's top-left. The rasterizer's native viewport puts the origin at the
//! bottom-left, so the vertical axis has to be flipped against the page
//! height before scaling.

/// Axis-aligned rectangle in content-space units (origin top-left).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContentRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl ContentRect {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// Axis-aligned rectangle in viewport pixels at some scale.
///
/// Always normalized: `x0 < x1` and `y0 < y1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl ViewRect {
    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Page geometry at a concrete scale, produced fresh by the rasterizer for
/// every render cycle. Never cache one across scale changes.
#[derive(Clone, Copy, Debug)]
pub struct ViewportGeometry {
    /// Rendered width in pixels
    pub width_px: f32,
    /// Rendered height in pixels
    pub height_px: f32,
    /// Page height in native content units
    pub page_height: f32,
    /// Scale this geometry was computed for
    pub scale: f32,
}

impl ViewportGeometry {
    /// Build geometry for a page of the given native size at `scale`.
    #[must_use]
    pub fn for_page(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            width_px: page_width * scale,
            height_px: page_height * scale,
            page_height,
            scale,
        }
    }

    /// Convert a content-space rectangle into viewport pixels.
    #[must_use]
    pub fn convert(&self, rect: ContentRect) -> ViewRect {
        to_viewport_rect(rect, self.page_height, self.scale)
    }
}

/// Map a content-space rectangle to viewport pixels at `scale`.
///
/// Flips the vertical axis against `page_height`, scales both axes
/// uniformly, and normalizes winding so callers can hand in rectangles with
/// swapped corners. Pure and exact: the same inputs always yield the same
/// output, so recomputing on every render accumulates no drift.
#[must_use]
pub fn to_viewport_rect(rect: ContentRect, page_height: f32, scale: f32) -> ViewRect {
    let (x0, x1) = ordered(rect.x0, rect.x1);
    let (y0, y1) = ordered(rect.y0, rect.y1);

    ViewRect {
        x0: x0 * scale,
        y0: (page_height - y1) * scale,
        x1: x1 * scale,
        y1: (page_height - y0) * scale,
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}
