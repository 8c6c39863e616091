//! Highlight overlay composition
//!
//! Turns host-supplied highlight groups (page-tagged content-space boxes)
//! into positioned, colored overlay rectangles for the page being rendered.
//! Composition is a pure rebuild: calling it twice with the same inputs
//! yields the same rectangles, nothing accumulates.

use serde::Deserialize;

use crate::coords::{ContentRect, ViewRect, ViewportGeometry};

/// Fill opacity for highlight rectangles.
pub const FILL_ALPHA: f32 = 0.35;

/// A page-tagged rectangle in content-space units (origin top-left).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct BoundingBox {
    /// Page number (1-based)
    pub page: usize,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    #[must_use]
    pub const fn rect(&self) -> ContentRect {
        ContentRect::new(self.x0, self.y0, self.x1, self.y1)
    }
}

/// RGB color for overlay borders and fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    /// Parses `#rrggbb` as delivered in the host's highlight JSON.
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let hex = s.strip_prefix('#').unwrap_or(&s);
        if hex.len() != 6 {
            return Err(format!("bad color literal: {s:?}"));
        }
        let parse = |range| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("bad color literal: {s:?}"))
        };
        Ok(Self {
            r: parse(0..2)?,
            g: parse(2..4)?,
            b: parse(4..6)?,
        })
    }
}

/// A named collection of highlight boxes sharing one color, typically one
/// semantic citation/evidence unit. Supplied by the host, never mutated.
#[derive(Clone, Debug, Deserialize)]
pub struct HighlightGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub color: Option<Rgb>,
    pub boxes: Vec<BoundingBox>,
}

/// A positioned overlay rectangle ready to draw: filled at [`FILL_ALPHA`]
/// with `color` as the border. Overlays are plain data and never intercept
/// pointer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayRect {
    pub page: usize,
    pub rect: ViewRect,
    pub color: Rgb,
}

/// Fixed palette for groups without an explicit color.
const PALETTE: [Rgb; 8] = [
    Rgb::new(0xE5, 0x73, 0x73), // red
    Rgb::new(0x64, 0xB5, 0xF6), // blue
    Rgb::new(0x81, 0xC7, 0x84), // green
    Rgb::new(0xFF, 0xB7, 0x4D), // orange
    Rgb::new(0xBA, 0x68, 0xC8), // purple
    Rgb::new(0x4D, 0xB6, 0xAC), // teal
    Rgb::new(0xF0, 0x62, 0x92), // pink
    Rgb::new(0xFF, 0xD5, 0x4F), // yellow
];

/// Color for the group at `position` in the input list.
///
/// An explicit color always wins. Otherwise the group id is hashed into the
/// palette so the same group keeps its color across re-renders and across
/// sessions; groups with an empty id fall back to positional indexing.
#[must_use]
pub fn group_color(group: &HighlightGroup, position: usize) -> Rgb {
    if let Some(color) = group.color {
        return color;
    }
    if group.id.is_empty() {
        return PALETTE[position % PALETTE.len()];
    }

    let digest = md5::compute(group.id.as_bytes());
    let hash = u64::from_le_bytes(digest.0[..8].try_into().unwrap_or([0; 8]));
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

/// Build the overlay rectangles for one rendered page.
///
/// Filters every group's boxes down to `page` and converts them through the
/// page's current viewport geometry. Pure: re-running with the same inputs
/// replaces rather than accumulates.
#[must_use]
pub fn compose(
    groups: &[HighlightGroup],
    page: usize,
    geometry: &ViewportGeometry,
) -> Vec<OverlayRect> {
    let mut overlays = Vec::new();

    for (position, group) in groups.iter().enumerate() {
        let color = group_color(group, position);
        for bbox in group.boxes.iter().filter(|b| b.page == page) {
            overlays.push(OverlayRect {
                page,
                rect: geometry.convert(bbox.rect()),
                color,
            });
        }
    }

    overlays
}

/// Box to bring into view on a fresh load: the first box whose page
/// `is_rendered`, falling back to the first box overall when nothing
/// relevant has been drawn yet.
///
/// The session scrolls here once per document load to bring the first piece
/// of evidence into view.
#[must_use]
pub fn scroll_target<'a>(
    groups: &'a [HighlightGroup],
    mut is_rendered: impl FnMut(usize) -> bool,
) -> Option<&'a BoundingBox> {
    let mut fallback = None;
    for bbox in groups.iter().flat_map(|g| &g.boxes) {
        if is_rendered(bbox.page) {
            return Some(bbox);
        }
        if fallback.is_none() {
            fallback = Some(bbox);
        }
    }
    fallback
}
