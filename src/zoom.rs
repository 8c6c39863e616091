//! Zoom state for the document viewport
//!
//! Owns the scale factor and fit mode, and translates discrete zoom steps,
//! percent entry, fit-to-width, and pointer-anchored wheel zoom into a new
//! clamped scale. Scroll offsets themselves live in the host's scroll
//! container; anchored zoom returns the corrected offsets to apply.

/// Minimum allowed scale factor
pub const MIN_SCALE: f32 = 0.5;
/// Maximum allowed scale factor
pub const MAX_SCALE: f32 = 3.0;
/// Scale delta per discrete zoom step
pub const ZOOM_STEP: f32 = 0.25;
/// Fixed horizontal padding subtracted from the container in fit-to-width
pub const FIT_WIDTH_PADDING: f32 = 40.0;

/// Whether the current scale is user-chosen or tracks the container width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitMode {
    #[default]
    Custom,
    FitWidth,
}

/// Pointer position in viewport pixels, relative to the scroll container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerPos {
    pub x: f32,
    pub y: f32,
}

/// Scroll offsets of the host's scroll container, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollOffsets {
    pub x: f32,
    pub y: f32,
}

/// Zoom and fit-mode state.
#[derive(Debug)]
pub struct ZoomController {
    scale: f32,
    fit: FitMode,
    /// Latest container width reported while in fit-width mode. Coalesced:
    /// the session applies one pending recompute per frame pump.
    pending_fit_width: Option<f32>,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self {
            scale: 1.0,
            fit: FitMode::Custom,
            pending_fit_width: None,
        }
    }
}

impl ZoomController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[must_use]
    pub fn fit_mode(&self) -> FitMode {
        self.fit
    }

    /// Step the scale up by [`ZOOM_STEP`]. Returns true if the scale moved.
    pub fn zoom_in(&mut self) -> bool {
        self.set_custom(self.scale + ZOOM_STEP)
    }

    /// Step the scale down by [`ZOOM_STEP`]. Returns true if the scale moved.
    pub fn zoom_out(&mut self) -> bool {
        self.set_custom(self.scale - ZOOM_STEP)
    }

    /// Apply a zoom percentage, clamped to `[50, 300]`.
    pub fn set_zoom_percent(&mut self, percent: f32) -> bool {
        let percent = clamp_finite(percent, 100.0, MIN_SCALE * 100.0, MAX_SCALE * 100.0);
        self.set_custom(percent / 100.0)
    }

    /// Compute the scale that makes a page of `page_width` native units fill
    /// `container_width` pixels minus the fixed padding, and switch to
    /// fit-width mode. Returns true if the scale moved.
    pub fn fit_to_width(&mut self, container_width: f32, page_width: f32) -> bool {
        self.fit = FitMode::FitWidth;
        if page_width <= 0.0 {
            return false;
        }

        let fitted = (container_width - FIT_WIDTH_PADDING) / page_width;
        self.apply(fitted)
    }

    /// Record a container resize. Only relevant in fit-width mode; the
    /// latest report wins, so a burst of resize events costs one recompute.
    pub fn note_container_resize(&mut self, container_width: f32) {
        if self.fit == FitMode::FitWidth {
            self.pending_fit_width = Some(container_width);
        }
    }

    /// Take the coalesced pending resize, if any. Called once per frame pump.
    pub fn take_pending_resize(&mut self) -> Option<f32> {
        self.pending_fit_width.take()
    }

    /// Pointer-anchored wheel zoom: step the scale while keeping the content
    /// point under the pointer fixed. Returns the corrected scroll offsets.
    ///
    /// The offset correction uses the scale that was actually applied after
    /// clamping, not the requested one, so repeated clamped steps do not
    /// accumulate drift.
    pub fn wheel_zoom(
        &mut self,
        zoom_in: bool,
        pointer: PointerPos,
        offsets: ScrollOffsets,
    ) -> ScrollOffsets {
        let old_scale = self.scale;
        if zoom_in {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
        let applied = self.scale;

        // Content-space point currently under the pointer.
        let content_x = (offsets.x + pointer.x) / old_scale;
        let content_y = (offsets.y + pointer.y) / old_scale;

        ScrollOffsets {
            x: content_x * applied - pointer.x,
            y: content_y * applied - pointer.y,
        }
    }

    fn set_custom(&mut self, scale: f32) -> bool {
        self.fit = FitMode::Custom;
        self.apply(scale)
    }

    fn apply(&mut self, scale: f32) -> bool {
        let clamped = clamp_finite(scale, 1.0, MIN_SCALE, MAX_SCALE);
        if (self.scale - clamped).abs() > f32::EPSILON {
            self.scale = clamped;
            true
        } else {
            false
        }
    }
}

/// Clamp to `[min, max]`, falling back to `default` for NaN/Inf.
fn clamp_finite(value: f32, default: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_in_never_exceeds_max() {
        let mut zoom = ZoomController::new();
        for _ in 0..20 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.scale(), MAX_SCALE);
    }

    #[test]
    fn zoom_out_never_goes_below_min() {
        let mut zoom = ZoomController::new();
        for _ in 0..20 {
            zoom.zoom_out();
        }
        assert_eq!(zoom.scale(), MIN_SCALE);
    }

    #[test]
    fn step_reports_whether_scale_moved() {
        let mut zoom = ZoomController::new();
        assert!(zoom.zoom_in());
        assert_eq!(zoom.scale(), 1.25);

        for _ in 0..20 {
            zoom.zoom_in();
        }
        // Pinned at the clamp: no further movement.
        assert!(!zoom.zoom_in());
    }

    #[test]
    fn percent_is_clamped() {
        let mut zoom = ZoomController::new();
        zoom.set_zoom_percent(10.0);
        assert_eq!(zoom.scale(), MIN_SCALE);

        zoom.set_zoom_percent(900.0);
        assert_eq!(zoom.scale(), MAX_SCALE);

        zoom.set_zoom_percent(150.0);
        assert_eq!(zoom.scale(), 1.5);
        assert_eq!(zoom.fit_mode(), FitMode::Custom);
    }

    #[test]
    fn nan_percent_falls_back_to_default() {
        let mut zoom = ZoomController::new();
        zoom.set_zoom_percent(f32::NAN);
        assert_eq!(zoom.scale(), 1.0);
    }

    #[test]
    fn fit_to_width_worked_example() {
        // 1000px container, 40px padding, page of native width 600.
        let mut zoom = ZoomController::new();
        assert!(zoom.fit_to_width(1000.0, 600.0));

        assert_eq!(zoom.scale(), 1.6);
        assert_eq!(zoom.fit_mode(), FitMode::FitWidth);
    }

    #[test]
    fn fit_to_width_is_clamped() {
        let mut zoom = ZoomController::new();
        zoom.fit_to_width(10_000.0, 100.0);
        assert_eq!(zoom.scale(), MAX_SCALE);
    }

    #[test]
    fn discrete_zoom_leaves_fit_width() {
        let mut zoom = ZoomController::new();
        zoom.fit_to_width(1000.0, 600.0);
        zoom.zoom_in();
        assert_eq!(zoom.fit_mode(), FitMode::Custom);
    }

    #[test]
    fn resize_reports_coalesce_to_latest() {
        let mut zoom = ZoomController::new();
        zoom.fit_to_width(1000.0, 600.0);

        zoom.note_container_resize(1100.0);
        zoom.note_container_resize(1200.0);
        zoom.note_container_resize(1300.0);

        assert_eq!(zoom.take_pending_resize(), Some(1300.0));
        assert_eq!(zoom.take_pending_resize(), None);
    }

    #[test]
    fn resize_is_ignored_in_custom_mode() {
        let mut zoom = ZoomController::new();
        zoom.note_container_resize(1100.0);
        assert_eq!(zoom.take_pending_resize(), None);
    }

    #[test]
    fn wheel_zoom_keeps_pointer_point_fixed() {
        let mut zoom = ZoomController::new();
        let pointer = PointerPos { x: 120.0, y: 340.0 };
        let offsets = ScrollOffsets { x: 50.0, y: 800.0 };

        // Content point under the pointer before the step.
        let before_x = (offsets.x + pointer.x) / zoom.scale();
        let before_y = (offsets.y + pointer.y) / zoom.scale();

        let corrected = zoom.wheel_zoom(true, pointer, offsets);

        // Same content point, viewed at the new scale and offsets.
        let after_x = (corrected.x + pointer.x) / zoom.scale();
        let after_y = (corrected.y + pointer.y) / zoom.scale();

        assert!((before_x - after_x).abs() * zoom.scale() < 1.0);
        assert!((before_y - after_y).abs() * zoom.scale() < 1.0);
    }

    #[test]
    fn clamped_wheel_zoom_does_not_drift() {
        let mut zoom = ZoomController::new();
        let pointer = PointerPos { x: 100.0, y: 100.0 };
        let mut offsets = ScrollOffsets { x: 30.0, y: 60.0 };

        // Drive well past the clamp; once pinned at MAX_SCALE the offsets
        // must stop moving because the correction uses the applied scale.
        for _ in 0..10 {
            offsets = zoom.wheel_zoom(true, pointer, offsets);
        }
        let pinned = offsets;
        offsets = zoom.wheel_zoom(true, pointer, offsets);

        assert_eq!(zoom.scale(), MAX_SCALE);
        assert!((offsets.x - pinned.x).abs() < 1e-3);
        assert!((offsets.y - pinned.y).abs() < 1e-3);
    }
}
