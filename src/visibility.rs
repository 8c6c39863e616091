//! Visibility-driven render scheduling for continuous-scroll mode
//!
//! The host observes each page placeholder against the scroll container and
//! reports plain booleans here. The tracker keeps the visible set, a
//! per-page rendered-at-scale marker, and derives the current page as the
//! smallest visible one. Rendered content is retained when a page scrolls
//! out, so scrolling back never flickers.

use std::collections::{BTreeSet, HashMap};

fn scale_millionths(scale: f32) -> u32 {
    (scale * 1_000_000.0) as u32
}

/// Visible set and rendered-at-scale bookkeeping for continuous mode.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    visible: BTreeSet<usize>,
    rendered_at: HashMap<usize, u32>,
}

impl VisibilityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one visibility report from the host observer. Returns true if
    /// the page just became visible.
    pub fn report(&mut self, page: usize, visible: bool) -> bool {
        if visible {
            self.visible.insert(page)
        } else {
            self.visible.remove(&page);
            false
        }
    }

    /// Smallest page number currently intersecting the viewport.
    #[must_use]
    pub fn current_page(&self) -> Option<usize> {
        self.visible.first().copied()
    }

    #[must_use]
    pub fn is_visible(&self, page: usize) -> bool {
        self.visible.contains(&page)
    }

    /// Pages currently in the visible set, ascending.
    pub fn visible_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.visible.iter().copied()
    }

    /// Mark `page` as rendered at `scale`.
    pub fn mark_rendered(&mut self, page: usize, scale: f32) {
        self.rendered_at.insert(page, scale_millionths(scale));
    }

    /// Whether `page` needs a raster at `scale`: not yet rendered, or
    /// rendered at a different scale.
    #[must_use]
    pub fn needs_render(&self, page: usize, scale: f32) -> bool {
        self.rendered_at.get(&page) != Some(&scale_millionths(scale))
    }

    /// Invalidate every rendered-at-scale marker, e.g. after a scale
    /// change. Visibility itself is untouched.
    pub fn invalidate_rendered(&mut self) {
        self.rendered_at.clear();
    }

    /// Forget everything, e.g. on document change or mode switch.
    pub fn reset(&mut self) {
        self.visible.clear();
        self.rendered_at.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_page_is_smallest_visible() {
        let mut tracker = VisibilityTracker::new();
        tracker.report(5, true);
        tracker.report(4, true);
        tracker.report(6, true);

        assert_eq!(tracker.current_page(), Some(4));
    }

    #[test]
    fn current_page_follows_scroll() {
        let mut tracker = VisibilityTracker::new();
        for page in 4..=6 {
            tracker.report(page, true);
        }
        assert_eq!(tracker.current_page(), Some(4));

        for page in 4..=6 {
            tracker.report(page, false);
        }
        tracker.report(9, true);
        assert_eq!(tracker.current_page(), Some(9));
    }

    #[test]
    fn report_flags_newly_visible_only() {
        let mut tracker = VisibilityTracker::new();
        assert!(tracker.report(2, true));
        assert!(!tracker.report(2, true));
        assert!(!tracker.report(2, false));
    }

    #[test]
    fn needs_render_tracks_scale_marker() {
        let mut tracker = VisibilityTracker::new();
        assert!(tracker.needs_render(1, 1.0));

        tracker.mark_rendered(1, 1.0);
        assert!(!tracker.needs_render(1, 1.0));
        // Different scale: the marker no longer matches.
        assert!(tracker.needs_render(1, 1.5));
    }

    #[test]
    fn invalidate_rendered_keeps_visibility() {
        let mut tracker = VisibilityTracker::new();
        tracker.report(3, true);
        tracker.mark_rendered(3, 1.0);

        tracker.invalidate_rendered();
        assert!(tracker.needs_render(3, 1.0));
        assert!(tracker.is_visible(3));
    }

    #[test]
    fn leaving_visibility_retains_rendered_marker() {
        let mut tracker = VisibilityTracker::new();
        tracker.report(3, true);
        tracker.mark_rendered(3, 1.0);

        tracker.report(3, false);
        // Scrolling back must not force a re-render at the same scale.
        assert!(!tracker.needs_render(3, 1.0));
    }

    #[test]
    fn empty_set_has_no_current_page() {
        let tracker = VisibilityTracker::new();
        assert_eq!(tracker.current_page(), None);
    }
}
