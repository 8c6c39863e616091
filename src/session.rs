//! Document session management
//!
//! One `SessionManager` owns the lifecycle of one open document: load, page
//! count, current page, zoom, render scheduling, highlight overlays, and
//! teardown. Rendering parameters flow down into the sequencer; applied
//! rasters and overlay rectangles flow back out to the host, which polls
//! `pump` once per frame and drains `poll_events`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::cache::{DEFAULT_CAPACITY, RasterCache, RasterKey};
use crate::coords::{ViewRect, ViewportGeometry};
use crate::highlight::{self, HighlightGroup, OverlayRect};
use crate::raster::{DocumentHandle, OpenError, PageRaster, RasterEngine};
use crate::sequencer::{Applied, PageRenderState, RenderSequencer};
use crate::visibility::VisibilityTracker;
use crate::zoom::{FitMode, PointerPos, ScrollOffsets, ZoomController};

/// Document byte fetch failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to fetch document: {detail}")]
pub struct FetchError {
    pub detail: String,
}

impl FetchError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}

/// Where document bytes come from. The network layer implements this.
pub trait DocumentSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Terminal session failure: the document could not be loaded at all.
/// Retry path is a fresh `open`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Open(#[from] OpenError),
}

/// Session lifecycle phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Empty,
    Loading,
    Ready,
    /// Load failed; the host replaces the viewport with an error state.
    Error,
    Destroyed,
}

/// Paging strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    SinglePage,
    Continuous,
}

/// Notifications for the surrounding UI, drained via
/// [`SessionManager::poll_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    /// Current page changed; `percent` is `page / total * 100`.
    Progress {
        page: usize,
        total: usize,
        percent: f32,
    },
    /// The scroll container should bring this page into view.
    ScrollToPage { page: usize },
    /// One-shot scroll to the first rendered highlight of a fresh load.
    ScrollToHighlight { page: usize, rect: ViewRect },
}

/// Owns one open document and coordinates zoom, visibility, sequencing and
/// overlay composition around it.
pub struct SessionManager {
    engine: Box<dyn RasterEngine>,
    source: Box<dyn DocumentSource>,

    phase: SessionPhase,
    error: Option<LoadError>,
    url: Option<String>,
    doc: Option<Box<dyn DocumentHandle>>,
    page_count: usize,
    /// Currently displayed page (1-based)
    current_page: usize,
    mode: ViewMode,

    zoom: ZoomController,
    sequencer: RenderSequencer,
    visibility: VisibilityTracker,
    cache: RasterCache,

    /// Applied rasters, at most one per page.
    rendered: HashMap<usize, Arc<PageRaster>>,

    highlights: Vec<HighlightGroup>,
    highlights_visible: bool,
    auto_scrolled_to_highlight: bool,

    events: VecDeque<ViewerEvent>,
}

impl SessionManager {
    #[must_use]
    pub fn new(engine: Box<dyn RasterEngine>, source: Box<dyn DocumentSource>) -> Self {
        Self::with_cache_capacity(engine, source, DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_cache_capacity(
        engine: Box<dyn RasterEngine>,
        source: Box<dyn DocumentSource>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            engine,
            source,
            phase: SessionPhase::Empty,
            error: None,
            url: None,
            doc: None,
            page_count: 0,
            current_page: 1,
            mode: ViewMode::SinglePage,
            zoom: ZoomController::new(),
            sequencer: RenderSequencer::new(),
            visibility: VisibilityTracker::new(),
            cache: RasterCache::new(cache_capacity),
            rendered: HashMap::new(),
            highlights: Vec::new(),
            highlights_visible: true,
            auto_scrolled_to_highlight: false,
            events: VecDeque::new(),
        }
    }

    /// Open a document, tearing down any previous one first. On failure the
    /// session enters [`SessionPhase::Error`] and the error is also
    /// returned; a later `open` is the retry path.
    pub fn open(&mut self, url: &str, initial_page: Option<usize>) -> Result<(), LoadError> {
        self.teardown_document();
        self.phase = SessionPhase::Loading;
        self.error = None;
        self.url = Some(url.to_string());

        match self.load(url) {
            Ok(()) => {
                self.current_page = initial_page.unwrap_or(1).clamp(1, self.page_count.max(1));
                self.phase = SessionPhase::Ready;
                info!(
                    "opened {url}: {} pages, starting at page {}",
                    self.page_count, self.current_page
                );
                self.emit_progress();
                match self.mode {
                    ViewMode::SinglePage => self.request_render(self.current_page),
                    ViewMode::Continuous => self.events.push_back(ViewerEvent::ScrollToPage {
                        page: self.current_page,
                    }),
                }
                Ok(())
            }
            Err(err) => {
                warn!("failed to open {url}: {err}");
                self.phase = SessionPhase::Error;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn load(&mut self, url: &str) -> Result<(), LoadError> {
        let bytes = self.source.fetch(url)?;
        let doc = self.engine.open(&bytes)?;
        self.page_count = doc.page_count();
        self.doc = Some(doc);
        Ok(())
    }

    /// Tear down the session. Safe to call more than once.
    pub fn close(&mut self) {
        self.teardown_document();
        self.phase = SessionPhase::Destroyed;
    }

    /// Invalidate, cancel, then destroy, in that order, so no late
    /// completion can touch a destroyed handle.
    fn teardown_document(&mut self) {
        self.sequencer.bump();
        self.sequencer.cancel_all();
        if let Some(mut doc) = self.doc.take() {
            doc.destroy();
        }
        self.rendered.clear();
        self.cache.invalidate_all();
        self.visibility.reset();
        self.auto_scrolled_to_highlight = false;
        self.page_count = 0;
        self.events.clear();
    }

    // --- frame pump -------------------------------------------------------

    /// Advance the session by one frame: apply any pending fit-width
    /// recompute, then apply completed raster results.
    pub fn pump(&mut self) {
        if let Some(container_width) = self.zoom.take_pending_resize() {
            self.refit(container_width);
        }

        for applied in self.sequencer.pump() {
            match applied {
                Applied::Raster { page, scale, raster } => {
                    let arc = self.cache.insert(RasterKey::new(page, scale), raster);
                    self.apply_raster(page, scale, arc);
                }
                Applied::Failed { page } => {
                    // Leave the slot blank; the rest of the session is fine.
                    self.rendered.remove(&page);
                }
            }
        }
    }

    fn apply_raster(&mut self, page: usize, scale: f32, raster: Arc<PageRaster>) {
        self.rendered.insert(page, raster);
        self.visibility.mark_rendered(page, scale);
        self.maybe_scroll_to_first_highlight();
    }

    fn maybe_scroll_to_first_highlight(&mut self) {
        if self.auto_scrolled_to_highlight {
            return;
        }
        let rendered = &self.rendered;
        let Some(bbox) =
            highlight::scroll_target(&self.highlights, |page| rendered.contains_key(&page))
                .copied()
        else {
            return;
        };
        let Some(geometry) = self.page_geometry(bbox.page) else {
            return;
        };

        self.auto_scrolled_to_highlight = true;
        self.events.push_back(ViewerEvent::ScrollToHighlight {
            page: bbox.page,
            rect: geometry.convert(bbox.rect()),
        });
    }

    // --- rendering --------------------------------------------------------

    /// Render `page` at the current scale, reusing a cached raster when one
    /// exists. Replaces any in-flight task for the same page.
    fn request_render(&mut self, page: usize) {
        if self.phase != SessionPhase::Ready {
            return;
        }
        let scale = self.zoom.scale();

        if let Some(cached) = self.cache.get(&RasterKey::new(page, scale)) {
            debug!("page {page} served from cache at scale {scale}");
            self.apply_raster(page, scale, cached);
            return;
        }

        let Some(doc) = self.doc.as_ref() else {
            return;
        };
        match doc.page(page) {
            Ok(handle) => {
                let viewport = handle.viewport(scale);
                let task = handle.begin_render(&viewport);
                self.sequencer.begin(page, scale, task);
            }
            Err(fault) => {
                warn!("page {page} unavailable: {fault}");
            }
        }
    }

    /// Render `page` only if it is neither up to date nor already in flight.
    fn request_render_if_needed(&mut self, page: usize) {
        if self.sequencer.is_rendering(page) {
            return;
        }
        if !self.visibility.needs_render(page, self.zoom.scale()) {
            return;
        }
        self.request_render(page);
    }

    /// Everything downstream of a scale change: new epoch, stale markers,
    /// re-render of whatever is on screen.
    fn on_scale_changed(&mut self) {
        self.sequencer.bump();
        self.visibility.invalidate_rendered();

        match self.mode {
            ViewMode::SinglePage => self.request_render(self.current_page),
            ViewMode::Continuous => {
                let visible: Vec<usize> = self.visibility.visible_pages().collect();
                for page in visible {
                    self.request_render(page);
                }
            }
        }
    }

    // --- navigation -------------------------------------------------------

    /// Go to a page, clamped to `[1, page_count]`.
    pub fn go_to_page(&mut self, page: usize) {
        if self.phase != SessionPhase::Ready {
            return;
        }
        let clamped = page.clamp(1, self.page_count.max(1));
        if clamped == self.current_page {
            return;
        }
        let previous = self.current_page;
        self.current_page = clamped;
        self.emit_progress();

        match self.mode {
            ViewMode::SinglePage => {
                // The old page's render is worthless now; its pixels stay
                // cached but the slot must not outlive the navigation.
                self.sequencer.bump();
                self.sequencer.cancel_all();
                self.rendered.remove(&previous);
                self.request_render(clamped);
            }
            ViewMode::Continuous => {
                self.events
                    .push_back(ViewerEvent::ScrollToPage { page: clamped });
            }
        }
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.current_page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.current_page.saturating_sub(1).max(1));
    }

    /// Switch paging strategy. Continuous mode scrolls to the current page
    /// without eagerly rendering every page; visibility reports drive the
    /// rest.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.sequencer.bump();
        self.sequencer.cancel_all();
        // Page surfaces are rebuilt for the new layout; pixels stay cached.
        self.rendered.clear();

        if self.phase != SessionPhase::Ready {
            return;
        }
        match mode {
            ViewMode::SinglePage => {
                self.visibility.reset();
                self.request_render(self.current_page);
            }
            ViewMode::Continuous => {
                self.visibility.reset();
                self.events.push_back(ViewerEvent::ScrollToPage {
                    page: self.current_page,
                });
            }
        }
    }

    /// One visibility report from the host observer (continuous mode).
    pub fn report_visibility(&mut self, page: usize, visible: bool) {
        if self.mode != ViewMode::Continuous {
            return;
        }
        self.visibility.report(page, visible);

        if visible && self.phase == SessionPhase::Ready {
            self.request_render_if_needed(page);
        }

        if let Some(top) = self.visibility.current_page() {
            if top != self.current_page {
                self.current_page = top;
                self.emit_progress();
            }
        }
    }

    // --- zoom / pan surface ----------------------------------------------

    pub fn zoom_in(&mut self) {
        if self.zoom.zoom_in() {
            self.on_scale_changed();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.zoom.zoom_out() {
            self.on_scale_changed();
        }
    }

    pub fn set_zoom_percent(&mut self, percent: f32) {
        if self.zoom.set_zoom_percent(percent) {
            self.on_scale_changed();
        }
    }

    /// Fit the current page to the container width.
    pub fn fit_to_width(&mut self, container_width: f32) {
        self.refit(container_width);
    }

    /// Report a container resize; in fit-width mode the latest width is
    /// applied on the next [`pump`](Self::pump).
    pub fn note_container_resize(&mut self, container_width: f32) {
        self.zoom.note_container_resize(container_width);
    }

    fn refit(&mut self, container_width: f32) {
        let Some(page_width) = self.page_size(self.current_page).map(|(w, _)| w) else {
            return;
        };
        if self.zoom.fit_to_width(container_width, page_width) {
            self.on_scale_changed();
        }
    }

    /// Pointer-anchored wheel zoom. Returns the corrected scroll offsets
    /// the host should apply to its scroll container.
    pub fn wheel_zoom(
        &mut self,
        zoom_in: bool,
        pointer: PointerPos,
        offsets: ScrollOffsets,
    ) -> ScrollOffsets {
        let before = self.zoom.scale();
        let corrected = self.zoom.wheel_zoom(zoom_in, pointer, offsets);
        if (self.zoom.scale() - before).abs() > f32::EPSILON {
            self.on_scale_changed();
        }
        corrected
    }

    // --- highlights -------------------------------------------------------

    /// Replace the highlight input. Never triggers a raster: when a valid
    /// raster of the current page exists, only the overlay needs redrawing.
    pub fn set_highlights(&mut self, groups: Vec<HighlightGroup>) {
        self.highlights = groups;
        if !self.rendered.is_empty() {
            self.maybe_scroll_to_first_highlight();
        }
    }

    pub fn set_highlights_visible(&mut self, visible: bool) {
        self.highlights_visible = visible;
    }

    /// Overlay rectangles for one rendered page at the current scale,
    /// computed fresh from the page's viewport geometry.
    #[must_use]
    pub fn overlays_for_page(&self, page: usize) -> Vec<OverlayRect> {
        if !self.highlights_visible || self.phase != SessionPhase::Ready {
            return Vec::new();
        }
        let Some(geometry) = self.page_geometry(page) else {
            return Vec::new();
        };
        highlight::compose(&self.highlights, page, &geometry)
    }

    // --- accessors --------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Currently displayed page (1-based).
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.zoom.scale()
    }

    #[must_use]
    pub fn fit_mode(&self) -> FitMode {
        self.zoom.fit_mode()
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.mode
    }

    /// The applied raster for a page, if one exists.
    #[must_use]
    pub fn rendered_page(&self, page: usize) -> Option<&Arc<PageRaster>> {
        self.rendered.get(&page)
    }

    #[must_use]
    pub fn is_rendering(&self, page: usize) -> bool {
        self.sequencer.is_rendering(page)
    }

    /// Render sub-state of one page.
    #[must_use]
    pub fn page_state(&self, page: usize) -> PageRenderState {
        if self.sequencer.is_rendering(page) {
            PageRenderState::Rendering
        } else if self.rendered.contains_key(&page) {
            PageRenderState::Rendered
        } else {
            PageRenderState::Unrendered
        }
    }

    /// Drain pending UI notifications.
    pub fn poll_events(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    fn emit_progress(&mut self) {
        if self.page_count == 0 {
            return;
        }
        self.events.push_back(ViewerEvent::Progress {
            page: self.current_page,
            total: self.page_count,
            percent: self.current_page as f32 / self.page_count as f32 * 100.0,
        });
    }

    fn page_size(&self, page: usize) -> Option<(f32, f32)> {
        let doc = self.doc.as_ref()?;
        doc.page(page).ok().map(|p| p.size())
    }

    fn page_geometry(&self, page: usize) -> Option<ViewportGeometry> {
        let doc = self.doc.as_ref()?;
        Some(doc.page(page).ok()?.viewport(self.zoom.scale()))
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown_document();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::BoundingBox;
    use crate::test_utils::{FakeEngine, StaticSource};

    const URL: &str = "corpus://doc/1";

    fn session(engine: &FakeEngine) -> SessionManager {
        SessionManager::new(
            Box::new(engine.clone()),
            Box::new(StaticSource::single(URL, b"%DOC".to_vec())),
        )
    }

    fn group(id: &str, boxes: Vec<BoundingBox>) -> HighlightGroup {
        HighlightGroup {
            id: id.to_string(),
            color: None,
            boxes,
        }
    }

    #[test]
    fn open_reaches_ready_and_renders_current_page() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);

        s.open(URL, None).unwrap();
        assert_eq!(s.phase(), SessionPhase::Ready);
        assert_eq!(s.page_count(), 10);
        assert_eq!(s.current_page(), 1);

        s.pump();
        assert!(s.rendered_page(1).is_some());
        assert_eq!(engine.renders_started(), vec![1]);
    }

    #[test]
    fn open_emits_progress() {
        let engine = FakeEngine::auto(4, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();

        let events = s.poll_events();
        assert!(events.contains(&ViewerEvent::Progress {
            page: 1,
            total: 4,
            percent: 25.0
        }));
    }

    #[test]
    fn initial_page_is_clamped() {
        let engine = FakeEngine::auto(5, (600.0, 800.0));
        let mut s = session(&engine);

        s.open(URL, Some(99)).unwrap();
        assert_eq!(s.current_page(), 5);

        s.open(URL, Some(0)).unwrap();
        assert_eq!(s.current_page(), 1);
    }

    #[test]
    fn fetch_failure_is_terminal_error_state() {
        let engine = FakeEngine::auto(5, (600.0, 800.0));
        let mut s = SessionManager::new(
            Box::new(engine),
            Box::new(StaticSource::single("other://url", vec![])),
        );

        assert!(s.open(URL, None).is_err());
        assert_eq!(s.phase(), SessionPhase::Error);
        assert!(matches!(s.load_error(), Some(LoadError::Fetch(_))));
    }

    #[test]
    fn open_failure_is_terminal_error_state() {
        let engine = FakeEngine::auto(5, (600.0, 800.0));
        engine.set_fail_open(true);
        let mut s = session(&engine);

        assert!(s.open(URL, None).is_err());
        assert_eq!(s.phase(), SessionPhase::Error);
        assert!(matches!(s.load_error(), Some(LoadError::Open(_))));
    }

    #[test]
    fn reopen_after_error_recovers() {
        let engine = FakeEngine::auto(5, (600.0, 800.0));
        engine.set_fail_open(true);
        let mut s = session(&engine);
        let _ = s.open(URL, None);

        engine.set_fail_open(false);
        s.open(URL, None).unwrap();
        assert_eq!(s.phase(), SessionPhase::Ready);
    }

    #[test]
    fn superseded_render_never_applies() {
        let engine = FakeEngine::manual(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();

        // R1 at scale 1.0 still in flight when the zoom changes.
        let r1 = engine.take_pending().pop().unwrap();
        s.zoom_in();
        let r2 = engine.take_pending().pop().unwrap();
        assert!(r1.cancel_requested());

        // R2 completes and applies.
        r2.complete();
        s.pump();
        let applied = s.rendered_page(1).unwrap().clone();
        assert_eq!(applied.scale, 1.25);

        // R1 resolving afterwards is a no-op.
        r1.complete();
        s.pump();
        assert_eq!(s.rendered_page(1).unwrap().scale, 1.25);
    }

    #[test]
    fn failed_page_render_leaves_slot_blank() {
        let engine = FakeEngine::manual(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();

        let pending = engine.take_pending().pop().unwrap();
        pending.fail("render exploded");
        s.pump();

        assert!(s.rendered_page(1).is_none());
        assert_eq!(s.phase(), SessionPhase::Ready);
    }

    #[test]
    fn cached_raster_short_circuits_the_engine() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();

        s.zoom_in();
        s.pump();
        assert_eq!(engine.renders_started().len(), 2);

        // Back to a scale we already rendered at: cache hit, no engine call.
        s.set_zoom_percent(100.0);
        s.pump();
        assert_eq!(engine.renders_started().len(), 2);
        assert_eq!(s.rendered_page(1).unwrap().scale, 1.0);
    }

    #[test]
    fn highlight_change_does_not_rerender() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();
        assert_eq!(engine.renders_started().len(), 1);

        s.set_highlights(vec![group(
            "g1",
            vec![BoundingBox {
                page: 1,
                x0: 0.0,
                y0: 0.0,
                x1: 100.0,
                y1: 20.0,
            }],
        )]);
        s.pump();

        assert_eq!(engine.renders_started().len(), 1);
        assert_eq!(s.overlays_for_page(1).len(), 1);
    }

    #[test]
    fn overlay_positions_match_worked_example() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.set_highlights(vec![group(
            "g1",
            vec![BoundingBox {
                page: 2,
                x0: 0.0,
                y0: 0.0,
                x1: 100.0,
                y1: 20.0,
            }],
        )]);

        let overlays = s.overlays_for_page(2);
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].rect.y0, 780.0);
    }

    #[test]
    fn hidden_highlights_produce_no_overlays() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.set_highlights(vec![group(
            "g1",
            vec![BoundingBox {
                page: 1,
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 10.0,
            }],
        )]);

        s.set_highlights_visible(false);
        assert!(s.overlays_for_page(1).is_empty());
        s.set_highlights_visible(true);
        assert_eq!(s.overlays_for_page(1).len(), 1);
    }

    #[test]
    fn scrolls_to_first_highlight_exactly_once_per_load() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.set_highlights(vec![group(
            "g1",
            vec![BoundingBox {
                page: 3,
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 10.0,
            }],
        )]);
        s.pump();

        let scrolls = |events: &[ViewerEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, ViewerEvent::ScrollToHighlight { .. }))
                .count()
        };
        assert_eq!(scrolls(&s.poll_events()), 1);

        // Further renders of the same load never scroll again.
        s.go_to_page(2);
        s.pump();
        assert_eq!(scrolls(&s.poll_events()), 0);

        // A fresh load scrolls once more.
        s.open(URL, None).unwrap();
        s.set_highlights(vec![group(
            "g1",
            vec![BoundingBox {
                page: 3,
                x0: 0.0,
                y0: 0.0,
                x1: 10.0,
                y1: 10.0,
            }],
        )]);
        s.pump();
        assert_eq!(scrolls(&s.poll_events()), 1);
    }

    #[test]
    fn continuous_mode_renders_only_visible_pages() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();
        engine.clear_render_log();

        s.set_view_mode(ViewMode::Continuous);
        for page in 4..=6 {
            s.report_visibility(page, true);
        }
        s.pump();

        assert_eq!(s.current_page(), 4);
        assert_eq!(engine.renders_started(), vec![4, 5, 6]);
        assert!(s.rendered_page(4).is_some());

        // Scroll so only page 9 is visible.
        for page in 4..=6 {
            s.report_visibility(page, false);
        }
        s.report_visibility(9, true);
        s.pump();

        assert_eq!(s.current_page(), 9);
        for page in [1, 2, 3, 7, 8] {
            assert!(s.rendered_page(page).is_none(), "page {page} was rendered");
        }
    }

    #[test]
    fn mode_switch_clears_applied_rasters() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();
        assert!(s.rendered_page(1).is_some());

        // The single-page raster must not leak into the continuous layout.
        s.set_view_mode(ViewMode::Continuous);
        assert!(s.rendered_page(1).is_none());

        // Switching back rebuilds the current page from cache.
        engine.clear_render_log();
        s.set_view_mode(ViewMode::SinglePage);
        s.pump();
        assert!(s.rendered_page(1).is_some());
        assert!(engine.renders_started().is_empty());
    }

    #[test]
    fn single_page_navigation_drops_the_superseded_raster() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();
        assert!(s.rendered_page(1).is_some());

        s.go_to_page(2);
        s.pump();
        assert!(s.rendered_page(1).is_none());
        assert!(s.rendered_page(2).is_some());

        // Going back is a cache hit, not a fresh raster.
        engine.clear_render_log();
        s.go_to_page(1);
        s.pump();
        assert!(s.rendered_page(1).is_some());
        assert!(engine.renders_started().is_empty());
    }

    #[test]
    fn auto_scroll_targets_a_rendered_highlight_when_one_exists() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();

        // Page 1 is rendered; its highlight wins over an earlier group on
        // a page that has not been drawn.
        s.set_highlights(vec![
            group(
                "far",
                vec![BoundingBox {
                    page: 3,
                    x0: 0.0,
                    y0: 0.0,
                    x1: 10.0,
                    y1: 10.0,
                }],
            ),
            group(
                "near",
                vec![BoundingBox {
                    page: 1,
                    x0: 0.0,
                    y0: 0.0,
                    x1: 10.0,
                    y1: 10.0,
                }],
            ),
        ]);

        let events = s.poll_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ViewerEvent::ScrollToHighlight { page: 1, .. }))
        );
    }

    #[test]
    fn continuous_scale_change_rerenders_visible_only() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.set_view_mode(ViewMode::Continuous);
        s.report_visibility(2, true);
        s.report_visibility(3, true);
        s.pump();
        engine.clear_render_log();

        s.zoom_in();
        s.pump();

        let mut pages = engine.renders_started();
        pages.sort_unstable();
        assert_eq!(pages, vec![2, 3]);
    }

    #[test]
    fn revisiting_a_page_at_same_scale_does_not_rerender() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.set_view_mode(ViewMode::Continuous);

        s.report_visibility(2, true);
        s.pump();
        engine.clear_render_log();

        s.report_visibility(2, false);
        s.report_visibility(2, true);
        s.pump();

        assert!(engine.renders_started().is_empty());
        // Content was retained while off screen.
        assert!(s.rendered_page(2).is_some());
    }

    #[test]
    fn continuous_page_change_emits_progress() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.set_view_mode(ViewMode::Continuous);
        s.poll_events();

        s.report_visibility(7, true);
        let events = s.poll_events();
        assert!(events.contains(&ViewerEvent::Progress {
            page: 7,
            total: 10,
            percent: 70.0
        }));
    }

    #[test]
    fn mode_switch_to_continuous_scrolls_without_rendering_all() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, Some(5)).unwrap();
        s.pump();
        engine.clear_render_log();
        s.poll_events();

        s.set_view_mode(ViewMode::Continuous);
        assert!(engine.renders_started().is_empty());
        assert!(
            s.poll_events()
                .contains(&ViewerEvent::ScrollToPage { page: 5 })
        );
    }

    #[test]
    fn fit_width_resize_is_applied_on_pump() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();

        s.fit_to_width(1000.0);
        assert_eq!(s.scale(), 1.6);
        assert_eq!(s.fit_mode(), FitMode::FitWidth);

        s.note_container_resize(700.0);
        s.note_container_resize(640.0);
        assert_eq!(s.scale(), 1.6);

        s.pump();
        assert_eq!(s.scale(), 1.0);
    }

    #[test]
    fn close_destroys_handle_after_cancelling() {
        let engine = FakeEngine::manual(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        let pending = engine.take_pending().pop().unwrap();

        s.close();
        assert_eq!(s.phase(), SessionPhase::Destroyed);
        assert!(pending.cancel_requested());
        assert!(engine.destroyed());

        // A late completion after teardown goes nowhere.
        pending.complete();
        s.pump();
        assert!(s.rendered_page(1).is_none());
    }

    #[test]
    fn reopen_tears_down_previous_document() {
        let engine = FakeEngine::manual(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        let pending = engine.take_pending().pop().unwrap();

        s.open(URL, None).unwrap();
        assert!(pending.cancel_requested());
        pending.acknowledge_cancel();
    }

    #[test]
    fn page_state_moves_through_sub_states() {
        let engine = FakeEngine::manual(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();

        assert_eq!(s.page_state(1), PageRenderState::Rendering);
        assert_eq!(s.page_state(2), PageRenderState::Unrendered);

        engine.take_pending().pop().unwrap().complete();
        s.pump();
        assert_eq!(s.page_state(1), PageRenderState::Rendered);
    }

    #[test]
    fn go_to_page_clamps_and_renders() {
        let engine = FakeEngine::auto(10, (600.0, 800.0));
        let mut s = session(&engine);
        s.open(URL, None).unwrap();
        s.pump();

        s.go_to_page(42);
        assert_eq!(s.current_page(), 10);
        s.pump();
        assert!(s.rendered_page(10).is_some());
    }
}
