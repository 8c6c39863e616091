//! External rasterization engine contract
//!
//! The document parsing/rasterization engine is a black box behind these
//! traits: given a page and a scale it produces a raster image and page
//! geometry. Engines may rasterize wherever they like (worker threads,
//! in-process); the core only ever polls cooperatively.

use crate::coords::ViewportGeometry;

/// Raw rendered page image.
///
/// RGB pixel data plus the scale it was produced at. This is the only thing
/// the sequencer ever writes into a page slot.
#[derive(Clone)]
pub struct PageRaster {
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width_px: u32,
    /// Image height in pixels
    pub height_px: u32,
    /// Scale factor used for rendering
    pub scale: f32,
}

impl std::fmt::Debug for PageRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRaster")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Document open failure (parse/format error).
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to open document: {detail}")]
pub struct OpenError {
    pub detail: String,
}

impl OpenError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}

/// A single page's raster failure, for reasons other than cancellation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{detail}")]
pub struct RenderFault {
    pub detail: String,
}

impl RenderFault {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}

/// Outcome of one raster task.
///
/// Cancellation is an expected value, not an error: the sequencer compares
/// variants instead of inspecting exception-like types.
#[derive(Debug)]
pub enum RasterOutcome {
    /// Rendering finished; the raster is ready to apply.
    Ready(PageRaster),
    /// The task was cancelled. Silent no-op downstream.
    Cancelled,
    /// Rendering genuinely failed. Logged; the page stays blank.
    Failed(RenderFault),
}

/// Opaque cancellable handle for one in-flight raster operation.
///
/// `try_complete` returns `None` while the task is still running. A task
/// that never completes leaves its page in the rendering state indefinitely;
/// no timeout is imposed.
pub trait RenderTask {
    /// Request cooperative cancellation. The task is expected to yield
    /// [`RasterOutcome::Cancelled`] promptly, but the sequencer does not
    /// rely on it: superseded results are discarded by generation anyway.
    fn cancel(&mut self);

    /// Poll for completion without blocking.
    fn try_complete(&mut self) -> Option<RasterOutcome>;
}

/// One page of an open document.
pub trait PageHandle {
    /// Native page size in content units (width, height), unscaled.
    fn size(&self) -> (f32, f32);

    /// Page geometry at `scale`. Pure given the scale; produced fresh for
    /// every render cycle.
    fn viewport(&self, scale: f32) -> ViewportGeometry {
        let (w, h) = self.size();
        ViewportGeometry::for_page(w, h, scale)
    }

    /// Start rasterizing this page for the given geometry.
    fn begin_render(&self, viewport: &ViewportGeometry) -> Box<dyn RenderTask>;
}

/// An open document. Dropped or destroyed exactly once by the session.
pub trait DocumentHandle {
    fn page_count(&self) -> usize;

    /// Fetch a page handle. Pages are 1-based, `1..=page_count`.
    fn page(&self, number: usize) -> Result<Box<dyn PageHandle>, RenderFault>;

    /// Release native resources. No raster task may touch the handle after
    /// this returns; the session guarantees it by invalidating and
    /// cancelling first.
    fn destroy(&mut self);
}

/// The rasterization engine itself.
pub trait RasterEngine {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, OpenError>;
}

/// Host side of a [`ChannelRenderTask`]: whoever actually rasterizes holds
/// this and reports the outcome through it.
pub struct RenderTaskPort {
    outcome_tx: flume::Sender<RasterOutcome>,
    cancel_rx: flume::Receiver<()>,
}

impl RenderTaskPort {
    /// True once the viewer side has requested cancellation.
    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.cancel_rx.try_recv().is_ok()
    }

    /// Report the outcome. Ignores a hung-up viewer side.
    pub fn finish(&self, outcome: RasterOutcome) {
        let _ = self.outcome_tx.send(outcome);
    }
}

/// [`RenderTask`] backed by a flume channel pair.
///
/// Engines that rasterize on worker threads send the outcome through the
/// port; the sequencer polls the receiver. The same mechanism lets tests
/// decide exactly when and in what order tasks complete.
pub struct ChannelRenderTask {
    outcome_rx: flume::Receiver<RasterOutcome>,
    cancel_tx: flume::Sender<()>,
}

impl ChannelRenderTask {
    /// Create a task/port pair.
    #[must_use]
    pub fn pair() -> (Self, RenderTaskPort) {
        let (outcome_tx, outcome_rx) = flume::bounded(1);
        let (cancel_tx, cancel_rx) = flume::bounded(1);
        (
            Self { outcome_rx, cancel_tx },
            RenderTaskPort { outcome_tx, cancel_rx },
        )
    }
}

impl RenderTask for ChannelRenderTask {
    fn cancel(&mut self) {
        let _ = self.cancel_tx.try_send(());
    }

    fn try_complete(&mut self) -> Option<RasterOutcome> {
        self.outcome_rx.try_recv().ok()
    }
}
