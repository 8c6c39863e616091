//! Deterministic fakes for exercising the viewer without a real
//! rasterization engine
//!
//! `FakeEngine` implements the full engine contract in-process. In `auto`
//! mode every render completes on the next poll; in `manual` mode each
//! render parks as a [`PendingRender`] the test resolves explicitly, which
//! makes completion-order races reproducible.

use std::sync::{Arc, Mutex, PoisonError};

use crate::coords::ViewportGeometry;
use crate::raster::{
    ChannelRenderTask, DocumentHandle, OpenError, PageHandle, PageRaster, RasterEngine,
    RasterOutcome, RenderFault, RenderTask, RenderTaskPort,
};
use crate::session::{DocumentSource, FetchError};

/// Serves one fixed byte blob for one URL; anything else fails the fetch.
pub struct StaticSource {
    url: String,
    bytes: Vec<u8>,
}

impl StaticSource {
    #[must_use]
    pub fn single(url: &str, bytes: Vec<u8>) -> Self {
        Self {
            url: url.to_string(),
            bytes,
        }
    }
}

impl DocumentSource for StaticSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url == self.url {
            Ok(self.bytes.clone())
        } else {
            Err(FetchError::new(format!("no such document: {url}")))
        }
    }
}

/// A render parked by a manual-mode [`FakeEngine`], waiting for the test to
/// decide its outcome.
pub struct PendingRender {
    page: usize,
    scale: f32,
    width_px: u32,
    height_px: u32,
    port: RenderTaskPort,
}

impl PendingRender {
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// True once the viewer has requested cancellation of this render.
    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.port.cancel_requested()
    }

    /// Resolve successfully with a raster matching the requested geometry.
    pub fn complete(self) {
        let raster = stub_raster(self.width_px, self.height_px, self.scale);
        self.port.finish(RasterOutcome::Ready(raster));
    }

    /// Resolve as cancelled.
    pub fn acknowledge_cancel(self) {
        self.port.finish(RasterOutcome::Cancelled);
    }

    /// Resolve with a render fault.
    pub fn fail(self, detail: &str) {
        self.port
            .finish(RasterOutcome::Failed(RenderFault::new(detail)));
    }
}

fn stub_raster(width_px: u32, height_px: u32, scale: f32) -> PageRaster {
    PageRaster {
        pixels: vec![0xFF; (width_px * height_px * 3) as usize],
        width_px,
        height_px,
        scale,
    }
}

struct EngineState {
    page_count: usize,
    page_size: (f32, f32),
    fail_open: bool,
    auto_complete: bool,
    pending: Vec<PendingRender>,
    render_log: Vec<usize>,
    destroyed: bool,
}

/// In-process fake rasterization engine. Clones share state, so a test can
/// keep one handle for inspection after giving the other to the session.
#[derive(Clone)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    /// Engine whose renders complete on the next poll.
    #[must_use]
    pub fn auto(page_count: usize, page_size: (f32, f32)) -> Self {
        Self::build(page_count, page_size, true)
    }

    /// Engine whose renders park as [`PendingRender`]s until resolved.
    #[must_use]
    pub fn manual(page_count: usize, page_size: (f32, f32)) -> Self {
        Self::build(page_count, page_size, false)
    }

    fn build(page_count: usize, page_size: (f32, f32), auto_complete: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                page_count,
                page_size,
                fail_open: false,
                auto_complete,
                pending: Vec::new(),
                render_log: Vec::new(),
                destroyed: false,
            })),
        }
    }

    /// Make subsequent `open` calls fail with a parse error.
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Drain the parked renders (manual mode), in start order.
    #[must_use]
    pub fn take_pending(&self) -> Vec<PendingRender> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Pages for which a render was started, in start order.
    #[must_use]
    pub fn renders_started(&self) -> Vec<usize> {
        self.lock().render_log.clone()
    }

    pub fn clear_render_log(&self) {
        self.lock().render_log.clear();
    }

    /// Whether the most recently opened handle has been destroyed.
    #[must_use]
    pub fn destroyed(&self) -> bool {
        self.lock().destroyed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RasterEngine for FakeEngine {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, OpenError> {
        let mut state = self.lock();
        if state.fail_open || bytes.is_empty() {
            return Err(OpenError::new("unreadable document bytes"));
        }
        state.destroyed = false;
        Ok(Box::new(FakeDocument {
            state: self.state.clone(),
        }))
    }
}

struct FakeDocument {
    state: Arc<Mutex<EngineState>>,
}

impl FakeDocument {
    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentHandle for FakeDocument {
    fn page_count(&self) -> usize {
        self.lock().page_count
    }

    fn page(&self, number: usize) -> Result<Box<dyn PageHandle>, RenderFault> {
        let state = self.lock();
        if number < 1 || number > state.page_count {
            return Err(RenderFault::new(format!(
                "page {number} out of range 1..={}",
                state.page_count
            )));
        }
        Ok(Box::new(FakePage {
            state: self.state.clone(),
            number,
        }))
    }

    fn destroy(&mut self) {
        self.lock().destroyed = true;
    }
}

struct FakePage {
    state: Arc<Mutex<EngineState>>,
    number: usize,
}

impl PageHandle for FakePage {
    fn size(&self) -> (f32, f32) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .page_size
    }

    fn begin_render(&self, viewport: &ViewportGeometry) -> Box<dyn RenderTask> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.render_log.push(self.number);

        let width_px = viewport.width_px.round() as u32;
        let height_px = viewport.height_px.round() as u32;

        if state.auto_complete {
            return Box::new(ImmediateTask(Some(RasterOutcome::Ready(stub_raster(
                width_px,
                height_px,
                viewport.scale,
            )))));
        }

        let (task, port) = ChannelRenderTask::pair();
        state.pending.push(PendingRender {
            page: self.number,
            scale: viewport.scale,
            width_px,
            height_px,
            port,
        });
        Box::new(task)
    }
}

/// Task that is already done when first polled. Cancellation is moot: the
/// sequencer drops a cancelled handle without polling it again.
struct ImmediateTask(Option<RasterOutcome>);

impl RenderTask for ImmediateTask {
    fn cancel(&mut self) {}

    fn try_complete(&mut self) -> Option<RasterOutcome> {
        self.0.take()
    }
}
