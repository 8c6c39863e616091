//! Interactive document viewport rendering core
//!
//! Rasterizes document pages through an external engine, overlays
//! content-space highlight rectangles, and keeps rendering correct under
//! rapid zoom/pan/page changes via generation-counter task sequencing.
//! Supports single-page and virtualized continuous-scroll paging.
//!
//! The host owns the actual drawing surface and input system; this crate
//! owns the state and the scheduling decisions and is fully exercisable
//! without either.

pub mod cache;
pub mod coords;
pub mod highlight;
pub mod pan;
pub mod raster;
pub mod sequencer;
pub mod session;
pub mod visibility;
pub mod zoom;

pub mod test_utils;

pub use cache::{RasterCache, RasterKey};
pub use coords::{ContentRect, ViewRect, ViewportGeometry, to_viewport_rect};
pub use highlight::{BoundingBox, HighlightGroup, OverlayRect, Rgb};
pub use pan::{PanController, PointerInput};
pub use raster::{
    ChannelRenderTask, DocumentHandle, OpenError, PageHandle, PageRaster, RasterEngine,
    RasterOutcome, RenderFault, RenderTask, RenderTaskPort,
};
pub use sequencer::{Applied, Generation, PageRenderState, RenderSequencer};
pub use session::{
    DocumentSource, FetchError, LoadError, SessionManager, SessionPhase, ViewMode, ViewerEvent,
};
pub use visibility::VisibilityTracker;
pub use zoom::{FitMode, PointerPos, ScrollOffsets, ZoomController};
