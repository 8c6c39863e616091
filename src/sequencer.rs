//! Render task sequencing
//!
//! Keeps rendering correct under rapid, overlapping requests: zooming while
//! a render is in flight, paging quickly, switching documents mid-render.
//! Correctness is generation-counter based. Every invalidating change bumps
//! the counter; a completed task whose captured generation is stale is
//! discarded without touching shared state. Results therefore apply in
//! request-recency order, never completion order.

use std::collections::HashMap;

use log::{debug, warn};

use crate::raster::{PageRaster, RasterOutcome, RenderTask};

/// Monotonically increasing marker for invalidation epochs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

/// Per-page render sub-state. `Rendering` is re-entrant: a new request for
/// the same page aborts and restarts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageRenderState {
    Unrendered,
    Rendering,
    Rendered,
}

struct InFlight {
    generation: Generation,
    scale: f32,
    task: Box<dyn RenderTask>,
}

/// A fresh result the caller must apply to shared drawing state.
#[derive(Debug)]
pub enum Applied {
    /// The raster for `page` is current and may be written to its surface.
    Raster {
        page: usize,
        scale: f32,
        raster: PageRaster,
    },
    /// The page's raster genuinely failed; leave its surface blank.
    Failed { page: usize },
}

/// Owns the generation counter and the per-page map of in-flight raster
/// tasks. Keyed by page in continuous mode; single-page mode simply only
/// ever uses one key.
pub struct RenderSequencer {
    current: Generation,
    in_flight: HashMap<usize, InFlight>,
}

impl Default for RenderSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Generation(0),
            in_flight: HashMap::new(),
        }
    }

    /// Current invalidation epoch.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.current
    }

    /// Start a new epoch. Everything captured before this call is stale.
    pub fn bump(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    /// Track a new raster task for `page`, cancelling any task already in
    /// flight for the same page.
    pub fn begin(&mut self, page: usize, scale: f32, task: Box<dyn RenderTask>) {
        if let Some(mut superseded) = self.in_flight.remove(&page) {
            superseded.task.cancel();
        }

        self.in_flight.insert(
            page,
            InFlight {
                generation: self.current,
                scale,
                task,
            },
        );
    }

    /// Whether a task for `page` is still in flight.
    #[must_use]
    pub fn is_rendering(&self, page: usize) -> bool {
        self.in_flight.contains_key(&page)
    }

    /// Cancel the task for one page, if any.
    pub fn cancel_page(&mut self, page: usize) {
        if let Some(mut flight) = self.in_flight.remove(&page) {
            flight.task.cancel();
        }
    }

    /// Cancel every in-flight task. Called on teardown and document change,
    /// after the generation bump.
    pub fn cancel_all(&mut self) {
        for (_, mut flight) in self.in_flight.drain() {
            flight.task.cancel();
        }
    }

    /// Poll every in-flight task and return the results that are safe to
    /// apply. Stale results are discarded here; cancellations are silent;
    /// genuine faults are logged and surface as [`Applied::Failed`].
    pub fn pump(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        let mut done = Vec::new();

        for (&page, flight) in &mut self.in_flight {
            let Some(outcome) = flight.task.try_complete() else {
                continue;
            };
            done.push(page);

            if flight.generation < self.current {
                debug!("discarding stale raster for page {page} (gen {:?})", flight.generation);
                continue;
            }

            match outcome {
                RasterOutcome::Ready(raster) => applied.push(Applied::Raster {
                    page,
                    scale: flight.scale,
                    raster,
                }),
                RasterOutcome::Cancelled => {}
                RasterOutcome::Failed(fault) => {
                    warn!("page {page} failed to render: {fault}");
                    applied.push(Applied::Failed { page });
                }
            }
        }

        for page in done {
            self.in_flight.remove(&page);
        }

        applied
    }
}
