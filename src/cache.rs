//! Bounded LRU cache for applied page rasters
//!
//! Owned by the session manager so lifetime and eviction are explicit and
//! testable. A hit at the current page+scale lets highlight-only changes
//! redraw the overlay without re-running the rasterizer.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::raster::PageRaster;

/// Default capacity in cached rasters.
pub const DEFAULT_CAPACITY: usize = 16;

/// Cache key for applied rasters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RasterKey {
    /// Page number (1-based)
    pub page: usize,
    /// Scale factor (stored as millionths for stable hashing)
    pub scale_millionths: u32,
}

impl RasterKey {
    #[must_use]
    pub fn new(page: usize, scale: f32) -> Self {
        Self {
            page,
            scale_millionths: (scale * 1_000_000.0) as u32,
        }
    }
}

/// LRU cache of rendered page rasters, least-recently-used eviction.
pub struct RasterCache {
    cache: LruCache<RasterKey, Arc<PageRaster>>,
}

impl RasterCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached raster, promoting it in the LRU order.
    #[must_use]
    pub fn get(&mut self, key: &RasterKey) -> Option<Arc<PageRaster>> {
        self.cache.get(key).cloned()
    }

    /// Check for a key without promoting it.
    #[must_use]
    pub fn contains(&self, key: &RasterKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a raster, returning the shared handle.
    pub fn insert(&mut self, key: RasterKey, raster: PageRaster) -> Arc<PageRaster> {
        let arc = Arc::new(raster);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Drop everything, e.g. on document change.
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Drop all cached scales of one page.
    pub fn invalidate_page(&mut self, page: usize) {
        let stale: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.page == page)
            .map(|(k, _)| *k)
            .collect();

        for key in stale {
            self.cache.pop(&key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
