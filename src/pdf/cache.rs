//! LRU cache for rasterized pages

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::{DocumentId, Raster, Rotation, Viewport};

/// Cache key for rasterized pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub document: DocumentId,
    /// Page number (1-indexed)
    pub page: usize,
    /// Scale factor (stored as its bit pattern for exact hashing)
    pub scale_bits: u32,
    pub rotation: Rotation,
    /// Display density (stored as its bit pattern for exact hashing)
    pub density_bits: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(document: DocumentId, page: usize, viewport: &Viewport, density: f32) -> Self {
        Self {
            document,
            page,
            scale_bits: viewport.scale.to_bits(),
            rotation: viewport.rotation,
            density_bits: density.to_bits(),
        }
    }
}

/// LRU cache for rasterized pages
pub struct RasterCache {
    cache: LruCache<CacheKey, Arc<Raster>>,
}

impl RasterCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached raster, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<Raster>> {
        self.cache.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a raster, returning a shared handle to it
    pub fn insert(&mut self, key: CacheKey, raster: Raster) -> Arc<Raster> {
        let arc = Arc::new(raster);
        self.cache.put(key, Arc::clone(&arc));
        arc
    }

    /// Drop every raster of a released document
    pub fn invalidate_document(&mut self, document: DocumentId) {
        let keys_to_remove: Vec<_> = self
            .cache
            .iter()
            .filter(|(k, _)| k.document == document)
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys_to_remove {
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

    /// Change the capacity, evicting least recently used rasters if it shrinks
    pub fn resize(&mut self, capacity: usize) {
        self.cache
            .resize(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN));
    }
}
