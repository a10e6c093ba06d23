use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::backend::{GlyphId, GlyphImage};

#[derive(Debug, Clone)]
pub enum Glyph {
    Empty, // for glyphs without ink or that failed to rasterize
    Raster(Arc<GlyphImage>),
}

impl Glyph {
    pub fn is_empty(&self) -> bool {
        matches!(self, Glyph::Empty)
    }

    pub fn image(&self) -> Option<&GlyphImage> {
        match self {
            Glyph::Empty => None,
            Glyph::Raster(image) => Some(image),
        }
    }
}

/// A cache of rasterized glyphs for a single font.
///
/// The cache is bounded and evicts the least recently used glyph when
/// full. Evicted or cleared glyphs are rasterized again on the next lookup,
/// so losing an entry only costs time.
///
/// The lock is held only while looking up or publishing an entry, never
/// while the backend rasterizes. Two threads missing on the same glyph may
/// both rasterize it; the first published result wins.
pub struct GlyphCache {
    cache: Mutex<LruCache<GlyphId, Glyph, ahash::RandomState>>,
}

impl GlyphCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::with_hasher(
                capacity.max(1),
                ahash::RandomState::new(),
            )),
        }
    }

    /// Gets a glyph, calling `rasterize` if it is not cached.
    pub fn get_or_create(
        &self,
        glyph_id: GlyphId,
        rasterize: impl FnOnce() -> anyhow::Result<Option<GlyphImage>>,
    ) -> Glyph {
        if let Some(glyph) = self.cache.lock().get(&glyph_id) {
            return glyph.clone();
        }

        let glyph = match rasterize() {
            Ok(Some(image)) if image.has_ink() => Glyph::Raster(Arc::new(image)),
            Ok(_) => Glyph::Empty,
            Err(e) => {
                // Not cached, so the next lookup tries again.
                log::warn!("Failed to rasterize glyph {}: {:#}", glyph_id, e);
                return Glyph::Empty;
            }
        };

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.get(&glyph_id) {
            return existing.clone();
        }
        cache.put(glyph_id, glyph.clone());
        glyph
    }

    /// Drops every cached glyph.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn contains(&self, glyph_id: GlyphId) -> bool {
        self.cache.lock().contains(&glyph_id)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().cap()
    }
}
