use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::{
    backend::{FontMetrics, GlyphId, ShapingBackend},
    font::{Font, Fonts, MissingFont},
    tile::TileAllocator,
    FontId, PagedText, ThreadPool,
};

/// Builder for a [`Context`].
pub struct ContextBuilder<B> {
    settings: Settings,
    backend: B,
}

impl<B: ShapingBackend> ContextBuilder<B> {
    /// Replaces all settings at once, e.g. with ones loaded from a config file.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the maximum number of pixels in one page tile. Together with the
    /// frame width this bounds the height of each page.
    ///
    /// The default is 320 * 480.
    pub fn max_pixels_per_page(mut self, pixels: u32) -> Self {
        self.settings.max_pixels_per_page = pixels;
        self
    }

    /// Sets how many rasterized glyphs each font keeps before evicting the
    /// least recently used one.
    ///
    /// The default is 1024.
    pub fn glyph_cache_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "glyph cache capacity must be positive");
        self.settings.glyph_cache_capacity = capacity;
        self
    }

    /// Caps the memory held by page tiles across every surface of the context.
    ///
    /// Unlimited by default.
    pub fn tile_memory_limit(mut self, bytes: Option<usize>) -> Self {
        self.settings.tile_memory_limit = bytes;
        self
    }

    /// Sets the inset, in pixels, of the pages from the surface origin.
    ///
    /// The default is 3.
    pub fn padding(mut self, padding: f32) -> Self {
        self.settings.padding = padding;
        self
    }

    /// Sets the narrowest frame, in pixels, that text is laid out in.
    /// Narrower frames show nothing.
    ///
    /// The default is 0.
    pub fn min_width(mut self, width: u32) -> Self {
        self.settings.min_width = width;
        self
    }

    /// Sets the smallest height reported for non-empty text.
    ///
    /// The default is 0.
    pub fn min_height(mut self, height: u32) -> Self {
        self.settings.min_height = height;
        self
    }

    /// Builds the context.
    pub fn build(self) -> Context<B> {
        log::debug!("Creating context with {:?}", self.settings);
        Context(Arc::new(Inner {
            tiles: TileAllocator::new(self.settings.tile_memory_limit),
            fonts: RwLock::new(Fonts::default()),
            settings: self.settings,
            backend: self.backend,
        }))
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_pixels_per_page: u32,
    pub glyph_cache_capacity: usize,
    pub tile_memory_limit: Option<usize>,
    pub padding: f32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_pixels_per_page: 320 * 480,
            glyph_cache_capacity: 1024,
            tile_memory_limit: None,
            padding: 3.,
            min_width: 0,
            min_height: 0,
        }
    }
}

/// The thread-safe context. Stores the shaping backend, all fonts,
/// and the tile memory accounting.
///
/// The `Context` can be cloned to create a new handle.
/// It internally uses an `Arc`.
///
/// To show text on a surface, call [`create_paged_text`](Context::create_paged_text).
pub struct Context<B: ShapingBackend>(Arc<Inner<B>>);

impl<B: ShapingBackend> Clone for Context<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

struct Inner<B: ShapingBackend> {
    settings: Settings,
    backend: B,
    tiles: TileAllocator,
    fonts: RwLock<Fonts<B::Face>>,
}

impl<B: ShapingBackend> Context<B> {
    pub fn builder(backend: B) -> ContextBuilder<B> {
        ContextBuilder {
            settings: Settings::default(),
            backend,
        }
    }

    pub fn new(backend: B) -> Self {
        Self::builder(backend).build()
    }

    /// Registers a backend face at `size`. The returned handle stays valid
    /// until [`remove_font`](Context::remove_font).
    pub fn add_font(&self, face: B::Face, size: f32) -> FontId {
        let font = Font::new(face, size, self.settings().glyph_cache_capacity);
        self.0.fonts.write().add(font)
    }

    /// Registers the face of `font` at another size, with its own glyph cache.
    pub fn clone_font(&self, font: FontId, size: f32) -> Result<FontId, MissingFont> {
        self.0.fonts.write().clone_with_size(font, size)
    }

    /// Releases a font and its glyph cache.
    pub fn remove_font(&self, font: FontId) -> Result<(), MissingFont> {
        self.0.fonts.write().remove(font).map(|_| ())
    }

    pub fn font_metrics(&self, font: FontId) -> Result<FontMetrics, MissingFont> {
        let fonts = self.fonts();
        Ok(self.backend().metrics(fonts.get(font)?))
    }

    /// Drops every cached glyph of `font`. They are rasterized again on demand.
    pub fn clear_glyph_cache(&self, font: FontId) -> Result<(), MissingFont> {
        self.fonts().get(font)?.glyphs().clear();
        Ok(())
    }

    /// Rasterizes `glyphs` of `font` on `pool` so that later draws hit the cache.
    pub fn warm_up_glyphs(
        &self,
        pool: &impl ThreadPool,
        font: FontId,
        glyphs: Vec<GlyphId>,
    ) -> Result<(), MissingFont> {
        let font = self.fonts().get(font)?.clone();
        let cx = self.clone();
        pool.spawn(move || {
            let backend = cx.backend();
            for glyph in &glyphs {
                font.glyphs()
                    .get_or_create(*glyph, || backend.rasterize_glyph(&font, *glyph));
            }
            log::debug!("Warmed up {} glyphs", glyphs.len());
        });
        Ok(())
    }

    pub fn create_paged_text(&self) -> PagedText<B> {
        PagedText::new(self.clone())
    }

    pub fn backend(&self) -> &B {
        &self.0.backend
    }

    pub fn settings(&self) -> &Settings {
        &self.0.settings
    }

    pub fn tile_allocator(&self) -> &TileAllocator {
        &self.0.tiles
    }

    pub(crate) fn fonts(&self) -> RwLockReadGuard<Fonts<B::Face>> {
        self.0.fonts.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{MockBackend, MockFace},
        BasicThreadPool,
    };

    #[test]
    fn font_lifecycle() {
        let cx = Context::new(MockBackend::new(10, 12.));
        let font = cx.add_font(MockFace, 16.);
        assert_eq!(cx.font_metrics(font).unwrap().leading, 12.);

        let big = cx.clone_font(font, 32.).unwrap();
        assert_eq!(cx.font_metrics(big).unwrap().size, 32.);

        cx.remove_font(font).unwrap();
        assert!(cx.font_metrics(font).is_err());
        assert!(cx.clone_font(font, 8.).is_err());
        assert!(cx.font_metrics(big).is_ok());
    }

    #[test]
    fn builder_settings() {
        let cx = Context::builder(MockBackend::new(10, 12.))
            .max_pixels_per_page(1000)
            .glyph_cache_capacity(4)
            .tile_memory_limit(Some(4096))
            .padding(0.)
            .min_width(100)
            .min_height(50)
            .build();

        assert_eq!(
            cx.settings(),
            &Settings {
                max_pixels_per_page: 1000,
                glyph_cache_capacity: 4,
                tile_memory_limit: Some(4096),
                padding: 0.,
                min_width: 100,
                min_height: 50,
            }
        );
        assert_eq!(cx.tile_allocator().limit(), Some(4096));

        let font = cx.add_font(MockFace, 16.);
        assert_eq!(cx.fonts().get(font).unwrap().glyphs().capacity(), 4);
    }

    #[test]
    fn warm_up_fills_the_cache() {
        let cx = Context::new(MockBackend::new(10, 12.));
        let font = cx.add_font(MockFace, 16.);
        let pool = BasicThreadPool::new(2);

        let glyphs: Vec<GlyphId> = "hello world".chars().map(|c| c as GlyphId).collect();
        cx.warm_up_glyphs(&pool, font, glyphs).unwrap();
        // Dropping the pool lets the workers drain the queue and exit.
        drop(pool);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while cx.fonts().get(font).unwrap().glyphs().len() < 8 {
            assert!(std::time::Instant::now() < deadline, "warm-up timed out");
            std::thread::yield_now();
        }
        // "helo wrd": the space is cached as an empty glyph.
        assert!(cx.fonts().get(font).unwrap().glyphs().contains(' ' as GlyphId));
        assert_eq!(cx.backend().rasterize_calls(), 8);
    }
}
