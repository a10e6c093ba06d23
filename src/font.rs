//! Font handles.
//!
//! Font parsing and shaping are handled by the [`ShapingBackend`](crate::ShapingBackend);
//! a [`Font`] pairs one of its faces with a nominal size and a glyph cache.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::glyph::GlyphCache;

slotmap::new_key_type! {
    /// Handle to a font registered with a [`Context`](crate::Context).
    ///
    /// Created by `Context::add_font` and released with `Context::remove_font`.
    /// A removed handle never resolves again.
    pub struct FontId;
}

#[derive(Debug, thiserror::Error)]
#[error("font {0:?} has been removed or was never registered")]
pub struct MissingFont(pub FontId);

/// A backend face at a nominal size.
///
/// Each `Font` owns its own [`GlyphCache`], since glyph rasters depend on
/// the size.
pub struct Font<F> {
    face: F,
    size: f32,
    glyphs: Arc<GlyphCache>,
}

/// Clones share the glyph cache. Use [`Font::with_size`] for a separate one.
impl<F: Clone> Clone for Font<F> {
    fn clone(&self) -> Self {
        Self {
            face: self.face.clone(),
            size: self.size,
            glyphs: Arc::clone(&self.glyphs),
        }
    }
}

impl<F> std::fmt::Debug for Font<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("size", &self.size)
            .field("cached_glyphs", &self.glyphs.len())
            .finish()
    }
}

impl<F: Clone> Font<F> {
    pub fn new(face: F, size: f32, glyph_cache_capacity: usize) -> Self {
        Self {
            face,
            size,
            glyphs: Arc::new(GlyphCache::new(glyph_cache_capacity)),
        }
    }

    /// Creates a font sharing this font's face at a different size.
    /// The new font starts with an empty glyph cache.
    pub fn with_size(&self, size: f32) -> Self {
        Self::new(self.face.clone(), size, self.glyphs.capacity())
    }

    pub fn face(&self) -> &F {
        &self.face
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn glyphs(&self) -> &Arc<GlyphCache> {
        &self.glyphs
    }
}

/// The fonts available to a `Context`.
pub(crate) struct Fonts<F> {
    fonts: SlotMap<FontId, Font<F>>,
}

impl<F> Default for Fonts<F> {
    fn default() -> Self {
        Self {
            fonts: SlotMap::with_key(),
        }
    }
}

impl<F: Clone> Fonts<F> {
    pub fn add(&mut self, font: Font<F>) -> FontId {
        let size = font.size();
        let id = self.fonts.insert(font);
        log::info!("Registered font {:?} at size {}", id, size);
        id
    }

    pub fn remove(&mut self, id: FontId) -> Result<Font<F>, MissingFont> {
        let font = self.fonts.remove(id).ok_or(MissingFont(id))?;
        log::info!("Removed font {:?}", id);
        Ok(font)
    }

    pub fn get(&self, id: FontId) -> Result<&Font<F>, MissingFont> {
        self.fonts.get(id).ok_or(MissingFont(id))
    }

    pub fn clone_with_size(&mut self, id: FontId, size: f32) -> Result<FontId, MissingFont> {
        let font = self.get(id)?.with_size(size);
        Ok(self.add(font))
    }
}
