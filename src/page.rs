//! Composed page tiles.

use std::mem;

use anyhow::Context as _;
use glam::vec2;
use palette::Srgba;

use crate::{
    backend::{ShapeRequest, ShapingBackend},
    paginate::{PageBounds, Pagination, PaginationState},
    tile::{Tile, TileAllocator, TileError},
    RenderError,
};

/// A cached page: its boundaries and its composed tile.
pub struct Page {
    bounds: PageBounds,
    tile: Tile,
}

impl Page {
    pub fn bounds(&self) -> &PageBounds {
        &self.bounds
    }

    pub fn start(&self) -> usize {
        self.bounds.start
    }

    pub fn line_count(&self) -> u32 {
        self.bounds.line_count
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }
}

/// Draws text into page tiles through the backend and a font's glyph cache.
pub(crate) struct Composer<'a, B: ShapingBackend> {
    pub backend: &'a B,
    pub request: &'a ShapeRequest<'a, B::Face>,
    pub color: Srgba<u8>,
    pub line_height: f32,
}

impl<'a, B: ShapingBackend> Composer<'a, B> {
    /// Clears `tile` and draws the lines of `bounds` onto it. The first
    /// baseline sits one line below the top of the tile.
    pub fn compose(&self, bounds: &PageBounds, tile: &mut Tile) -> anyhow::Result<()> {
        let font = self.request.font;
        let glyphs = font.glyphs();
        let backend = self.backend;
        let color = self.color;

        tile.clear();
        backend
            .render_run(
                self.request,
                vec2(0., self.line_height),
                bounds.start,
                bounds.line_count,
                &mut |glyph_id, pen| {
                    let glyph =
                        glyphs.get_or_create(glyph_id, || backend.rasterize_glyph(font, glyph_id));
                    if let Some(image) = glyph.image() {
                        tile.draw_glyph(image, pen, color);
                    }
                },
            )
            .with_context(|| format!("failed to render page starting at character {}", bounds.start))?;
        Ok(())
    }
}

/// Holds one composed tile per page of the current pagination.
#[derive(Default)]
pub struct PageCache {
    pages: Vec<Page>,
    state: PaginationState,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn bounds(&self) -> impl Iterator<Item = &PageBounds> + '_ {
        self.pages.iter().map(Page::bounds)
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Releases every tile.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.state = PaginationState::default();
    }

    /// Replaces all pages with freshly composed tiles for `pagination`.
    ///
    /// Existing tiles are released before any new tile is allocated. If any
    /// page fails, nothing is published and the cache is left empty.
    pub(crate) fn regenerate<B: ShapingBackend>(
        &mut self,
        pagination: Pagination,
        composer: &Composer<B>,
        allocator: &TileAllocator,
    ) -> Result<(), RenderError> {
        self.clear();

        let mut pages = Vec::with_capacity(pagination.pages.len());
        for bounds in pagination.pages {
            let mut tile = allocator.allocate(bounds.size)?;
            composer.compose(&bounds, &mut tile)?;
            pages.push(Page { bounds, tile });
        }

        log::debug!(
            "Regenerated {} page tiles ({} bytes in use)",
            pages.len(),
            allocator.bytes_in_use()
        );
        self.pages = pages;
        self.state = pagination.state;
        Ok(())
    }

    /// Re-composes every tile with the same page boundaries.
    ///
    /// Each page is drawn into a scratch tile which is swapped in only on
    /// success, so a failure never leaves a half-drawn page behind. When the
    /// memory limit leaves no room for a scratch tile, the page is redrawn
    /// directly into its own tile instead.
    pub(crate) fn update_in_place<B: ShapingBackend>(
        &mut self,
        composer: &Composer<B>,
        allocator: &TileAllocator,
    ) -> Result<(), RenderError> {
        let mut scratch: Option<Tile> = None;
        for page in &mut self.pages {
            let mut tile = match scratch.take() {
                Some(tile) if tile.size() == page.bounds.size => tile,
                other => {
                    drop(other);
                    match allocator.allocate(page.bounds.size) {
                        Ok(tile) => tile,
                        Err(TileError::OutOfMemory { .. }) => {
                            log::debug!(
                                "No room for a scratch tile; redrawing page at {} directly",
                                page.bounds.start
                            );
                            composer.compose(&page.bounds, &mut page.tile)?;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            };
            composer.compose(&page.bounds, &mut tile)?;
            mem::swap(&mut page.tile, &mut tile);
            scratch = Some(tile);
        }

        log::debug!("Re-rendered {} page tiles in place", self.pages.len());
        Ok(())
    }
}
