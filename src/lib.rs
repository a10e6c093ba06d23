//! Paginated rendering of long text runs into cached page tiles.
//! Text is shaped by a pluggable [`ShapingBackend`], split into pages
//! bounded by a pixel budget, and only the pages intersecting the
//! viewport are drawn.

mod backend;
mod context;
mod font;
mod glyph;
mod invalidate;
mod page;
mod paged;
mod paginate;
mod text;
mod thread_pool;
mod tile;
mod viewport;

#[cfg(test)]
mod testing;

pub use backend::{FontMetrics, GlyphId, GlyphImage, LineBreak, ShapeRequest, ShapingBackend};
pub use context::{Context, ContextBuilder, Settings};
pub use font::{Font, FontId, MissingFont};
pub use glyph::{Glyph, GlyphCache};
pub use invalidate::{Change, Invalidation, InvalidationController};
pub use page::{Page, PageCache};
pub use paged::{Host, PagedText};
pub use paginate::{
    page_layout, paginate, PageBounds, Pagination, PaginationError, PaginationState, Paginator,
};
pub use text::{Align, TextRun, WritingDirection};
pub use thread_pool::{BasicThreadPool, ThreadPool};
pub use tile::{Surface, Tile, TileAllocator, TileError};
pub use viewport::{draw_visible, visible_pages};

pub use palette::Srgba;

/// An error while bringing a surface's pages up to date.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
