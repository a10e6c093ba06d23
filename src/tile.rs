//! Raster tiles backing cached pages, and the memory accounting for them.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use glam::{uvec2, UVec2, Vec2};
use palette::Srgba;
use tiny_skia::{Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

use crate::backend::GlyphImage;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("cannot allocate a tile with zero width or height ({0})")]
    ZeroSize(UVec2),
    #[error("tile of size {size} needs {requested} bytes, but only {available} of {limit} bytes are available")]
    OutOfMemory {
        size: UVec2,
        requested: usize,
        available: usize,
        limit: usize,
    },
    #[error("tile of size {0} is too large to allocate")]
    TooLarge(UVec2),
}

/// Hands out tiles while keeping the total tile memory under an optional limit.
///
/// Tiles give their bytes back when dropped, so releasing old tiles before
/// allocating new ones keeps peak usage at one page set.
#[derive(Debug, Clone, Default)]
pub struct TileAllocator {
    limit: Option<usize>,
    in_use: Arc<AtomicUsize>,
}

impl TileAllocator {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bytes currently held by live tiles.
    pub fn bytes_in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Allocates a transparent tile.
    pub fn allocate(&self, size: UVec2) -> Result<Tile, TileError> {
        if size.x == 0 || size.y == 0 {
            return Err(TileError::ZeroSize(size));
        }
        let bytes = (size.x as usize)
            .checked_mul(size.y as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or(TileError::TooLarge(size))?;

        self.reserve(size, bytes)?;
        let lease = Lease {
            bytes,
            in_use: Arc::clone(&self.in_use),
        };

        // On failure the lease drops and hands the reservation back.
        let pixmap = Pixmap::new(size.x, size.y).ok_or(TileError::TooLarge(size))?;
        Ok(Tile {
            pixmap,
            _lease: lease,
        })
    }

    fn reserve(&self, size: UVec2, bytes: usize) -> Result<(), TileError> {
        let limit = match self.limit {
            Some(limit) => limit,
            None => {
                self.in_use.fetch_add(bytes, Ordering::AcqRel);
                return Ok(());
            }
        };

        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                in_use.checked_add(bytes).filter(|&total| total <= limit)
            })
            .map(|_| ())
            .map_err(|in_use| TileError::OutOfMemory {
                size,
                requested: bytes,
                available: limit.saturating_sub(in_use),
                limit,
            })
    }
}

#[derive(Debug)]
struct Lease {
    bytes: usize,
    in_use: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.in_use.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

/// A composed raster image of one page.
#[derive(Debug)]
pub struct Tile {
    pixmap: Pixmap,
    _lease: Lease,
}

impl Tile {
    pub fn size(&self) -> UVec2 {
        uvec2(self.pixmap.width(), self.pixmap.height())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Blends a glyph's coverage mask, tinted with `color`, with its pen
    /// position at `pen`. Pixels falling outside the tile are clipped.
    pub fn draw_glyph(&mut self, image: &GlyphImage, pen: Vec2, color: Srgba<u8>) {
        let origin_x = pen.x.round() as i64 + image.left as i64;
        let origin_y = pen.y.round() as i64 - image.top as i64;
        let tile_width = self.pixmap.width() as i64;
        let tile_height = self.pixmap.height() as i64;
        let pixels = self.pixmap.pixels_mut();

        for row in 0..image.height as i64 {
            let y = origin_y + row;
            if y < 0 || y >= tile_height {
                continue;
            }
            for column in 0..image.width as i64 {
                let x = origin_x + column;
                if x < 0 || x >= tile_width {
                    continue;
                }
                let coverage = image.coverage[(row * image.width as i64 + column) as usize];
                if coverage == 0 {
                    continue;
                }
                let pixel = &mut pixels[(y * tile_width + x) as usize];
                *pixel = blend(*pixel, color, coverage);
            }
        }
    }
}

/// Source-over blend of `color` at `coverage` onto a premultiplied pixel.
fn blend(dst: PremultipliedColorU8, color: Srgba<u8>, coverage: u8) -> PremultipliedColorU8 {
    let alpha = mul_div_255(color.alpha, coverage);
    let inverse = 255 - alpha;
    let channel = |src: u8, dst: u8| mul_div_255(src, alpha) + mul_div_255(dst, inverse);

    PremultipliedColorU8::from_rgba(
        channel(color.red, dst.red()),
        channel(color.green, dst.green()),
        channel(color.blue, dst.blue()),
        alpha + mul_div_255(dst.alpha(), inverse),
    )
    .unwrap_or(dst)
}

fn mul_div_255(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// A host surface that page tiles are drawn onto.
pub trait Surface {
    /// Draws `tile` with its top-left corner at `position`.
    fn draw_tile(&mut self, tile: &Tile, position: Vec2);
}

impl Surface for Pixmap {
    fn draw_tile(&mut self, tile: &Tile, position: Vec2) {
        self.draw_pixmap(
            position.x.round() as i32,
            position.y.round() as i32,
            tile.pixmap().as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}
