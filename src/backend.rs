//! The seam to the external shaping engine.
//!
//! Shaping, bidi resolution, glyph-id lookup and line breaking are all
//! owned by a [`ShapingBackend`]. This crate only asks it questions and
//! composes the answers into cached tiles.

use glam::Vec2;

use crate::{
    font::Font,
    text::{Align, WritingDirection},
};

/// Identifier of a glyph, as assigned by the shaping backend.
pub type GlyphId = u32;

/// Metrics of a font at its nominal size, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct FontMetrics {
    pub size: f32,
    /// The size of the em square in font units.
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    /// Distance between consecutive baselines. Used as the line height.
    pub leading: f32,
}

/// Answer to a line-break query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LineBreak {
    /// More text remains. Holds the character index starting the next line.
    Next(usize),
    /// The end of the text was reached after `lines` lines.
    End { lines: u32 },
}

impl LineBreak {
    /// Decodes the raw integer protocol spoken by C-style shaping engines.
    ///
    /// A non-negative value is the start index of the next line. A negative
    /// value `v` means the text ended after `-v - 1` lines, so `-1` encodes
    /// "ended with no additional lines".
    pub fn from_raw(raw: i32) -> Self {
        if raw >= 0 {
            LineBreak::Next(raw as usize)
        } else {
            LineBreak::End {
                lines: (-(raw as i64) - 1) as u32,
            }
        }
    }

    /// Encodes into the raw integer protocol. See [`LineBreak::from_raw`].
    ///
    /// Indices and line counts beyond the range of `i32` saturate.
    pub fn to_raw(self) -> i32 {
        match self {
            LineBreak::Next(index) => i32::try_from(index).unwrap_or(i32::MAX),
            LineBreak::End { lines } => i32::try_from(lines).map_or(i32::MIN, |lines| -lines - 1),
        }
    }
}

/// A rasterized glyph: an 8-bit coverage mask plus its placement relative
/// to the pen position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphImage {
    /// Horizontal offset from the pen position to the left edge.
    pub left: i32,
    /// Vertical offset from the baseline up to the top edge.
    pub top: i32,
    pub width: u32,
    pub height: u32,
    /// Row-major coverage values, `width * height` bytes.
    pub coverage: Vec<u8>,
}

impl GlyphImage {
    /// Whether the image has any pixels to draw.
    pub fn has_ink(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.coverage.len() >= (self.width * self.height) as usize
    }
}

/// Inputs the backend needs to break or place a run of text.
pub struct ShapeRequest<'a, F> {
    pub text: &'a str,
    pub font: &'a Font<F>,
    pub frame_width: f32,
    pub align: Align,
    pub direction: WritingDirection,
}

/// An external text-shaping engine.
///
/// Implementations must be thread-safe, since glyph warm-up may rasterize
/// on a worker thread while the owning thread paginates.
pub trait ShapingBackend: Send + Sync + 'static {
    /// A loaded font face. Cloning must be cheap and share the underlying
    /// shaping resource (e.g. an `Arc`).
    type Face: Clone + Send + Sync + 'static;

    /// Queries the metrics of `font` at its nominal size.
    fn metrics(&self, font: &Font<Self::Face>) -> FontMetrics;

    /// Finds the character index starting the line `line_count` lines after
    /// the line starting at `start_index`.
    fn measure_next_line_index(
        &self,
        request: &ShapeRequest<Self::Face>,
        start_index: usize,
        line_count: u32,
    ) -> anyhow::Result<LineBreak>;

    /// Lays out `line_count` lines starting at `start_index`, with the first
    /// baseline at `origin`. Every placed glyph is reported through `sink`
    /// together with its pen position.
    fn render_run(
        &self,
        request: &ShapeRequest<Self::Face>,
        origin: Vec2,
        start_index: usize,
        line_count: u32,
        sink: &mut dyn FnMut(GlyphId, Vec2),
    ) -> anyhow::Result<LineBreak>;

    /// Rasterizes a single glyph. Returns `None` for glyphs without ink,
    /// like spaces.
    fn rasterize_glyph(
        &self,
        font: &Font<Self::Face>,
        glyph: GlyphId,
    ) -> anyhow::Result<Option<GlyphImage>>;
}
