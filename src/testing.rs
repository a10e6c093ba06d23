//! A fixed-pitch shaping backend for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use glam::{vec2, Vec2};
use parking_lot::Mutex;

use crate::{
    backend::{FontMetrics, GlyphId, GlyphImage, LineBreak, ShapeRequest, ShapingBackend},
    text::Align,
    Font,
};

pub const ADVANCE: f32 = 4.;

/// Glyph id the mock refuses to rasterize.
pub const BROKEN_GLYPH: GlyphId = '!' as GlyphId;

#[derive(Clone, Debug, PartialEq)]
pub struct MockFace;

/// Breaks every `chars_per_line` characters and draws every glyph as a
/// 3x3 square, except spaces which have no ink.
pub struct MockBackend {
    chars_per_line: usize,
    line_height: f32,
    exact_end_breaks: bool,

    measure_calls: AtomicUsize,
    render_calls: AtomicUsize,
    rasterize_calls: AtomicUsize,

    fail_measure_at: Mutex<Option<usize>>,
    fail_render_at: Mutex<Option<usize>>,
    end_without_lines_at: Mutex<Option<usize>>,
}

impl MockBackend {
    pub fn new(chars_per_line: usize, line_height: f32) -> Self {
        Self {
            chars_per_line,
            line_height,
            exact_end_breaks: false,
            measure_calls: AtomicUsize::new(0),
            render_calls: AtomicUsize::new(0),
            rasterize_calls: AtomicUsize::new(0),
            fail_measure_at: Mutex::new(None),
            fail_render_at: Mutex::new(None),
            end_without_lines_at: Mutex::new(None),
        }
    }

    /// Answer `Next(len)` instead of `End` when a query lands exactly on the
    /// end of the text.
    pub fn with_exact_end_breaks(mut self) -> Self {
        self.exact_end_breaks = true;
        self
    }

    pub fn font(&self) -> Font<MockFace> {
        Font::new(MockFace, 16., 64)
    }

    pub fn fail_measure_at(&self, start: usize) {
        *self.fail_measure_at.lock() = Some(start);
    }

    pub fn fail_render_at(&self, start: Option<usize>) {
        *self.fail_render_at.lock() = start;
    }

    /// Answer `End { lines: 0 }` to a query at `start`, as if the text ended there.
    pub fn end_without_lines_at(&self, start: usize) {
        *self.end_without_lines_at.lock() = Some(start);
    }

    pub fn measure_calls(&self) -> usize {
        self.measure_calls.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn rasterize_calls(&self) -> usize {
        self.rasterize_calls.load(Ordering::SeqCst)
    }

    fn line_break(&self, len: usize, start: usize, line_count: u32) -> LineBreak {
        let target = start + line_count as usize * self.chars_per_line;
        if target < len || (self.exact_end_breaks && target == len) {
            LineBreak::Next(target)
        } else {
            let remaining = len - start;
            LineBreak::End {
                lines: ((remaining + self.chars_per_line - 1) / self.chars_per_line) as u32,
            }
        }
    }
}

impl ShapingBackend for MockBackend {
    type Face = MockFace;

    fn metrics(&self, font: &Font<MockFace>) -> FontMetrics {
        FontMetrics {
            size: font.size(),
            units_per_em: 1000.,
            ascender: self.line_height * 0.8,
            descender: -self.line_height * 0.2,
            leading: self.line_height,
        }
    }

    fn measure_next_line_index(
        &self,
        request: &ShapeRequest<MockFace>,
        start_index: usize,
        line_count: u32,
    ) -> anyhow::Result<LineBreak> {
        self.measure_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_measure_at.lock() == Some(start_index) {
            bail!("mock measure fault at {}", start_index);
        }
        if *self.end_without_lines_at.lock() == Some(start_index) {
            return Ok(LineBreak::End { lines: 0 });
        }
        let len = request.text.chars().count();
        Ok(self.line_break(len, start_index, line_count))
    }

    fn render_run(
        &self,
        request: &ShapeRequest<MockFace>,
        origin: Vec2,
        start_index: usize,
        line_count: u32,
        sink: &mut dyn FnMut(GlyphId, Vec2),
    ) -> anyhow::Result<LineBreak> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_render_at.lock() == Some(start_index) {
            bail!("mock render fault at {}", start_index);
        }

        let chars: Vec<char> = request.text.chars().collect();
        for line in 0..line_count as usize {
            let line_start = start_index + line * self.chars_per_line;
            if line_start >= chars.len() {
                break;
            }
            let line_end = (line_start + self.chars_per_line).min(chars.len());
            let line_width = (line_end - line_start) as f32 * ADVANCE;
            let x = match request.align {
                Align::Left => 0.,
                Align::Center => (request.frame_width - line_width) / 2.,
                Align::Right => request.frame_width - line_width,
            };
            let y = origin.y + line as f32 * self.line_height;

            for (column, c) in chars[line_start..line_end].iter().enumerate() {
                sink(
                    *c as GlyphId,
                    vec2(origin.x + x + column as f32 * ADVANCE, y),
                );
            }
        }

        Ok(self.line_break(chars.len(), start_index, line_count))
    }

    fn rasterize_glyph(
        &self,
        _font: &Font<MockFace>,
        glyph: GlyphId,
    ) -> anyhow::Result<Option<GlyphImage>> {
        self.rasterize_calls.fetch_add(1, Ordering::SeqCst);
        if glyph == BROKEN_GLYPH {
            bail!("mock cannot rasterize glyph {}", glyph);
        }
        if glyph == ' ' as GlyphId {
            return Ok(None);
        }
        Ok(Some(GlyphImage {
            left: 0,
            top: 3,
            width: 3,
            height: 3,
            coverage: vec![255; 9],
        }))
    }
}
