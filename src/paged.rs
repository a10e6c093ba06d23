//! The surface-facing engine: one text run, its pages, and the logic
//! deciding how much of them to rebuild.

use crate::{
    backend::{LineBreak, ShapeRequest, ShapingBackend},
    invalidate::{Change, Invalidation, InvalidationController},
    page::{Composer, PageCache},
    paginate::{paginate, PaginationState},
    text::{Align, TextRun, WritingDirection},
    tile::Surface,
    viewport, Context, FontId, RenderError,
};
use palette::Srgba;

/// Capabilities of the widget hosting a [`PagedText`].
pub trait Host {
    /// The visible content changed; schedule a draw.
    fn request_redraw(&mut self) {}

    /// The content height may have changed; schedule a measure pass.
    fn request_relayout(&mut self) {}
}

/// Paginated, tile-cached text for one rendering surface.
///
/// Setters only record what changed. The work happens lazily on the next
/// [`measured_height`](PagedText::measured_height) or
/// [`draw`](PagedText::draw): a full repagination when line breaks may
/// have moved, an in-place re-render when only styling changed, and
/// nothing at all otherwise.
pub struct PagedText<B: ShapingBackend> {
    cx: Context<B>,
    run: TextRun,
    frame_width: i32,
    invalidation: InvalidationController,
    pages: PageCache,
    host: Option<Box<dyn Host>>,
}

impl<B: ShapingBackend> PagedText<B> {
    pub(crate) fn new(cx: Context<B>) -> Self {
        Self {
            cx,
            run: TextRun::new(),
            frame_width: 0,
            invalidation: InvalidationController::new(),
            pages: PageCache::new(),
            host: None,
        }
    }

    pub fn set_host(&mut self, host: impl Host + 'static) {
        self.host = Some(Box::new(host));
    }

    pub fn run(&self) -> &TextRun {
        &self.run
    }

    pub fn pages(&self) -> &PageCache {
        &self.pages
    }

    pub fn pagination_state(&self) -> &PaginationState {
        self.pages.state()
    }

    pub fn invalidation(&self) -> Invalidation {
        self.invalidation.state()
    }

    pub fn frame_width(&self) -> i32 {
        self.frame_width
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let change = self.run.set_text(text);
        self.notify(change);
    }

    pub fn set_font(&mut self, font: FontId) {
        let change = self.run.set_font(Some(font));
        self.notify(change);
    }

    pub fn set_color(&mut self, color: Srgba<u8>) {
        let change = self.run.set_color(color);
        self.notify(change);
    }

    pub fn set_alignment(&mut self, align: Align) {
        let change = self.run.set_align(align);
        self.notify(change);
    }

    pub fn set_writing_direction(&mut self, direction: WritingDirection) {
        let change = self.run.set_direction(direction);
        self.notify(change);
    }

    /// Sets the width text is broken against, in pixels.
    pub fn set_frame_width(&mut self, frame_width: i32) {
        let change = self.update_frame_width(frame_width);
        self.notify(change);
    }

    /// Computes the height of the whole text when broken at `frame_width`,
    /// repaginating if needed.
    ///
    /// Empty text measures 0. Non-empty text measures at least the
    /// configured minimum height.
    pub fn measured_height(&mut self, frame_width: i32) -> Result<u32, RenderError> {
        if let Some(change) = self.update_frame_width(frame_width) {
            self.invalidation.record(change);
        }
        self.refresh()?;

        if self.pages.is_empty() {
            return Ok(0);
        }
        Ok(self
            .pages
            .state()
            .measured_height
            .max(self.cx.settings().min_height))
    }

    /// Brings the pages up to date, then draws the ones intersecting the
    /// vertical range `[viewport_top, viewport_bottom]`.
    ///
    /// Returns the number of pages drawn.
    pub fn draw(
        &mut self,
        surface: &mut impl Surface,
        viewport_top: f32,
        viewport_bottom: f32,
    ) -> Result<usize, RenderError> {
        self.refresh()?;
        Ok(viewport::draw_visible(
            &self.pages,
            surface,
            viewport_top,
            viewport_bottom,
            self.cx.settings().padding,
        ))
    }

    /// Releases all tiles and the font's cached glyphs, e.g. when the
    /// surface goes off screen. The next request repaginates.
    pub fn detach(&mut self) {
        self.pages.clear();
        if let Some(font) = self.run.font() {
            if let Err(e) = self.cx.clear_glyph_cache(font) {
                log::debug!("No glyphs to drop on detach: {}", e);
            }
        }
        self.invalidation.escalate(Invalidation::NeedsRepaginate);
    }

    /// Finds the character index starting line `line`, counted from the top
    /// of the text. Returns `None` past the last line.
    pub fn line_start(&mut self, line: u32) -> Result<Option<usize>, RenderError> {
        self.refresh()?;
        let state = *self.pages.state();
        if line >= state.total_lines {
            return Ok(None);
        }

        let page = &self.pages.pages()[(line / state.lines_per_page) as usize];
        let offset = line % state.lines_per_page;
        if offset == 0 {
            return Ok(Some(page.start()));
        }

        let fonts = self.cx.fonts();
        let font = match self.run.font().map(|id| fonts.get(id)) {
            Some(Ok(font)) => font,
            _ => return Ok(None),
        };
        let request = ShapeRequest {
            text: self.run.text(),
            font,
            frame_width: state.frame_width as f32,
            align: self.run.align(),
            direction: self.run.direction(),
        };
        match self
            .cx
            .backend()
            .measure_next_line_index(&request, page.start(), offset)?
        {
            LineBreak::Next(index) => Ok(Some(index)),
            LineBreak::End { .. } => Ok(None),
        }
    }

    /// Finds the starts of the lines intersecting the vertical range
    /// `[viewport_top, viewport_bottom]`.
    pub fn visible_line_starts(
        &mut self,
        viewport_top: f32,
        viewport_bottom: f32,
    ) -> Result<Vec<usize>, RenderError> {
        self.refresh()?;
        let state = *self.pages.state();
        let lines = match viewport::visible_pages(
            viewport_top,
            viewport_bottom,
            state.line_height,
            state.total_lines as usize,
        ) {
            Some(lines) => lines,
            None => return Ok(Vec::new()),
        };

        let mut starts = Vec::with_capacity(lines.end() - lines.start() + 1);
        for line in lines {
            if let Some(start) = self.line_start(line as u32)? {
                starts.push(start);
            }
        }
        Ok(starts)
    }

    /// Does whatever work the pending invalidation requires.
    pub fn refresh(&mut self) -> Result<(), RenderError> {
        match self.invalidation.state() {
            Invalidation::Clean => Ok(()),
            Invalidation::NeedsRerender if !self.pages.is_empty() => self.rerender(),
            _ => self.repaginate(),
        }
    }

    fn update_frame_width(&mut self, frame_width: i32) -> Option<Change> {
        if frame_width == self.frame_width {
            return None;
        }
        self.frame_width = frame_width;
        Some(Change::FrameWidth)
    }

    fn notify(&mut self, change: Option<Change>) {
        let change = match change {
            Some(change) => change,
            None => return,
        };
        self.invalidation.record(change);

        if let Some(host) = &mut self.host {
            if change.required() == Invalidation::NeedsRepaginate {
                host.request_relayout();
            }
            host.request_redraw();
        }
    }

    fn repaginate(&mut self) -> Result<(), RenderError> {
        let min_width = self.cx.settings().min_width;
        if self.frame_width < 0 || (self.frame_width as u32) < min_width {
            self.pages.clear();
            self.invalidation.mark_clean();
            return Ok(());
        }

        let fonts = self.cx.fonts();
        let font = match self.run.font().map(|id| fonts.get(id)) {
            Some(Ok(font)) => font,
            Some(Err(e)) => {
                log::warn!("{}; nothing to show", e);
                self.pages.clear();
                self.invalidation.mark_clean();
                return Ok(());
            }
            None => {
                self.pages.clear();
                self.invalidation.mark_clean();
                return Ok(());
            }
        };

        let request = ShapeRequest {
            text: self.run.text(),
            font,
            frame_width: self.frame_width as f32,
            align: self.run.align(),
            direction: self.run.direction(),
        };
        let backend = self.cx.backend();
        let pagination = match paginate(backend, &request, self.cx.settings().max_pixels_per_page) {
            Ok(pagination) => pagination,
            Err(e) => {
                self.pages.clear();
                return Err(e.into());
            }
        };

        let composer = Composer {
            backend,
            request: &request,
            color: self.run.color(),
            line_height: pagination.state.line_height,
        };
        self.pages
            .regenerate(pagination, &composer, self.cx.tile_allocator())?;
        self.invalidation.mark_clean();
        Ok(())
    }

    fn rerender(&mut self) -> Result<(), RenderError> {
        let fonts = self.cx.fonts();
        let font = match self.run.font().map(|id| fonts.get(id)) {
            Some(Ok(font)) => font,
            _ => {
                log::warn!("Font of the text run is gone; nothing to show");
                self.pages.clear();
                self.invalidation.mark_clean();
                return Ok(());
            }
        };

        let state = *self.pages.state();
        let request = ShapeRequest {
            text: self.run.text(),
            font,
            frame_width: state.frame_width as f32,
            align: self.run.align(),
            direction: self.run.direction(),
        };
        let composer = Composer {
            backend: self.cx.backend(),
            request: &request,
            color: self.run.color(),
            line_height: state.line_height,
        };
        self.pages
            .update_in_place(&composer, self.cx.tile_allocator())?;
        self.invalidation.mark_clean();
        Ok(())
    }
}
