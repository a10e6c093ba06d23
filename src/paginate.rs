//! Splits shaped text into pages bounded by a pixel budget.
//!
//! A page is a run of whole lines whose tile, one frame wide, holds at most
//! `max_pixels_per_page` pixels. Page boundaries come from the backend's
//! line-break queries, so they always fall at line starts.

use glam::{uvec2, UVec2};

use crate::backend::{LineBreak, ShapeRequest, ShapingBackend};

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error(
        "a page of {page_pixel_budget}px ({max_pixels_per_page} pixels over a {frame_width}px wide frame) \
         cannot hold a single line of height {line_height}; shrink the frame or raise the pixel budget"
    )]
    InvalidPageBudget {
        max_pixels_per_page: u32,
        frame_width: u32,
        page_pixel_budget: u32,
        line_height: f32,
    },
    #[error("shaping backend made no progress past character {start}")]
    NoProgress { start: usize },
    #[error("shaping backend returned line start {index}, past the end of the text ({len} characters)")]
    OutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Boundaries of one page.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageBounds {
    /// Index of the first character on the page.
    pub start: usize,
    pub line_count: u32,
    /// Tile dimensions in pixels.
    pub size: UVec2,
}

/// Layout parameters derived during a full pagination.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct PaginationState {
    pub frame_width: u32,
    pub line_height: f32,
    /// Height of a full page's tile.
    pub page_pixel_budget: u32,
    pub lines_per_page: u32,
    pub total_lines: u32,
    pub measured_height: u32,
}

impl PaginationState {
    /// Vertical distance between the tops of consecutive pages.
    pub fn page_stride(&self) -> f32 {
        self.line_height * self.lines_per_page as f32
    }
}

/// The result of paginating a text run.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Pagination {
    pub state: PaginationState,
    pub pages: Vec<PageBounds>,
}

impl Pagination {
    /// Nothing to show.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Derives the layout parameters shared by every page.
pub fn page_layout(
    max_pixels_per_page: u32,
    frame_width: u32,
    line_height: f32,
) -> Result<PaginationState, PaginationError> {
    let page_pixel_budget = max_pixels_per_page / frame_width.max(1);
    let lines_per_page = if line_height > 0. && line_height.is_finite() {
        ((page_pixel_budget as f32 - line_height) / line_height).floor()
    } else {
        0.
    };

    if lines_per_page < 1. {
        return Err(PaginationError::InvalidPageBudget {
            max_pixels_per_page,
            frame_width,
            page_pixel_budget,
            line_height,
        });
    }

    Ok(PaginationState {
        frame_width,
        line_height,
        page_pixel_budget,
        lines_per_page: lines_per_page as u32,
        total_lines: 0,
        measured_height: 0,
    })
}

/// Walks the text one page at a time.
///
/// Each call to `next` issues one line-break query, so a caller may stop
/// between pages. Once an error is yielded the iterator is exhausted.
pub struct Paginator<'a, B: ShapingBackend> {
    backend: &'a B,
    request: &'a ShapeRequest<'a, B::Face>,
    state: PaginationState,
    len: usize,
    next_start: Option<usize>,
}

impl<'a, B: ShapingBackend> Paginator<'a, B> {
    pub fn new(
        backend: &'a B,
        request: &'a ShapeRequest<'a, B::Face>,
        state: PaginationState,
    ) -> Self {
        let len = request.text.chars().count();
        Self {
            backend,
            request,
            state,
            len,
            next_start: if len == 0 { None } else { Some(0) },
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    fn emit(&mut self, start: usize) -> Result<PageBounds, PaginationError> {
        let lines_per_page = self.state.lines_per_page;
        let width = self.state.frame_width;
        let line_break = self
            .backend
            .measure_next_line_index(self.request, start, lines_per_page)?;

        let (line_count, height) = match line_break {
            LineBreak::Next(index) => {
                if index <= start {
                    return Err(PaginationError::NoProgress { start });
                }
                if index > self.len {
                    return Err(PaginationError::OutOfRange {
                        index,
                        len: self.len,
                    });
                }
                // A break exactly at the end leaves no characters for another page.
                self.next_start = if index < self.len { Some(index) } else { None };
                (lines_per_page, self.state.page_pixel_budget)
            }
            LineBreak::End { lines: 0 } => {
                // Characters remain at `start`, so the run cannot end here.
                return Err(PaginationError::NoProgress { start });
            }
            LineBreak::End { lines } => {
                // Half a line of padding above and below the text.
                let height = (self.state.line_height * (lines + 1) as f32).ceil() as u32;
                (lines, height)
            }
        };

        self.state.total_lines += line_count;
        Ok(PageBounds {
            start,
            line_count,
            size: uvec2(width, height.max(1)),
        })
    }
}

impl<'a, B: ShapingBackend> Iterator for Paginator<'a, B> {
    type Item = Result<PageBounds, PaginationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start.take()?;
        Some(self.emit(start))
    }
}

/// Paginates a text run for a frame of `request.frame_width` pixels.
///
/// Empty text or a frame narrower than one pixel has nothing to show and
/// yields an empty pagination.
pub fn paginate<B: ShapingBackend>(
    backend: &B,
    request: &ShapeRequest<B::Face>,
    max_pixels_per_page: u32,
) -> Result<Pagination, PaginationError> {
    let frame_width = request.frame_width.floor();
    if request.text.is_empty() || !(frame_width >= 1.) {
        return Ok(Pagination::empty());
    }

    let line_height = backend.metrics(request.font).leading;
    let state = page_layout(max_pixels_per_page, frame_width as u32, line_height)?;

    let mut paginator = Paginator::new(backend, request, state);
    let pages = paginator.by_ref().collect::<Result<Vec<_>, _>>()?;

    let mut state = *paginator.state();
    state.measured_height = (state.total_lines as f32 * state.line_height).round() as u32;

    log::debug!(
        "Paginated {} lines into {} pages of up to {} lines",
        state.total_lines,
        pages.len(),
        state.lines_per_page
    );

    Ok(Pagination { state, pages })
}
