//! Drawing the pages that intersect the visible pixel range.

use std::ops::RangeInclusive;

use glam::vec2;

use crate::{page::PageCache, tile::Surface};

/// Finds the pages intersecting the vertical range `[top, bottom]`.
///
/// Pages are laid out every `page_pixel_height` pixels. The result is
/// clamped to `0..=page_count - 1`; `None` means there is nothing to draw.
pub fn visible_pages(
    viewport_top: f32,
    viewport_bottom: f32,
    page_pixel_height: f32,
    page_count: usize,
) -> Option<RangeInclusive<usize>> {
    if page_count == 0 || !(page_pixel_height > 0.) || !page_pixel_height.is_finite() {
        return None;
    }

    let last = page_count - 1;
    let page_at = |offset: f32| -> usize {
        let index = (offset / page_pixel_height).floor();
        if index.is_nan() || index < 0. {
            0
        } else if index >= last as f32 {
            last
        } else {
            index as usize
        }
    };

    let (top, bottom) = if viewport_top <= viewport_bottom {
        (viewport_top, viewport_bottom)
    } else {
        (viewport_bottom, viewport_top)
    };
    Some(page_at(top)..=page_at(bottom))
}

/// Blits the cached pages intersecting `[viewport_top, viewport_bottom]`.
///
/// Each tile carries a line of headroom above its first line, so tile `i`
/// is placed one line above the page's slot at `i * stride`. Returns the
/// number of tiles drawn.
pub fn draw_visible(
    cache: &PageCache,
    surface: &mut impl Surface,
    viewport_top: f32,
    viewport_bottom: f32,
    padding: f32,
) -> usize {
    let state = cache.state();
    let stride = state.page_stride();
    let range = match visible_pages(viewport_top, viewport_bottom, stride, cache.len()) {
        Some(range) => range,
        None => return 0,
    };

    let mut drawn = 0;
    for index in range {
        let page = &cache.pages()[index];
        let y = index as f32 * stride - state.line_height + padding;
        surface.draw_tile(page.tile(), vec2(padding, y));
        drawn += 1;
    }
    drawn
}
