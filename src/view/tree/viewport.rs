use crate::config::ViewportConfig;
use std::ops::Range;

/// Row window over a projection
///
/// Answers "which rows should be materialized" for a renderer. Heights are in
/// the renderer's units (pixels, terminal lines); scrolling is in rows. Rows
/// share `row_height` unless a per-row height function is passed to the
/// `*_with` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    row_height: u32,
    height: u32,
    /// Extra rows realized on each side of the visible range
    overscan: usize,
    /// Index of the first visible row
    scroll_offset: usize,
}

impl Viewport {
    pub fn new(row_height: u32, height: u32, overscan: usize) -> Self {
        Self {
            row_height: row_height.max(1),
            height,
            overscan,
            scroll_offset: 0,
        }
    }

    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new(config.row_height, config.height, config.overscan as usize)
    }

    /// Number of rows that fit (at least one)
    pub fn rows_per_page(&self) -> usize {
        ((self.height / self.row_height) as usize).max(1)
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn set_scroll_offset(&mut self, offset: usize, row_count: usize) {
        self.scroll_offset = offset.min(self.max_scroll(row_count));
    }

    /// Set the viewport height (e.g. after a resize)
    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    fn max_scroll(&self, row_count: usize) -> usize {
        row_count.saturating_sub(self.rows_per_page())
    }

    /// Scroll by a signed number of rows, clamped to the content
    pub fn scroll_by(&mut self, delta: isize, row_count: usize) {
        let target = if delta < 0 {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_offset.saturating_add(delta as usize)
        };
        self.set_scroll_offset(target, row_count);
    }

    /// Pull the scroll offset back after the row count shrank
    /// (e.g. a collapse while scrolled to the bottom)
    pub fn clamp(&mut self, row_count: usize) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll(row_count));
    }

    /// Rows fully inside the viewport
    pub fn visible_range(&self, row_count: usize) -> Range<usize> {
        let start = self.scroll_offset.min(row_count);
        let end = (start + self.rows_per_page()).min(row_count);
        start..end
    }

    /// Rows to materialize: the visible range plus overscan
    pub fn render_range(&self, row_count: usize) -> Range<usize> {
        let visible = self.visible_range(row_count);
        let start = visible.start.saturating_sub(self.overscan);
        let end = (visible.end + self.overscan).min(row_count);
        start..end
    }

    /// Scroll the minimum amount so that `index` is visible
    pub fn ensure_visible(&mut self, index: usize) {
        let page = self.rows_per_page();
        if index < self.scroll_offset {
            self.scroll_offset = index;
        } else if index >= self.scroll_offset + page {
            self.scroll_offset = index + 1 - page;
        }
    }

    /// Total content height for `row_count` rows
    pub fn content_height(&self, row_count: usize) -> u64 {
        row_count as u64 * u64::from(self.row_height)
    }

    /// Offset of a row from the top of the content
    pub fn row_offset(&self, index: usize) -> u64 {
        index as u64 * u64::from(self.row_height)
    }

    /// Rows inside the viewport when each row reports its own height
    ///
    /// A partially visible last row is included, and the range holds at
    /// least one row when any remain.
    pub fn visible_range_with<F>(&self, row_count: usize, height_of: F) -> Range<usize>
    where
        F: Fn(usize) -> u32,
    {
        let start = self.scroll_offset.min(row_count);
        let mut end = start;
        let mut used = 0u64;
        while end < row_count && used < u64::from(self.height) {
            used += u64::from(height_of(end));
            end += 1;
        }
        if end == start && start < row_count {
            end += 1;
        }
        start..end
    }

    /// Scroll the minimum amount so that `index` is visible, for varying heights
    pub fn ensure_visible_with<F>(&mut self, index: usize, height_of: F)
    where
        F: Fn(usize) -> u32,
    {
        if index < self.scroll_offset {
            self.scroll_offset = index;
            return;
        }
        while self.scroll_offset < index
            && self.visible_range_with(index + 1, &height_of).end <= index
        {
            self.scroll_offset += 1;
        }
    }

    /// Total content height when each row reports its own height
    pub fn content_height_with<F>(&self, row_count: usize, height_of: F) -> u64
    where
        F: Fn(usize) -> u32,
    {
        (0..row_count).map(|i| u64::from(height_of(i))).sum()
    }

    /// Offset of a row from the top of the content, for varying heights
    pub fn row_offset_with<F>(&self, index: usize, height_of: F) -> u64
    where
        F: Fn(usize) -> u32,
    {
        self.content_height_with(index, height_of)
    }
}
