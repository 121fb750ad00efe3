use crate::primitives::position::{line_at, offset_to_row_column, str_width, PositionMapper};

/// The viewport - what portion of the buffer is visible, in grid units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    /// Line number of the first visible line
    pub top_line: usize,

    /// Horizontal scroll position in display cells
    pub left_column: usize,

    /// Visible size in cells
    pub width: u16,
    pub height: u16,

    /// Lines to keep visible above/below the caret
    pub scroll_offset: usize,

    /// Columns to keep visible left/right of the caret
    pub horizontal_scroll_offset: usize,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            top_line: 0,
            left_column: 0,
            width,
            height,
            scroll_offset: 3,
            horizontal_scroll_offset: 5,
        }
    }

    pub fn set_scroll_offset(&mut self, offset: usize) {
        self.scroll_offset = offset;
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn visible_line_count(&self) -> usize {
        self.height as usize
    }

    /// Get the bottom line (exclusive)
    pub fn bottom_line(&self) -> usize {
        self.top_line + self.visible_line_count()
    }

    pub fn visible_range(&self) -> std::ops::Range<usize> {
        self.top_line..self.bottom_line()
    }

    pub fn is_line_visible(&self, line: usize) -> bool {
        line >= self.top_line && line < self.bottom_line()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.top_line = self.top_line.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize, total_lines: usize) {
        self.top_line = (self.top_line + lines).min(total_lines.saturating_sub(1));
    }

    /// Scroll so the caret at `cursor` is visible with the scroll margins
    pub fn ensure_visible(&mut self, text: &str, cursor: usize) {
        let (row, column) = offset_to_row_column(text, cursor);
        let total_lines = text.split('\n').count();
        self.ensure_line_visible(row, total_lines);

        let line = line_at(text, row).unwrap_or("");
        let prefix: String = line.chars().take(column).collect();
        self.ensure_column_visible(str_width(&prefix));
    }

    /// Ensure a line is visible with scroll offset applied
    pub fn ensure_line_visible(&mut self, line: usize, total_lines: usize) {
        let visible_count = self.visible_line_count();

        // If viewport is too small for scroll offset, use what we can
        let effective_offset = self.scroll_offset.min(visible_count / 2);

        let ideal_top = self.top_line + effective_offset;
        let ideal_bottom = self.top_line + visible_count.saturating_sub(effective_offset);

        if line < ideal_top {
            self.top_line = line.saturating_sub(effective_offset);
        } else if line >= ideal_bottom {
            self.top_line = (line + effective_offset + 1)
                .saturating_sub(visible_count)
                .min(total_lines.saturating_sub(1));
        }

        // Don't leave blank rows below the last line when everything fits
        if self.top_line + visible_count > total_lines {
            self.top_line = total_lines.saturating_sub(visible_count);
        }
    }

    /// Ensure a display column is visible with horizontal scroll offset applied
    pub fn ensure_column_visible(&mut self, column: usize) {
        let visible_width = self.width as usize;
        if visible_width == 0 {
            return;
        }

        let effective_offset = self.horizontal_scroll_offset.min(visible_width / 2);

        let ideal_left = self.left_column + effective_offset;
        let ideal_right = self.left_column + visible_width.saturating_sub(effective_offset);

        if column < ideal_left {
            self.left_column = column.saturating_sub(effective_offset);
        } else if column >= ideal_right {
            self.left_column = (column + effective_offset + 1).saturating_sub(visible_width);
        }
    }

    /// Convert a buffer line number to a screen row (if visible)
    pub fn line_to_screen_row(&self, line: usize) -> Option<u16> {
        if self.is_line_visible(line) {
            Some((line - self.top_line) as u16)
        } else {
            None
        }
    }

    /// Scroll position in surface coordinates
    pub fn scroll_pixels(&self, mapper: &PositionMapper) -> (f64, f64) {
        (
            self.left_column as f64 * mapper.glyph_width(),
            self.top_line as f64 * mapper.line_height(),
        )
    }

    /// Caret cell (x, y) relative to the viewport; `None` when scrolled out
    pub fn cursor_screen_position(&self, text: &str, cursor: usize) -> Option<(u16, u16)> {
        let (row, column) = offset_to_row_column(text, cursor);
        let screen_row = self.line_to_screen_row(row)?;
        let line = line_at(text, row).unwrap_or("");
        let prefix: String = line.chars().take(column).collect();
        let x = str_width(&prefix).checked_sub(self.left_column)?;
        if x >= self.width as usize {
            return None;
        }
        Some((x as u16, screen_row))
    }
}
