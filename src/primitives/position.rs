//! Position mapping between character offsets, (row, column) pairs and pixels
//!
//! Offsets and columns count Unicode scalar values, rows are separated by
//! `'\n'`. Every conversion clamps out-of-range input (negative or NaN
//! coordinates, offsets past the end, rows past the last line) instead of
//! failing.
//!
//! Pixel conversion for a whole grid uses a fixed line height and glyph
//! width. Column → x conversion inside a line goes through a [`TextMeasure`]
//! so a host with a precise text-measurement primitive can substitute it for
//! the monospace approximation.

use std::sync::Arc;

use unicode_width::UnicodeWidthChar;

/// Number of cells a tab advances
pub const TAB_WIDTH: usize = 4;

/// Display width of a single character on a monospace grid.
///
/// Tabs count as [`TAB_WIDTH`]; other control characters are zero-width.
#[inline]
pub fn char_width(c: char) -> usize {
    if c == '\t' {
        TAB_WIDTH
    } else {
        c.width().unwrap_or(0)
    }
}

/// Display width of a line fragment on a monospace grid.
#[inline]
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Number of characters in `text` (the largest valid offset).
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the character at `offset`, clamped to `text.len()`.
pub fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(index, _)| index)
}

/// Character offset of the byte index `byte`, clamped to the text length.
pub fn byte_to_char(text: &str, byte: usize) -> usize {
    let byte = byte.min(text.len());
    text.char_indices().take_while(|(index, _)| *index < byte).count()
}

/// Text of line `row` (without its terminator), if the line exists.
pub fn line_at(text: &str, row: usize) -> Option<&str> {
    text.split('\n').nth(row)
}

/// Row is the number of line breaks before `offset`, column the number of
/// characters since the last one.
pub fn offset_to_row_column(text: &str, offset: usize) -> (usize, usize) {
    let mut row = 0;
    let mut column = 0;
    for c in text.chars().take(offset) {
        if c == '\n' {
            row += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (row, column)
}

/// Inverse of [`offset_to_row_column`].
///
/// A row past the last line clamps to the last line, a column past the end of
/// its line clamps to the end of that line.
pub fn row_column_to_offset(text: &str, row: usize, column: usize) -> usize {
    let mut line_start = 0;
    let mut lines = text.split('\n').enumerate().peekable();
    while let Some((index, line)) = lines.next() {
        let len = char_len(line);
        if index == row || lines.peek().is_none() {
            return line_start + column.min(len);
        }
        line_start += len + 1;
    }
    line_start
}

/// Grid cell containing a pixel coordinate.
pub fn pixel_to_row_column(x: f64, y: f64, line_height: f64, glyph_width: f64) -> (usize, usize) {
    (cell_index(y, line_height), cell_index(x, glyph_width))
}

/// Top-left pixel of a grid cell.
pub fn row_column_to_pixel(row: usize, column: usize, line_height: f64, glyph_width: f64) -> (f64, f64) {
    (column as f64 * glyph_width.max(0.0), row as f64 * line_height.max(0.0))
}

fn cell_index(position: f64, size: f64) -> usize {
    if size.is_nan() || size <= 0.0 {
        return 0;
    }
    // float -> int casts saturate: negatives and NaN land on 0
    (position / size).floor() as usize
}

/// Measures the rendered width of single-line text.
pub trait TextMeasure: Send + Sync {
    fn measure(&self, text: &str) -> f64;
}

/// Fixed width per display cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasure {
    pub glyph_width: f64,
}

impl TextMeasure for MonospaceMeasure {
    fn measure(&self, text: &str) -> f64 {
        str_width(text) as f64 * self.glyph_width
    }
}

/// Converts between buffer positions and surface coordinates.
#[derive(Clone)]
pub struct PositionMapper {
    line_height: f64,
    glyph_width: f64,
    measure: Arc<dyn TextMeasure>,
}

impl std::fmt::Debug for PositionMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionMapper")
            .field("line_height", &self.line_height)
            .field("glyph_width", &self.glyph_width)
            .finish()
    }
}

impl PositionMapper {
    /// Mapper on a fixed-width grid.
    pub fn monospace(line_height: f64, glyph_width: f64) -> Self {
        Self {
            line_height,
            glyph_width,
            measure: Arc::new(MonospaceMeasure { glyph_width }),
        }
    }

    /// Mapper for a terminal: one row per line, one cell per glyph.
    pub fn cells() -> Self {
        Self::monospace(1.0, 1.0)
    }

    /// Mapper backed by a host text-measurement primitive. The glyph width
    /// used for grid conversions is the measured width of a space.
    pub fn with_measure(line_height: f64, measure: Arc<dyn TextMeasure>) -> Self {
        let glyph_width = measure.measure(" ");
        Self {
            line_height,
            glyph_width,
            measure,
        }
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    pub fn glyph_width(&self) -> f64 {
        self.glyph_width
    }

    /// Rendered width of `text`.
    pub fn measure(&self, text: &str) -> f64 {
        self.measure.measure(text)
    }

    /// X coordinate of the left edge of `column` within `line`.
    pub fn column_to_x(&self, line: &str, column: usize) -> f64 {
        let end = char_to_byte(line, column);
        self.measure.measure(&line[..end])
    }

    /// Column of the character under `x` within `line`: the largest column
    /// whose prefix width does not exceed `x`, clamped to the line length.
    ///
    /// Prefix widths grow with the prefix, so the column is found by binary
    /// search over prefixes.
    pub fn x_to_column(&self, line: &str, x: f64) -> usize {
        if x.is_nan() || x <= 0.0 {
            return 0;
        }
        let prefix_ends: Vec<usize> = line
            .char_indices()
            .map(|(index, c)| index + c.len_utf8())
            .collect();
        prefix_ends.partition_point(|&end| self.measure.measure(&line[..end]) <= x)
    }

    /// Top-left coordinate of the character at `offset`.
    pub fn offset_to_pixel(&self, text: &str, offset: usize) -> (f64, f64) {
        let (row, column) = offset_to_row_column(text, offset);
        let line = line_at(text, row).unwrap_or("");
        (self.column_to_x(line, column), row as f64 * self.line_height)
    }

    /// Offset of the character under a pointer, or `None` when the pointer is
    /// below the last line or past the end of its line's text.
    pub fn locate(&self, text: &str, x: f64, y: f64) -> Option<usize> {
        let row = cell_index(y, self.line_height);
        let line = line_at(text, row)?;
        if x >= self.measure.measure(line) {
            return None;
        }
        let column = self.x_to_column(line, x);
        Some(row_column_to_offset(text, row, column))
    }
}
