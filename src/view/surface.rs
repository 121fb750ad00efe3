//! Surface rendering
//!
//! A [`SurfaceFrame`] is the composed output of an editing surface: the
//! styled token layer, the editable text layer with its caret, and the two
//! floating overlays. [`SurfaceWidget`] draws a frame into a ratatui buffer
//! where one cell is one grid unit.

use std::sync::Arc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use super::theme::Theme;
use super::viewport::Viewport;
use crate::input::hover::HoverState;
use crate::model::diagnostic::{Diagnostic, Severity};
use crate::model::token::TokenLine;
use crate::primitives::position::{char_width, line_at, offset_to_row_column, str_width};
use crate::services::analysis::CompletionSuggestion;

/// Most suggestions visible at once
pub const DROPDOWN_MAX_ROWS: usize = 8;
/// Widest hover tooltip, borders included
pub const HOVER_MAX_WIDTH: u16 = 72;
/// Most diagnostics listed below the text
pub const DIAGNOSTIC_MAX_ROWS: usize = 4;

/// Completion list overlay
#[derive(Debug, Clone, PartialEq)]
pub struct DropdownOverlay {
    pub suggestions: Vec<CompletionSuggestion>,
    pub highlighted: usize,
    /// Top-left relative to the visible area: just below the caret line
    pub anchor: (f64, f64),
}

/// Everything a surface shows, for one instant
#[derive(Debug, Clone)]
pub struct SurfaceFrame {
    /// Styled layer
    pub tokens: Vec<TokenLine>,
    /// Editable layer
    pub text: String,
    pub cursor: usize,
    pub focused: bool,
    pub viewport: Viewport,
    pub dropdown: Option<DropdownOverlay>,
    pub hover: Option<HoverState>,
    pub diagnostics: Vec<Diagnostic>,
    pub theme: Arc<Theme>,
}

impl SurfaceFrame {
    /// Terminal cell of the caret within the text area
    pub fn caret_screen_position(&self, area: Rect) -> Option<(u16, u16)> {
        if !self.focused {
            return None;
        }
        let (x, y) = self.viewport.cursor_screen_position(&self.text, self.cursor)?;
        if x >= area.width || y >= self.text_rows(area) {
            return None;
        }
        Some((area.x + x, area.y + y))
    }

    /// Rows used by the diagnostics list in `area`
    pub fn diagnostic_rows(&self, area: Rect) -> u16 {
        if self.diagnostics.is_empty() {
            return 0;
        }
        (self.diagnostics.len().min(DIAGNOSTIC_MAX_ROWS) as u16).min(area.height / 2)
    }

    /// Rows left for the text
    pub fn text_rows(&self, area: Rect) -> u16 {
        area.height - self.diagnostic_rows(area)
    }
}

pub struct SurfaceWidget<'a> {
    frame: &'a SurfaceFrame,
}

impl<'a> SurfaceWidget<'a> {
    pub fn new(frame: &'a SurfaceFrame) -> Self {
        Self { frame }
    }
}

impl Widget for SurfaceWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = self.frame;
        let theme = &frame.theme;
        buf.set_style(area, Style::default().fg(theme.foreground).bg(theme.background));

        let text_area = Rect {
            height: frame.text_rows(area),
            ..area
        };
        render_styled_layer(frame, text_area, buf);
        render_editable_layer(frame, text_area, buf);

        let diagnostic_rows = frame.diagnostic_rows(area);
        if diagnostic_rows > 0 {
            let list_area = Rect {
                y: area.y + text_area.height,
                height: diagnostic_rows,
                ..area
            };
            render_diagnostics(frame, list_area, buf);
        }

        if let Some(dropdown) = &frame.dropdown {
            render_dropdown(dropdown, theme, text_area, buf);
        }
        if let Some(hover) = &frame.hover {
            render_hover(hover, theme, text_area, buf);
        }
    }
}

/// Write `symbol` spanning `width` cells at display column `column`
fn put(buf: &mut Buffer, area: Rect, row: u16, column: usize, width: usize, symbol: &str, style: Style) {
    if column + width > area.width as usize {
        return;
    }
    if let Some(cell) = buf.cell_mut((area.x + column as u16, area.y + row)) {
        cell.set_symbol(symbol);
        cell.set_style(style);
    }
}

fn render_styled_layer(frame: &SurfaceFrame, area: Rect, buf: &mut Buffer) {
    let viewport = &frame.viewport;
    let error_style = Style::default()
        .add_modifier(Modifier::UNDERLINED)
        .underline_color(frame.theme.error_foreground);

    for (row, line_index) in viewport.visible_range().enumerate().take(area.height as usize) {
        let Some(tokens) = frame.tokens.get(line_index) else {
            break;
        };
        let mut column = 0usize;
        for token in tokens {
            let mut style = Style::default()
                .fg(token.color)
                .add_modifier(token.font_style);
            if token.has_error {
                style = style.patch(error_style);
            }
            for c in token.content.chars() {
                let width = char_width(c);
                if width > 0 && column >= viewport.left_column {
                    let x = column - viewport.left_column;
                    if c == '\t' {
                        for i in 0..width {
                            put(buf, area, row as u16, x + i, 1, " ", style);
                        }
                    } else {
                        put(buf, area, row as u16, x, width, c.encode_utf8(&mut [0; 4]), style);
                    }
                }
                column += width;
            }
        }
    }
}

/// Raw text wherever the styled layer does not match it yet (tokens land
/// after the edit that invalidated them)
fn render_editable_layer(frame: &SurfaceFrame, area: Rect, buf: &mut Buffer) {
    let viewport = &frame.viewport;
    let style = Style::default()
        .fg(frame.theme.foreground)
        .bg(frame.theme.background);

    for (row, line_index) in viewport.visible_range().enumerate().take(area.height as usize) {
        let Some(line) = line_at(&frame.text, line_index) else {
            break;
        };
        let styled: String = frame
            .tokens
            .get(line_index)
            .map(|tokens| tokens.iter().map(|t| t.content.as_str()).collect())
            .unwrap_or_default();
        if styled == line {
            continue;
        }

        let row_area = Rect {
            y: area.y + row as u16,
            height: 1,
            ..area
        };
        buf.set_style(row_area, style);
        for x in row_area.left()..row_area.right() {
            if let Some(cell) = buf.cell_mut((x, row_area.y)) {
                cell.set_symbol(" ");
            }
        }

        let mut column = 0usize;
        for c in line.chars() {
            let width = char_width(c);
            if width > 0 && column >= viewport.left_column {
                let x = column - viewport.left_column;
                if c == '\t' {
                    for i in 0..width {
                        put(buf, area, row as u16, x + i, 1, " ", style);
                    }
                } else {
                    put(buf, area, row as u16, x, width, c.encode_utf8(&mut [0; 4]), style);
                }
            }
            column += width;
        }
    }
}

fn render_diagnostics(frame: &SurfaceFrame, area: Rect, buf: &mut Buffer) {
    let theme = &frame.theme;
    let lines: Vec<Line> = frame
        .diagnostics
        .iter()
        .take(area.height as usize)
        .map(|diagnostic| {
            let (row, column) = offset_to_row_column(&frame.text, diagnostic.range.start);
            let color = match diagnostic.severity {
                Severity::Error => theme.error_foreground,
                _ => theme.foreground,
            };
            Line::from(Span::styled(
                format!(
                    "{}:{} {}: {}",
                    row + 1,
                    column + 1,
                    diagnostic.severity.label(),
                    diagnostic.message.lines().next().unwrap_or("")
                ),
                Style::default().fg(color),
            ))
        })
        .collect();

    Paragraph::new(lines)
        .style(Style::default().bg(theme.background))
        .render(area, buf);
}

/// Place a `width`x`height` box at `anchor`, clamped into `area`
fn overlay_rect(anchor: (f64, f64), width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = (anchor.0.max(0.0) as u16).min(area.width - width);
    let y = (anchor.1.max(0.0) as u16).min(area.height - height);
    Rect::new(area.x + x, area.y + y, width, height)
}

fn render_dropdown(dropdown: &DropdownOverlay, theme: &Theme, area: Rect, buf: &mut Buffer) {
    if dropdown.suggestions.is_empty() || area.is_empty() {
        return;
    }

    let rows = dropdown.suggestions.len().min(DROPDOWN_MAX_ROWS);
    let start = (dropdown.highlighted + 1).saturating_sub(rows);
    let name_width = dropdown
        .suggestions
        .iter()
        .map(|s| str_width(&s.name))
        .max()
        .unwrap_or(0);
    let kind_width = dropdown
        .suggestions
        .iter()
        .map(|s| str_width(&s.kind))
        .max()
        .unwrap_or(0);
    let width = (name_width + kind_width + 4) as u16;

    // Below the caret line when it fits, above it otherwise
    let mut anchor = dropdown.anchor;
    if anchor.1 + rows as f64 > area.height as f64 && anchor.1 - 1.0 >= rows as f64 {
        anchor.1 -= rows as f64 + 1.0;
    }
    let rect = overlay_rect(anchor, width, rows as u16, area);

    let lines: Vec<Line> = dropdown
        .suggestions
        .iter()
        .enumerate()
        .skip(start)
        .take(rows)
        .map(|(index, suggestion)| {
            let text = format!(
                " {:<name$}  {:>kind$} ",
                suggestion.name,
                suggestion.kind,
                name = name_width,
                kind = kind_width
            );
            let style = if index == dropdown.highlighted {
                Style::default()
                    .fg(theme.foreground)
                    .bg(theme.selection_background)
            } else {
                Style::default().fg(theme.foreground).bg(theme.hover_background)
            };
            Line::from(Span::styled(text, style))
        })
        .collect();

    Clear.render(rect, buf);
    Paragraph::new(lines)
        .style(Style::default().bg(theme.hover_background))
        .render(rect, buf);
}

fn render_hover(hover: &HoverState, theme: &Theme, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
        return;
    }

    let mut lines: Vec<Line> = hover
        .info
        .content
        .iter()
        .map(|tokens| {
            Line::from(
                tokens
                    .iter()
                    .map(|t| {
                        Span::styled(
                            t.content.replace('\t', " "),
                            Style::default().fg(t.color).add_modifier(t.font_style),
                        )
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    if !hover.info.documentation.is_empty() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.extend(
            hover
                .info
                .documentation
                .lines()
                .map(|l| Line::styled(l.to_string(), Style::default().fg(theme.foreground))),
        );
    }
    if lines.is_empty() {
        return;
    }

    let content_width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
    let width = (content_width + 2).min(HOVER_MAX_WIDTH);
    let height = lines.len() as u16 + 2;

    // Above the node line when it fits, below it otherwise
    let (x, y) = hover.anchor;
    let y = if y >= height as f64 { y - height as f64 } else { y + 1.0 };
    let rect = overlay_rect((x, y), width, height, area);

    Clear.render(rect, buf);
    Paragraph::new(lines)
        .block(
            Block::bordered()
                .border_style(Style::default().fg(theme.hover_border))
                .style(Style::default().bg(theme.hover_background)),
        )
        .render(rect, buf);
}
