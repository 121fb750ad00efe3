use ratatui::layout::Rect;
use ratatui::Frame;

use super::EditingSurface;
use crate::view::surface::{DropdownOverlay, SurfaceFrame, SurfaceWidget};

impl EditingSurface {
    /// Snapshot of everything the surface shows
    pub fn frame(&self) -> SurfaceFrame {
        let scroll = self.viewport.scroll_pixels(&self.mapper);
        let dropdown = self.autocomplete.highlighted_index().map(|highlighted| {
            let (x, y) = self.mapper.offset_to_pixel(self.buffer.text(), self.cursor);
            DropdownOverlay {
                suggestions: self.autocomplete.suggestions().to_vec(),
                highlighted,
                anchor: (x - scroll.0, y + self.mapper.line_height() - scroll.1),
            }
        });

        let mut tokens = self.tokens.clone();
        if self.tokens_version != self.buffer.version() {
            // Error flags of an older version
            tokens
                .iter_mut()
                .flatten()
                .for_each(|token| token.has_error = false);
        }

        SurfaceFrame {
            tokens,
            text: self.buffer.text().to_string(),
            cursor: self.cursor,
            focused: self.focused,
            viewport: self.viewport.clone(),
            dropdown,
            hover: self.hover.state().cloned(),
            diagnostics: self.diagnostics().to_vec(),
            theme: self.theme.clone(),
        }
    }

    /// Fit the viewport to a text area of `width` x `height` cells
    pub fn resize(&mut self, width: u16, height: u16) {
        if (self.viewport.width, self.viewport.height) == (width, height) {
            return;
        }
        self.viewport.resize(width, height);
        self.scroll_into_view();
    }

    /// Draw into `area` and place the terminal cursor on the caret
    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let probe = self.frame();
        self.resize(area.width, probe.text_rows(area));

        let surface = self.frame();
        frame.render_widget(SurfaceWidget::new(&surface), area);
        if let Some((x, y)) = surface.caret_screen_position(area) {
            frame.set_cursor_position((x, y));
        }
    }
}
