use crossterm::event::KeyEvent;

use super::{EditingSurface, SurfaceUpdate};
use crate::input::autocomplete::{apply_completion, is_trigger_char, should_request};
use crate::input::hover::{anchor_for, HoverInfo, HoverState};
use crate::input::keys::{classify, KeyIntent, Movement};
use crate::input::InputResult;
use crate::model::edit::{apply, EditOp};
use crate::primitives::position::{char_len, offset_to_row_column, row_column_to_offset};

/// Whether an edit of this kind asks for completions afterwards
fn triggers_completion(op: &EditOp) -> bool {
    match op {
        EditOp::Insert(s) => {
            let mut chars = s.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if is_trigger_char(c))
        }
        EditOp::Backspace => true,
        EditOp::DeleteForward => false,
    }
}

impl EditingSurface {
    /// Dispatch a key event
    pub fn handle_key(&mut self, key: &KeyEvent) -> InputResult {
        let open = self.autocomplete.is_open();
        match classify(key) {
            KeyIntent::Move(Movement::Up) if open => {
                self.autocomplete.move_up();
                InputResult::Consumed
            }
            KeyIntent::Move(Movement::Down) if open => {
                self.autocomplete.move_down();
                InputResult::Consumed
            }
            KeyIntent::Enter if open => self.commit_suggestion(None),
            KeyIntent::Escape if open => {
                self.autocomplete.close();
                InputResult::Consumed
            }
            KeyIntent::Escape => {
                if self.hover.state().is_some() {
                    self.hover.clear();
                    return InputResult::Consumed;
                }
                InputResult::Ignored
            }
            KeyIntent::Enter => self.edit(EditOp::Insert("\n".to_string())),
            KeyIntent::Edit(op) => self.edit(op),
            KeyIntent::TriggerCompletion => {
                if should_request(self.buffer.text(), self.cursor) {
                    self.request_completions();
                } else {
                    self.autocomplete.close();
                }
                InputResult::Consumed
            }
            KeyIntent::Move(movement) => {
                self.move_cursor(movement);
                InputResult::Consumed
            }
            KeyIntent::Ignore => InputResult::Ignored,
        }
    }

    /// Accept suggestion `index` from the open dropdown (pointer click)
    pub fn select_suggestion(&mut self, index: usize) -> InputResult {
        self.commit_suggestion(Some(index))
    }

    fn commit_suggestion(&mut self, index: Option<usize>) -> InputResult {
        let Some(suggestion) = self.autocomplete.commit(index) else {
            return InputResult::Ignored;
        };
        tracing::debug!("Accepting completion {}", suggestion.name);
        let edit = apply_completion(self.buffer.text(), self.cursor, &suggestion.name);
        self.propose(edit.text, edit.cursor, false);
        InputResult::Consumed
    }

    fn edit(&mut self, op: EditOp) -> InputResult {
        let Some(edit) = apply(self.buffer.text(), self.cursor, &op) else {
            self.autocomplete.close();
            return InputResult::Consumed;
        };
        let trigger = triggers_completion(&op);
        self.propose(edit.text, edit.cursor, trigger);
        InputResult::Consumed
    }

    fn move_cursor(&mut self, movement: Movement) {
        let text = self.buffer.text();
        let len = char_len(text);
        let cursor = self.cursor;
        let (row, column) = offset_to_row_column(text, cursor);
        let page = self.viewport.visible_line_count().max(1);

        let target = match movement {
            Movement::Left => cursor.saturating_sub(1),
            Movement::Right => (cursor + 1).min(len),
            Movement::Up if row == 0 => 0,
            Movement::Up => row_column_to_offset(text, row - 1, column),
            Movement::Down => {
                let last_row = text.split('\n').count() - 1;
                if row >= last_row {
                    len
                } else {
                    row_column_to_offset(text, row + 1, column)
                }
            }
            Movement::LineStart => row_column_to_offset(text, row, 0),
            Movement::LineEnd => row_column_to_offset(text, row, usize::MAX),
            Movement::BufferStart => 0,
            Movement::BufferEnd => len,
            Movement::PageUp => row_column_to_offset(text, row.saturating_sub(page), column),
            Movement::PageDown => row_column_to_offset(text, row + page, column),
        };
        self.set_cursor(target);
    }

    /// Pointer moved to `(x, y)` relative to the visible text area
    pub fn handle_pointer_move(&mut self, x: f64, y: f64) {
        let language = self.buffer.language().clone();
        if !language.is_analyzable() {
            self.hover.clear();
            return;
        }

        let scroll = self.viewport.scroll_pixels(&self.mapper);
        let Some(offset) = self.mapper.locate(self.buffer.text(), x + scroll.0, y + scroll.1) else {
            self.hover.clear();
            return;
        };
        let Some(node) = self.node_at(offset) else {
            self.hover.clear();
            return;
        };
        let Some(generation) = self.hover.begin(node.clone()) else {
            return;
        };

        let anchor = anchor_for(&self.mapper, self.buffer.text(), node.start, scroll);
        let host = self.host.clone();
        let tx = self.updates_tx.clone();
        let theme = self.theme.clone();
        let revision = self.buffer.revision();
        let version = revision.version;
        let text = self.buffer.text().to_string();
        let file_id = self.buffer.file_id().to_string();

        self.spawn(async move {
            let highlighter = host.ready().await;
            let adapter = host.adapter();
            adapter
                .register_or_update(&file_id, &text, &language, revision)
                .await;
            let hover = adapter.quick_info(&file_id, offset).await.map(|info| HoverState {
                info: HoverInfo {
                    content: highlighter.highlight_with_theme(&info.display, &language, None, &theme),
                    documentation: info.documentation,
                    anchor_offset: node.start,
                },
                node,
                anchor,
            });
            let _ = tx.send(SurfaceUpdate::Hover {
                version,
                generation,
                hover,
            });
        });
    }

    /// Pointer cell in a terminal; one cell is one grid unit
    pub fn handle_pointer_cell(&mut self, column: u16, row: u16) {
        let x = column as f64 * self.mapper.glyph_width();
        let y = row as f64 * self.mapper.line_height();
        self.handle_pointer_move(x, y);
    }

    pub fn handle_pointer_leave(&mut self) {
        self.hover.clear();
    }

    /// Scroll by whole lines (wheel); negative scrolls up
    pub fn scroll_lines(&mut self, lines: isize) {
        let before = self.viewport.scroll_pixels(&self.mapper);
        let total = self.buffer.text().split('\n').count();
        if lines < 0 {
            self.viewport.scroll_up(lines.unsigned_abs());
        } else {
            self.viewport.scroll_down(lines as usize, total);
        }
        let after = self.viewport.scroll_pixels(&self.mapper);
        self.hover.shift_anchor(after.0 - before.0, after.1 - before.1);
    }

    pub fn handle_focus(&mut self) {
        self.focused = true;
    }

    /// Focus left the surface; the dropdown closes
    pub fn handle_blur(&mut self) {
        self.focused = false;
        self.autocomplete.close();
    }
}
