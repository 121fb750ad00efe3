//! Key classification
//!
//! Turns terminal key events into surface intents. What an intent does can
//! depend on surface state (Up/Down navigate an open dropdown, Enter commits
//! a suggestion), so that decision stays with the surface.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::edit::EditOp;

/// Caret movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    BufferStart,
    BufferEnd,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyIntent {
    /// Content-changing keystroke
    Edit(EditOp),
    Move(Movement),
    /// Enter: commits an open dropdown, inserts a newline otherwise
    Enter,
    Escape,
    /// Ctrl+Space
    TriggerCompletion,
    Ignore,
}

/// Classify a key event
pub fn classify(key: &KeyEvent) -> KeyIntent {
    if key.kind == KeyEventKind::Release {
        return KeyIntent::Ignore;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Char(' ') if ctrl => KeyIntent::TriggerCompletion,
        KeyCode::Char(_) if ctrl || alt => KeyIntent::Ignore,
        KeyCode::Char(c) => KeyIntent::Edit(EditOp::Insert(c.to_string())),
        KeyCode::Tab => KeyIntent::Edit(EditOp::Insert("\t".to_string())),
        KeyCode::Backspace => KeyIntent::Edit(EditOp::Backspace),
        KeyCode::Delete => KeyIntent::Edit(EditOp::DeleteForward),
        KeyCode::Enter => KeyIntent::Enter,
        KeyCode::Esc => KeyIntent::Escape,
        KeyCode::Left => KeyIntent::Move(Movement::Left),
        KeyCode::Right => KeyIntent::Move(Movement::Right),
        KeyCode::Up => KeyIntent::Move(Movement::Up),
        KeyCode::Down => KeyIntent::Move(Movement::Down),
        KeyCode::Home if ctrl => KeyIntent::Move(Movement::BufferStart),
        KeyCode::End if ctrl => KeyIntent::Move(Movement::BufferEnd),
        KeyCode::Home => KeyIntent::Move(Movement::LineStart),
        KeyCode::End => KeyIntent::Move(Movement::LineEnd),
        KeyCode::PageUp => KeyIntent::Move(Movement::PageUp),
        KeyCode::PageDown => KeyIntent::Move(Movement::PageDown),
        _ => KeyIntent::Ignore,
    }
}
