//! Pure text edits on character offsets
//!
//! Edits never mutate the buffer: they produce the proposed text and caret,
//! which the surface either commits or hands to the caller (controlled mode).

use std::ops::Range;

use crate::primitives::position::{char_len, char_to_byte};

/// A content-changing operation at the caret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Insert(String),
    Backspace,
    DeleteForward,
}

/// Proposed text and caret after an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub cursor: usize,
}

/// Replace the character range `range` with `insert`; the caret lands after
/// the inserted text.
pub fn replace_range(text: &str, range: Range<usize>, insert: &str) -> Edit {
    let len = char_len(text);
    let end = range.end.min(len);
    let start = range.start.min(end);
    let start_byte = char_to_byte(text, start);
    let end_byte = char_to_byte(text, end);

    let mut new_text = String::with_capacity(text.len() - (end_byte - start_byte) + insert.len());
    new_text.push_str(&text[..start_byte]);
    new_text.push_str(insert);
    new_text.push_str(&text[end_byte..]);

    Edit {
        text: new_text,
        cursor: start + char_len(insert),
    }
}

/// Apply `op` at `cursor`. Returns `None` when the operation changes nothing
/// (backspace at the start, delete at the end).
pub fn apply(text: &str, cursor: usize, op: &EditOp) -> Option<Edit> {
    let len = char_len(text);
    let cursor = cursor.min(len);
    match op {
        EditOp::Insert(s) if s.is_empty() => None,
        EditOp::Insert(s) => Some(replace_range(text, cursor..cursor, s)),
        EditOp::Backspace if cursor == 0 => None,
        EditOp::Backspace => Some(replace_range(text, cursor - 1..cursor, "")),
        EditOp::DeleteForward if cursor >= len => None,
        EditOp::DeleteForward => Some(replace_range(text, cursor..cursor + 1, "")),
    }
}
