//! Autocomplete dropdown state machine
//!
//! The dropdown is either closed or open on a non-empty suggestion list with
//! one highlighted entry. Completion requests run asynchronously; every
//! request and every close bumps a generation counter, and a result is only
//! applied when it answers the latest request.

use std::ops::Range;

use crate::model::edit::{replace_range, Edit};
use crate::services::analysis::CompletionSuggestion;

/// Identifier characters for trigger checks
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Characters that keep (or start) completion when they precede the caret
pub fn is_trigger_char(c: char) -> bool {
    is_identifier_char(c) || c == '.'
}

/// Whether completions should be requested with the caret at `cursor`
pub fn should_request(text: &str, cursor: usize) -> bool {
    cursor
        .checked_sub(1)
        .and_then(|i| text.chars().nth(i))
        .is_some_and(is_trigger_char)
}

/// Range of the identifier prefix before `cursor`: the longest trailing run
/// of ASCII letters and underscores
pub fn identifier_prefix_range(text: &str, cursor: usize) -> Range<usize> {
    let before: Vec<char> = text.chars().take(cursor).collect();
    let run = before
        .iter()
        .rev()
        .take_while(|c| c.is_ascii_alphabetic() || **c == '_')
        .count();
    before.len() - run..before.len()
}

/// Replace the identifier prefix before `cursor` with `name`
pub fn apply_completion(text: &str, cursor: usize, name: &str) -> Edit {
    replace_range(text, identifier_prefix_range(text, cursor), name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DropdownState {
    #[default]
    Closed,
    Open {
        suggestions: Vec<CompletionSuggestion>,
        highlighted: usize,
    },
}

#[derive(Debug, Default)]
pub struct Autocomplete {
    state: DropdownState,
    generation: u64,
    /// Caret offset the open list was requested at
    offset: Option<usize>,
}

impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DropdownState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DropdownState::Open { .. })
    }

    pub fn suggestions(&self) -> &[CompletionSuggestion] {
        match &self.state {
            DropdownState::Open { suggestions, .. } => suggestions,
            DropdownState::Closed => &[],
        }
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        match self.state {
            DropdownState::Open { highlighted, .. } => Some(highlighted),
            DropdownState::Closed => None,
        }
    }

    pub fn highlighted(&self) -> Option<&CompletionSuggestion> {
        match &self.state {
            DropdownState::Open {
                suggestions,
                highlighted,
            } => suggestions.get(*highlighted),
            DropdownState::Closed => None,
        }
    }

    /// Offset the open list belongs to
    pub fn offset(&self) -> Option<usize> {
        self.offset.filter(|_| self.is_open())
    }

    /// Close and drop any in-flight request
    pub fn close(&mut self) {
        self.generation += 1;
        self.state = DropdownState::Closed;
        self.offset = None;
    }

    /// Start a request; the returned generation identifies its result
    pub fn begin_request(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Apply a completion result. Stale generations are ignored and an empty
    /// list closes the dropdown. Returns whether the result was applied.
    pub fn resolve(
        &mut self,
        generation: u64,
        offset: usize,
        suggestions: Vec<CompletionSuggestion>,
    ) -> bool {
        if generation != self.generation {
            tracing::trace!(
                "Dropping completion result {} (current {})",
                generation,
                self.generation
            );
            return false;
        }
        if suggestions.is_empty() {
            self.state = DropdownState::Closed;
            self.offset = None;
        } else {
            self.state = DropdownState::Open {
                suggestions,
                highlighted: 0,
            };
            self.offset = Some(offset);
        }
        true
    }

    /// Move the highlight up, wrapping from the first entry to the last
    pub fn move_up(&mut self) {
        if let DropdownState::Open {
            suggestions,
            highlighted,
        } = &mut self.state
        {
            *highlighted = if *highlighted == 0 {
                suggestions.len() - 1
            } else {
                *highlighted - 1
            };
        }
    }

    /// Move the highlight down, wrapping from the last entry to the first
    pub fn move_down(&mut self) {
        if let DropdownState::Open {
            suggestions,
            highlighted,
        } = &mut self.state
        {
            *highlighted = (*highlighted + 1) % suggestions.len();
        }
    }

    /// Take the suggestion at `index` (the highlighted one when `None`) and
    /// close
    pub fn commit(&mut self, index: Option<usize>) -> Option<CompletionSuggestion> {
        let index = index.or(self.highlighted_index())?;
        let suggestion = self.suggestions().get(index).cloned()?;
        self.close();
        Some(suggestion)
    }
}
