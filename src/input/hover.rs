//! Hover tooltip state
//!
//! The pointer resolves to a syntax node; one quick-info query runs per node
//! and its answer becomes the tooltip anchored at the node start.

use std::ops::Range;

use crate::model::token::TokenLine;
use crate::primitives::position::PositionMapper;

#[derive(Debug, Clone, PartialEq)]
pub struct HoverInfo {
    /// Signature, tokenized with the buffer's language
    pub content: Vec<TokenLine>,
    pub documentation: String,
    pub anchor_offset: usize,
}

/// A visible tooltip
#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub info: HoverInfo,
    /// Syntax node the tooltip describes
    pub node: Range<usize>,
    /// Top-left of the node relative to the visible area
    pub anchor: (f64, f64),
}

/// Tooltip anchor: left edge of the node start on its line, at that line's
/// top, minus the active scroll
pub fn anchor_for(mapper: &PositionMapper, text: &str, offset: usize, scroll: (f64, f64)) -> (f64, f64) {
    let (x, y) = mapper.offset_to_pixel(text, offset);
    (x - scroll.0, y - scroll.1)
}

#[derive(Debug, Default)]
pub struct HoverController {
    state: Option<HoverState>,
    generation: u64,
    /// Node of the query in flight
    pending: Option<Range<usize>>,
}

impl HoverController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&HoverState> {
        self.state.as_ref()
    }

    /// Hide the tooltip and drop any query in flight
    pub fn clear(&mut self) {
        self.generation += 1;
        self.state = None;
        self.pending = None;
    }

    /// Pointer is over `node`. Returns the generation of a new query, or
    /// `None` when the node is already shown or being queried.
    pub fn begin(&mut self, node: Range<usize>) -> Option<u64> {
        let shown = self.state.as_ref().map(|s| &s.node) == Some(&node);
        if shown || self.pending.as_ref() == Some(&node) {
            return None;
        }
        self.generation += 1;
        self.pending = Some(node);
        Some(self.generation)
    }

    /// Apply a query answer; `None` clears the tooltip. Returns whether the
    /// answer was current.
    pub fn resolve(&mut self, generation: u64, state: Option<HoverState>) -> bool {
        if generation != self.generation {
            tracing::trace!("Dropping hover result {} (current {})", generation, self.generation);
            return false;
        }
        self.pending = None;
        self.state = state;
        true
    }

    /// Move the tooltip after a scroll
    pub fn shift_anchor(&mut self, dx: f64, dy: f64) {
        if let Some(state) = &mut self.state {
            state.anchor.0 -= dx;
            state.anchor.1 -= dy;
        }
    }
}
