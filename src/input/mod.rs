//! Input pipeline
//!
//! Key classification plus the two pointer/keystroke driven state machines:
//! the completion dropdown and the hover tooltip.

pub mod autocomplete;
pub mod hover;
pub mod keys;

pub use autocomplete::{Autocomplete, DropdownState};
pub use hover::{HoverController, HoverInfo, HoverState};
pub use keys::{classify, KeyIntent, Movement};

/// Whether an event was handled by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Consumed,
    Ignored,
}
