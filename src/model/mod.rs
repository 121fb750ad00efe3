//! Core data model
//!
//! Plain data shared by the pipeline stages: the buffer being edited, the
//! edits applied to it, and the derived tokens and diagnostics.

pub mod buffer;
pub mod diagnostic;
pub mod edit;
pub mod token;

pub use buffer::{Buffer, Revision};
pub use diagnostic::{Diagnostic, Severity};
pub use token::{Token, TokenLine};
