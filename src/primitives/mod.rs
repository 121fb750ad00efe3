//! Primitive building blocks shared by every layer
//!
//! - `position`: offset / (row, column) / pixel conversions
//! - `language`: language id normalization and detection
//! - `highlighter`: tree-sitter tokenizer producing themed token lines
//! - `syntax`: syntax-node lookup for hover resolution

pub mod highlighter;
pub mod language;
pub mod position;
pub mod syntax;
