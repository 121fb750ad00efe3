//! Syntax-node lookup
//!
//! Hover resolution needs the syntax node under the pointer. The tree is
//! parsed on demand for one buffer snapshot; offsets in and out are
//! character offsets.

use std::ops::Range;

use tree_sitter::{Parser, Tree};

use crate::primitives::language::Language;
use crate::primitives::position::{byte_to_char, char_len, char_to_byte};

/// Tree-sitter grammar for a language
pub fn ts_language(language: &Language) -> Option<tree_sitter::Language> {
    let grammar = match language {
        Language::JavaScript | Language::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::Css => tree_sitter_css::LANGUAGE.into(),
        Language::Json => tree_sitter_json::LANGUAGE.into(),
        Language::ShellScript => tree_sitter_bash::LANGUAGE.into(),
        Language::Html => tree_sitter_html::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Other(_) => return None,
    };
    Some(grammar)
}

/// Parsed syntax tree of one text snapshot
pub struct SyntaxTree {
    tree: Tree,
    text: String,
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("root", &self.tree.root_node().kind())
            .field("len", &self.text.len())
            .finish()
    }
}

impl SyntaxTree {
    /// Parse `text`; `None` when the language has no grammar
    pub fn parse(text: &str, language: &Language) -> Option<Self> {
        let grammar = ts_language(language)?;
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            tracing::warn!("Failed to set parser language {}: {}", language, e);
            return None;
        }
        let tree = parser.parse(text, None)?;
        Some(Self {
            tree,
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Smallest node covering the character at `offset`, as a character
    /// range. The root node does not count: positions covered only by the
    /// root (and positions past the end) resolve to `None`.
    pub fn node_at(&self, offset: usize) -> Option<Range<usize>> {
        if offset >= char_len(&self.text) {
            return None;
        }
        let start = char_to_byte(&self.text, offset);
        let end = char_to_byte(&self.text, offset + 1);
        let root = self.tree.root_node();
        let node = root.descendant_for_byte_range(start, end)?;
        if node.id() == root.id() {
            return None;
        }
        Some(byte_to_char(&self.text, node.start_byte())..byte_to_char(&self.text, node.end_byte()))
    }
}
