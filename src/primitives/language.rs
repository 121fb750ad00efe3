//! Language identifiers
//!
//! Callers pass free-form language ids ("ts", "bash", "tsx", ...). They are
//! normalized once into a [`Language`] which decides tokenizer support and
//! whether the analysis backend is consulted.

use std::fmt;
use std::path::Path;

/// A normalized source language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
    Css,
    Json,
    ShellScript,
    Html,
    Python,
    Rust,
    /// Any id without tokenizer support, kept verbatim (rendered as plain text)
    Other(String),
}

/// Languages a default host loads the tokenizer for
pub const DEFAULT_LANGUAGES: &[Language] = &[
    Language::JavaScript,
    Language::Jsx,
    Language::TypeScript,
    Language::Tsx,
    Language::Css,
    Language::Json,
    Language::ShellScript,
];

impl Language {
    /// Normalize a language id, resolving aliases.
    pub fn from_id(id: &str) -> Self {
        let id = id.trim().to_ascii_lowercase();
        match id.as_str() {
            "javascript" | "js" | "mjs" | "cjs" => Language::JavaScript,
            "jsx" => Language::Jsx,
            "typescript" | "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "css" => Language::Css,
            "json" => Language::Json,
            "shellscript" | "shell" | "bash" | "sh" => Language::ShellScript,
            "html" | "htm" => Language::Html,
            "python" | "py" => Language::Python,
            "rust" | "rs" => Language::Rust,
            _ => Language::Other(id),
        }
    }

    /// Detect language from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match Self::from_id(ext) {
            Language::Other(_) => None,
            language => Some(language),
        }
    }

    /// Resolve the language of a buffer: an explicit id wins, otherwise the
    /// filename extension decides, otherwise plain text.
    pub fn resolve(id: Option<&str>, filename: &str) -> Self {
        match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Self::from_id(id),
            None => Self::from_path(Path::new(filename))
                .unwrap_or_else(|| Language::Other("plaintext".to_string())),
        }
    }

    /// Canonical id
    pub fn id(&self) -> &str {
        match self {
            Language::JavaScript => "javascript",
            Language::Jsx => "jsx",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Css => "css",
            Language::Json => "json",
            Language::ShellScript => "shellscript",
            Language::Html => "html",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Other(id) => id,
        }
    }

    /// The JavaScript family is served by the analysis backend; every other
    /// language only gets lexical highlighting.
    pub fn is_analyzable(&self) -> bool {
        matches!(
            self,
            Language::JavaScript | Language::Jsx | Language::TypeScript | Language::Tsx
        )
    }

    /// Language id announced to a language server in `didOpen`
    pub fn lsp_language_id(&self) -> &str {
        match self {
            Language::Jsx => "javascriptreact",
            Language::Tsx => "typescriptreact",
            other => other.id(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
