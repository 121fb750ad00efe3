//! Analysis backend contract
//!
//! The backend is an external service holding virtual files and answering
//! diagnostics, completion and quick-info queries. [`AnalysisAdapter`] wraps
//! it so the rest of the engine never sees a backend error.

mod adapter;

use std::ops::Range;

use async_trait::async_trait;

use crate::model::diagnostic::Diagnostic;

pub use adapter::AnalysisAdapter;

/// Completion request flags. Every "fuzzy" mode is off for direct member and
/// identifier completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOptions {
    pub include_module_exports: bool,
    pub include_snippets: bool,
    pub include_insert_text: bool,
    pub trigger_character: Option<char>,
}

impl CompletionOptions {
    pub fn direct_members() -> Self {
        Self {
            include_module_exports: false,
            include_snippets: false,
            include_insert_text: false,
            trigger_character: Some('.'),
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::direct_members()
    }
}

/// One completion candidate, in backend ranking order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSuggestion {
    pub name: String,
    /// Symbol kind ("property", "method", "function", ...)
    pub kind: String,
}

impl CompletionSuggestion {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Quick-info answer for a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickInfo {
    /// Signature text, highlighted with the buffer's language
    pub display: String,
    /// Plain documentation text
    pub documentation: String,
    /// Character range of the symbol, when the backend reports it
    pub span: Option<Range<usize>>,
}

/// An external analysis service
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Upsert a virtual file; overwrites any prior content for the id
    async fn register_or_update(&self, file_id: &str, text: &str) -> anyhow::Result<()>;

    async fn diagnostics(&self, file_id: &str) -> anyhow::Result<Vec<Diagnostic>>;

    /// `None` when the backend reports no completion info at all
    async fn completions(
        &self,
        file_id: &str,
        offset: usize,
        options: &CompletionOptions,
    ) -> anyhow::Result<Option<Vec<CompletionSuggestion>>>;

    async fn quick_info(&self, file_id: &str, offset: usize) -> anyhow::Result<Option<QuickInfo>>;
}

/// Backend for highlighting-only hosts: accepts files, knows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

#[async_trait]
impl AnalysisBackend for NoopBackend {
    async fn register_or_update(&self, _file_id: &str, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn diagnostics(&self, _file_id: &str) -> anyhow::Result<Vec<Diagnostic>> {
        Ok(Vec::new())
    }

    async fn completions(
        &self,
        _file_id: &str,
        _offset: usize,
        _options: &CompletionOptions,
    ) -> anyhow::Result<Option<Vec<CompletionSuggestion>>> {
        Ok(None)
    }

    async fn quick_info(&self, _file_id: &str, _offset: usize) -> anyhow::Result<Option<QuickInfo>> {
        Ok(None)
    }
}
