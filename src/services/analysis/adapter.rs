use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{AnalysisBackend, CompletionOptions, CompletionSuggestion, QuickInfo};
use crate::model::buffer::Revision;
use crate::model::diagnostic::Diagnostic;
use crate::primitives::language::Language;
use crate::primitives::position::char_len;
use crate::services::declarations::DeclarationFile;

/// What the adapter knows about a registered virtual file
#[derive(Debug, Clone)]
struct FileRecord {
    language: Language,
    revision: Revision,
    len: usize,
}

/// Owns virtual-file registrations in the analysis backend.
///
/// Query methods never fail: backend errors are logged and degrade to the
/// empty result, and languages the backend does not serve get empty results
/// without a backend round-trip.
pub struct AnalysisAdapter {
    backend: Arc<dyn AnalysisBackend>,
    files: Mutex<HashMap<String, FileRecord>>,
}

impl std::fmt::Debug for AnalysisAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisAdapter").finish_non_exhaustive()
    }
}

impl AnalysisAdapter {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            backend,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Full-content upsert of a virtual file.
    ///
    /// Registrations race when analysis tasks of one buffer overlap, so each
    /// carries the buffer revision; an older version from the same owner than
    /// the one already registered is skipped and `false` returned. A different
    /// owner always takes the file over. The lock is held across the backend
    /// call so the backend sees registrations in version order.
    pub async fn register_or_update(
        &self,
        file_id: &str,
        text: &str,
        language: &Language,
        revision: Revision,
    ) -> bool {
        let mut files = self.files.lock().await;
        if let Some(record) = files.get(file_id) {
            if record.revision.owner == revision.owner && record.revision.version > revision.version {
                tracing::trace!(
                    "Skipping stale registration of {} (v{} < v{})",
                    file_id,
                    revision.version,
                    record.revision.version
                );
                return false;
            }
        }

        if let Err(e) = self.backend.register_or_update(file_id, text).await {
            tracing::warn!("Failed to register {}: {:#}", file_id, e);
        }
        files.insert(
            file_id.to_string(),
            FileRecord {
                language: language.clone(),
                revision,
                len: char_len(text),
            },
        );
        true
    }

    /// Register ambient declaration files ahead of any buffer analysis
    pub async fn register_ambient(&self, declarations: &[DeclarationFile]) {
        for file in declarations {
            let language = Language::from_path(std::path::Path::new(&file.path))
                .unwrap_or(Language::TypeScript);
            self.register_or_update(&file.path, &file.code, &language, Revision::AMBIENT)
                .await;
        }
        tracing::info!("Registered {} ambient declaration files", declarations.len());
    }

    async fn record(&self, file_id: &str) -> Option<FileRecord> {
        self.files.lock().await.get(file_id).cloned()
    }

    /// Diagnostics for the registered content, with ranges clamped to it.
    /// Empty for languages the backend does not analyze.
    pub async fn diagnostics(&self, file_id: &str) -> Vec<Diagnostic> {
        let Some(record) = self.record(file_id).await else {
            return Vec::new();
        };
        if !record.language.is_analyzable() {
            return Vec::new();
        }
        match self.backend.diagnostics(file_id).await {
            Ok(diagnostics) => diagnostics
                .into_iter()
                .map(|d| d.clamped(record.len))
                .collect(),
            Err(e) => {
                tracing::warn!("Diagnostics lookup failed for {}: {:#}", file_id, e);
                Vec::new()
            }
        }
    }

    /// Direct member/identifier completions at `offset`, in backend order
    pub async fn completions(&self, file_id: &str, offset: usize) -> Vec<CompletionSuggestion> {
        let Some(record) = self.record(file_id).await else {
            return Vec::new();
        };
        if !record.language.is_analyzable() {
            return Vec::new();
        }
        let options = CompletionOptions::direct_members();
        match self
            .backend
            .completions(file_id, offset.min(record.len), &options)
            .await
        {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Completion lookup failed for {}@{}: {:#}", file_id, offset, e);
                Vec::new()
            }
        }
    }

    /// Quick info at `offset`; `None` when nothing resolves or the lookup fails
    pub async fn quick_info(&self, file_id: &str, offset: usize) -> Option<QuickInfo> {
        let record = self.record(file_id).await?;
        if !record.language.is_analyzable() {
            return None;
        }
        match self.backend.quick_info(file_id, offset.min(record.len)).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Quick info lookup failed for {}@{}: {:#}", file_id, offset, e);
                None
            }
        }
    }
}
