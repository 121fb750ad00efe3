//! Process-wide engine host
//!
//! One host serves every editing surface of the process. Its first use
//! fetches the ambient declaration bundle, registers it with the analysis
//! adapter, then compiles the highlighter. Concurrent first uses share that
//! single initialization; it never runs twice and is never torn down.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell as GlobalCell;
use tokio::sync::OnceCell;

use crate::config::HostConfig;
use crate::primitives::highlighter::Highlighter;
use crate::primitives::language::{Language, DEFAULT_LANGUAGES};
use crate::services::analysis::{AnalysisAdapter, AnalysisBackend, NoopBackend};
use crate::services::declarations::{source_for_location, DeclarationSource};
use crate::services::lsp::LspAnalysisBackend;
use crate::view::theme::Theme;

static GLOBAL_HOST: GlobalCell<Arc<EngineHost>> = GlobalCell::new();

/// Tokenizer bundle parameters
#[derive(Debug, Clone)]
pub struct HighlighterConfig {
    pub theme: Arc<Theme>,
    /// Every language the process will highlight
    pub languages: Vec<Language>,
    /// Directory of `<language>/highlights.scm` overrides
    pub query_dir: Option<PathBuf>,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            theme: Arc::new(Theme::dark()),
            languages: DEFAULT_LANGUAGES.to_vec(),
            query_dir: None,
        }
    }
}

pub struct EngineHost {
    adapter: Arc<AnalysisAdapter>,
    declarations: Option<Box<dyn DeclarationSource>>,
    highlighter_config: HighlighterConfig,
    ready: OnceCell<Arc<Highlighter>>,
    scroll_offset: usize,
}

impl std::fmt::Debug for EngineHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHost")
            .field("languages", &self.highlighter_config.languages)
            .field("ready", &self.ready.initialized())
            .finish_non_exhaustive()
    }
}

impl EngineHost {
    pub fn new(backend: Arc<dyn AnalysisBackend>, highlighter_config: HighlighterConfig) -> Self {
        Self {
            adapter: Arc::new(AnalysisAdapter::new(backend)),
            declarations: None,
            highlighter_config,
            ready: OnceCell::new(),
            scroll_offset: 3,
        }
    }

    /// Register this bundle during initialization
    pub fn with_declarations(mut self, source: Box<dyn DeclarationSource>) -> Self {
        self.declarations = Some(source);
        self
    }

    pub fn with_scroll_offset(mut self, scroll_offset: usize) -> Self {
        self.scroll_offset = scroll_offset;
        self
    }

    /// Host built from configuration. A language server that fails to start
    /// leaves the host highlighting-only.
    pub async fn from_config(config: &HostConfig) -> anyhow::Result<Self> {
        let theme = Theme::load(&config.theme)?;

        let backend: Arc<dyn AnalysisBackend> = match config.lsp.as_ref().filter(|lsp| lsp.enabled) {
            Some(lsp) => match LspAnalysisBackend::connect(lsp).await {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    tracing::warn!("Language server {} unavailable: {:#}", lsp.command, e);
                    Arc::new(NoopBackend)
                }
            },
            None => Arc::new(NoopBackend),
        };

        let mut host = Self::new(
            backend,
            HighlighterConfig {
                theme: Arc::new(theme),
                languages: config.language_set(),
                query_dir: config.asset_paths.queries.clone(),
            },
        )
        .with_scroll_offset(config.surface.scroll_offset);
        if let Some(location) = &config.declarations {
            host = host.with_declarations(source_for_location(location));
        }
        Ok(host)
    }

    pub fn adapter(&self) -> &Arc<AnalysisAdapter> {
        &self.adapter
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.highlighter_config.theme
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Finish one-time initialization, or wait for the one in progress
    pub async fn ready(&self) -> Arc<Highlighter> {
        self.ready
            .get_or_init(|| async {
                if let Some(source) = &self.declarations {
                    match source.fetch().await {
                        Ok(files) => self.adapter.register_ambient(&files).await,
                        Err(e) => tracing::warn!(
                            "Declaration bundle {} unavailable: {:#}",
                            source.describe(),
                            e
                        ),
                    }
                }

                let config = self.highlighter_config.clone();
                let load = tokio::task::spawn_blocking(move || {
                    Highlighter::load(config.theme, &config.languages, config.query_dir.as_deref())
                });
                let highlighter = match load.await {
                    Ok(highlighter) => highlighter,
                    Err(e) => {
                        tracing::error!("Highlighter load task failed: {}", e);
                        Highlighter::load(self.highlighter_config.theme.clone(), &[], None)
                    }
                };
                Arc::new(highlighter)
            })
            .await
            .clone()
    }

    /// Highlighter, if initialization has completed
    pub fn try_ready(&self) -> Option<Arc<Highlighter>> {
        self.ready.get().cloned()
    }

    /// Install the process-wide host. Returns the host that ends up installed,
    /// which is the existing one when called twice.
    pub fn install_global(host: EngineHost) -> Arc<EngineHost> {
        GLOBAL_HOST.get_or_init(|| Arc::new(host)).clone()
    }

    /// The process-wide host; a highlighting-only default when none was
    /// installed
    pub fn global() -> Arc<EngineHost> {
        GLOBAL_HOST
            .get_or_init(|| Arc::new(EngineHost::new(Arc::new(NoopBackend), HighlighterConfig::default())))
            .clone()
    }
}
