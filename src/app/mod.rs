//! Editing surface
//!
//! The coordinator of one editor instance. Buffer mutations are synchronous;
//! analysis, completion and hover work runs on spawned tasks whose results
//! come back over a channel tagged with the buffer version that requested
//! them. Results for any other version are dropped on arrival.

mod input;
mod render;

use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::EditorOptions;
use crate::input::autocomplete::{should_request, Autocomplete, DropdownState};
use crate::input::hover::{HoverController, HoverState};
use crate::model::buffer::Buffer;
use crate::model::diagnostic::Diagnostic;
use crate::model::token::{plain_lines, TokenLine};
use crate::primitives::language::Language;
use crate::primitives::position::PositionMapper;
use crate::primitives::syntax::SyntaxTree;
use crate::services::analysis::CompletionSuggestion;
use crate::services::host::EngineHost;
use crate::view::theme::Theme;
use crate::view::viewport::Viewport;

/// Content-change callback; receives the proposed text
pub type ChangeCallback = Box<dyn FnMut(&str) + Send>;

/// Result of background work, tagged with the buffer version it belongs to
#[derive(Debug)]
pub enum SurfaceUpdate {
    Analysis {
        version: u64,
        tokens: Vec<TokenLine>,
        diagnostics: Vec<Diagnostic>,
    },
    Completions {
        version: u64,
        offset: usize,
        generation: u64,
        suggestions: Vec<CompletionSuggestion>,
    },
    Hover {
        version: u64,
        generation: u64,
        hover: Option<HoverState>,
    },
}

pub struct EditingSurface {
    host: Arc<EngineHost>,
    buffer: Buffer,
    /// Caret as a character offset
    cursor: usize,
    /// Caret position to apply at the next commit
    cursor_target: Option<usize>,
    controlled: bool,
    /// Completion trigger of a proposed edit, evaluated when it is committed
    pending_trigger: bool,
    on_change: Option<ChangeCallback>,
    theme: Arc<Theme>,
    mapper: PositionMapper,
    viewport: Viewport,

    tokens: Vec<TokenLine>,
    /// Version the tokens were computed for (0 before the first analysis)
    tokens_version: u64,
    diagnostics: Vec<Diagnostic>,
    /// Version the diagnostics were computed for
    diagnostics_version: u64,
    autocomplete: Autocomplete,
    hover: HoverController,
    focused: bool,
    /// Parsed tree of one buffer version, built on first hover
    syntax: Option<(u64, Option<SyntaxTree>)>,

    updates_tx: UnboundedSender<SurfaceUpdate>,
    updates_rx: UnboundedReceiver<SurfaceUpdate>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for EditingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSurface")
            .field("file_id", &self.buffer.file_id())
            .field("version", &self.buffer.version())
            .field("cursor", &self.cursor)
            .field("controlled", &self.controlled)
            .finish_non_exhaustive()
    }
}

impl EditingSurface {
    /// Create a surface and schedule the analysis of its initial content.
    ///
    /// Background work is spawned on the ambient Tokio runtime; without one
    /// the surface still edits but derives nothing.
    pub fn new(host: Arc<EngineHost>, options: EditorOptions) -> Self {
        let buffer = Buffer::new(
            options.initial_text(),
            options.language.as_deref(),
            options.filename.as_deref(),
        );
        let theme = match options.theme.as_deref() {
            Some(reference) => match Theme::load(reference) {
                Ok(theme) => Arc::new(theme),
                Err(e) => {
                    tracing::warn!("Theme {} unavailable, using host theme: {:#}", reference, e);
                    host.theme().clone()
                }
            },
            None => host.theme().clone(),
        };
        let mut viewport = Viewport::new(80, 24);
        viewport.set_scroll_offset(host.scroll_offset());
        let (updates_tx, updates_rx) = unbounded_channel();

        tracing::debug!(
            "Editing surface {} ({}) created",
            buffer.file_id(),
            buffer.language()
        );

        let mut surface = Self {
            tokens: plain_lines(buffer.text(), theme.default_style()),
            host,
            buffer,
            cursor: 0,
            cursor_target: None,
            controlled: options.is_controlled(),
            pending_trigger: false,
            on_change: None,
            theme,
            mapper: PositionMapper::cells(),
            viewport,
            tokens_version: 0,
            diagnostics: Vec::new(),
            diagnostics_version: 0,
            autocomplete: Autocomplete::new(),
            hover: HoverController::new(),
            focused: true,
            syntax: None,
            updates_tx,
            updates_rx,
            tasks: Vec::new(),
        };
        surface.schedule_analysis();
        surface
    }

    /// Surface on the process-wide host
    pub fn with_global_host(options: EditorOptions) -> Self {
        Self::new(EngineHost::global(), options)
    }

    /// Attach the content-change callback
    pub fn on_change(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Use a different coordinate system (pixel hosts)
    pub fn with_mapper(mut self, mapper: PositionMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Show pre-computed tokens until the first analysis lands
    pub fn with_prerendered(mut self, tokens: Vec<TokenLine>) -> Self {
        if self.tokens_version == 0 {
            self.tokens = tokens;
        }
        self
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn file_id(&self) -> &str {
        self.buffer.file_id()
    }

    pub fn language(&self) -> &Language {
        self.buffer.language()
    }

    pub fn version(&self) -> u64 {
        self.buffer.version()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Caret position waiting for the next commit
    pub fn cursor_target(&self) -> Option<usize> {
        self.cursor_target
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn tokens(&self) -> &[TokenLine] {
        &self.tokens
    }

    /// Version the current tokens were computed for
    pub fn tokens_version(&self) -> u64 {
        self.tokens_version
    }

    /// Diagnostics of the current version; empty while its analysis is
    /// pending
    pub fn diagnostics(&self) -> &[Diagnostic] {
        if self.diagnostics_version != self.buffer.version() {
            return &[];
        }
        &self.diagnostics
    }

    pub fn dropdown(&self) -> &DropdownState {
        self.autocomplete.state()
    }

    pub fn hover(&self) -> Option<&HoverState> {
        self.hover.state()
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn mapper(&self) -> &PositionMapper {
        &self.mapper
    }

    /// Caller-supplied content. Commits a proposed edit in controlled mode
    /// (consuming the pending caret target); elsewhere it replaces the text.
    pub fn set_value(&mut self, value: &str) {
        let trigger = std::mem::take(&mut self.pending_trigger);
        self.commit(value.to_string(), trigger);
    }

    /// Switch the virtual file id (auto-generated when `None`)
    pub fn set_filename(&mut self, filename: Option<&str>) {
        if filename.is_some() && filename == Some(self.buffer.file_id()) {
            return;
        }
        self.buffer.set_file_id(filename);
        self.invalidate_derived();
        self.schedule_analysis();
    }

    pub fn set_language(&mut self, language: Option<&str>) {
        self.buffer.set_language(language);
        self.invalidate_derived();
        self.schedule_analysis();
    }

    /// Move the caret without editing
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.buffer.len());
        self.autocomplete.close();
        self.scroll_into_view();
    }

    /// Hand a proposed edit to the caller and commit it unless the surface is
    /// controlled
    fn propose(&mut self, text: String, cursor: usize, trigger: bool) {
        self.cursor_target = Some(cursor);
        if let Some(callback) = self.on_change.as_mut() {
            callback(&text);
        }
        if self.controlled {
            self.pending_trigger = trigger;
            return;
        }
        self.commit(text, trigger);
    }

    fn commit(&mut self, text: String, trigger: bool) {
        let changed = self.buffer.replace(text);
        let len = self.buffer.len();
        self.cursor = match self.cursor_target.take() {
            Some(target) => target.min(len),
            None => self.cursor.min(len),
        };

        if changed {
            self.hover.clear();
            self.schedule_analysis();
        }
        self.scroll_into_view();

        if trigger && should_request(self.buffer.text(), self.cursor) {
            self.request_completions();
        } else {
            self.autocomplete.close();
        }
    }

    /// Drop state that belongs to another file identity
    fn invalidate_derived(&mut self) {
        self.diagnostics.clear();
        self.autocomplete.close();
        self.hover.clear();
    }

    /// Keep the caret visible; overlays follow the scroll
    fn scroll_into_view(&mut self) {
        let before = self.viewport.scroll_pixels(&self.mapper);
        self.viewport.ensure_visible(self.buffer.text(), self.cursor);
        let after = self.viewport.scroll_pixels(&self.mapper);
        self.hover.shift_anchor(after.0 - before.0, after.1 - before.1);
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|t| !t.is_finished());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => self.tasks.push(handle.spawn(task)),
            Err(_) => tracing::warn!("No async runtime, skipping background work"),
        }
    }

    /// Re-register, re-analyze and re-tokenize the current version
    fn schedule_analysis(&mut self) {
        let host = self.host.clone();
        let tx = self.updates_tx.clone();
        let theme = self.theme.clone();
        let revision = self.buffer.revision();
        let version = revision.version;
        let text = self.buffer.text().to_string();
        let language = self.buffer.language().clone();
        let file_id = self.buffer.file_id().to_string();

        self.spawn(async move {
            let highlighter = host.ready().await;
            let adapter = host.adapter();
            if !adapter
                .register_or_update(&file_id, &text, &language, revision)
                .await
            {
                return;
            }
            let diagnostics = if language.is_analyzable() {
                adapter.diagnostics(&file_id).await
            } else {
                Vec::new()
            };
            let tokens = highlighter.highlight_with_theme(&text, &language, Some(&diagnostics), &theme);
            let _ = tx.send(SurfaceUpdate::Analysis {
                version,
                tokens,
                diagnostics,
            });
        });
    }

    /// Ask for completions at the caret
    fn request_completions(&mut self) {
        let generation = self.autocomplete.begin_request();
        let host = self.host.clone();
        let tx = self.updates_tx.clone();
        let revision = self.buffer.revision();
        let version = revision.version;
        let offset = self.cursor;
        let text = self.buffer.text().to_string();
        let language = self.buffer.language().clone();
        let file_id = self.buffer.file_id().to_string();

        self.spawn(async move {
            host.ready().await;
            let adapter = host.adapter();
            adapter
                .register_or_update(&file_id, &text, &language, revision)
                .await;
            let suggestions = adapter.completions(&file_id, offset).await;
            let _ = tx.send(SurfaceUpdate::Completions {
                version,
                offset,
                generation,
                suggestions,
            });
        });
    }

    /// Syntax node under `offset`, from a tree of the current version
    fn node_at(&mut self, offset: usize) -> Option<std::ops::Range<usize>> {
        let version = self.buffer.version();
        if self.syntax.as_ref().map(|(v, _)| *v) != Some(version) {
            let tree = SyntaxTree::parse(self.buffer.text(), self.buffer.language());
            self.syntax = Some((version, tree));
        }
        self.syntax.as_ref()?.1.as_ref()?.node_at(offset)
    }

    /// Apply every result that has arrived. Returns whether anything visible
    /// changed.
    pub fn process_pending(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.updates_rx.try_recv() {
            changed |= self.apply_update(update);
        }
        changed
    }

    /// Wait for all background work, then apply its results
    pub async fn settle(&mut self) {
        while !self.tasks.is_empty() {
            for task in std::mem::take(&mut self.tasks) {
                if let Err(e) = task.await {
                    tracing::warn!("Surface task failed: {}", e);
                }
            }
        }
        self.process_pending();
    }

    fn apply_update(&mut self, update: SurfaceUpdate) -> bool {
        let current = self.buffer.version();
        match update {
            SurfaceUpdate::Analysis {
                version,
                tokens,
                diagnostics,
            } => {
                if version != current {
                    tracing::debug!("Discarding stale analysis v{} (current v{})", version, current);
                    return false;
                }
                self.tokens = tokens;
                self.tokens_version = version;
                self.diagnostics = diagnostics;
                self.diagnostics_version = version;
                true
            }
            SurfaceUpdate::Completions {
                version,
                offset,
                generation,
                suggestions,
            } => {
                if version != current || offset != self.cursor {
                    tracing::debug!("Discarding completions for v{}@{}", version, offset);
                    return false;
                }
                self.autocomplete.resolve(generation, offset, suggestions)
            }
            SurfaceUpdate::Hover {
                version,
                generation,
                hover,
            } => {
                if version != current {
                    tracing::debug!("Discarding hover for v{} (current v{})", version, current);
                    return false;
                }
                self.hover.resolve(generation, hover)
            }
        }
    }
}

impl Drop for EditingSurface {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
