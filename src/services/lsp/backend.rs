//! [`AnalysisBackend`] over a language server
//!
//! Virtual files are opened as documents under a workspace root and kept in
//! full-document sync. Offsets cross the boundary as character offsets and
//! are converted to UTF-16 positions here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lsp_types::{
    notification::{DidChangeTextDocument, DidOpenTextDocument},
    request::{Completion, HoverRequest},
    CompletionContext, CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse,
    CompletionTriggerKind, DiagnosticSeverity, DidChangeTextDocumentParams,
    DidOpenTextDocumentParams, HoverContents, HoverParams, InsertTextFormat, MarkedString,
    Position, TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem,
    TextDocumentPositionParams, Uri, VersionedTextDocumentIdentifier,
};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::client::LspClient;
use crate::config::LspServerConfig;
use crate::model::diagnostic::{Diagnostic, Severity};
use crate::primitives::language::Language;
use crate::primitives::position::{char_len, line_at, offset_to_row_column, row_column_to_offset};
use crate::services::analysis::{
    AnalysisBackend, CompletionOptions, CompletionSuggestion, QuickInfo,
};

/// An open document
#[derive(Debug, Clone)]
struct Document {
    uri: Uri,
    version: i32,
    text: String,
    /// Publish sequence when this version was sent
    since_seq: u64,
}

/// Language-server analysis backend
pub struct LspAnalysisBackend {
    client: LspClient,
    root: PathBuf,
    documents: Mutex<HashMap<String, Document>>,
    diagnostics_timeout: Duration,
}

impl std::fmt::Debug for LspAnalysisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LspAnalysisBackend")
            .field("root", &self.root)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Completion preferences understood by TypeScript servers. Language servers
/// take no per-request completion flags, so they go out once at startup.
fn completion_preferences(options: &CompletionOptions) -> Value {
    json!({
        "preferences": {
            "includeCompletionsForModuleExports": options.include_module_exports,
            "includeCompletionsWithSnippetText": options.include_snippets,
            "includeCompletionsWithInsertText": options.include_insert_text,
        }
    })
}

/// Merge `overlay` into `base`, recursing into objects
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

impl LspAnalysisBackend {
    /// Spawn and initialize the configured server
    pub async fn connect(config: &LspServerConfig) -> anyhow::Result<Self> {
        let client = LspClient::spawn(
            &config.command,
            &config.args,
            Duration::from_millis(config.request_timeout_ms),
        )?;
        let root = match &config.root_dir {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("No current directory")?,
        };
        Self::start(
            client,
            root,
            config.initialization_options.clone(),
            Duration::from_millis(config.diagnostics_timeout_ms),
        )
        .await
    }

    /// Initialize `client` and wrap it. User initialization options are
    /// layered over the completion preferences.
    pub async fn start(
        mut client: LspClient,
        root: PathBuf,
        initialization_options: Option<Value>,
        diagnostics_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut options = completion_preferences(&CompletionOptions::direct_members());
        if let Some(user) = initialization_options {
            merge_json(&mut options, user);
        }

        let root_uri = path_to_uri(&root).ok();
        client.initialize(root_uri, Some(options)).await?;

        Ok(Self {
            client,
            root,
            documents: Mutex::new(HashMap::new()),
            diagnostics_timeout,
        })
    }

    pub fn client(&self) -> &LspClient {
        &self.client
    }

    fn uri_for(&self, file_id: &str) -> anyhow::Result<Uri> {
        path_to_uri(&self.root.join(file_id))
    }

    async fn document(&self, file_id: &str) -> Option<Document> {
        self.documents.lock().await.get(file_id).cloned()
    }
}

fn path_to_uri(path: &Path) -> anyhow::Result<Uri> {
    let url = url::Url::from_file_path(path)
        .map_err(|_| anyhow!("Not an absolute path: {}", path.display()))?;
    url.as_str()
        .parse::<Uri>()
        .map_err(|e| anyhow!("Invalid URI {}: {:?}", url, e))
}

fn language_id_for(file_id: &str) -> String {
    Language::from_path(Path::new(file_id))
        .unwrap_or(Language::TypeScript)
        .lsp_language_id()
        .to_string()
}

/// LSP position (UTF-16 columns) of a character offset
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let (row, column) = offset_to_row_column(text, offset);
    let line = line_at(text, row).unwrap_or("");
    let character: usize = line.chars().take(column).map(char::len_utf16).sum();
    Position::new(row as u32, character as u32)
}

/// Character offset of an LSP position, clamped to the text
pub fn position_to_offset(text: &str, position: Position) -> usize {
    let row = position.line as usize;
    let Some(line) = line_at(text, row) else {
        return char_len(text);
    };
    let mut units = 0usize;
    let mut column = 0usize;
    for c in line.chars() {
        if units >= position.character as usize {
            break;
        }
        units += c.len_utf16();
        column += 1;
    }
    row_column_to_offset(text, row, column)
}

fn convert_severity(severity: Option<DiagnosticSeverity>) -> Severity {
    match severity {
        Some(DiagnosticSeverity::WARNING) => Severity::Warning,
        Some(DiagnosticSeverity::INFORMATION) => Severity::Message,
        Some(DiagnosticSeverity::HINT) => Severity::Suggestion,
        _ => Severity::Error,
    }
}

fn kind_name(kind: Option<CompletionItemKind>) -> &'static str {
    match kind {
        Some(CompletionItemKind::METHOD) => "method",
        Some(CompletionItemKind::FUNCTION) => "function",
        Some(CompletionItemKind::CONSTRUCTOR) => "constructor",
        Some(CompletionItemKind::FIELD) | Some(CompletionItemKind::PROPERTY) => "property",
        Some(CompletionItemKind::VARIABLE) => "var",
        Some(CompletionItemKind::CONSTANT) => "const",
        Some(CompletionItemKind::CLASS) => "class",
        Some(CompletionItemKind::INTERFACE) => "interface",
        Some(CompletionItemKind::MODULE) => "module",
        Some(CompletionItemKind::ENUM) => "enum",
        Some(CompletionItemKind::ENUM_MEMBER) => "enum member",
        Some(CompletionItemKind::KEYWORD) => "keyword",
        Some(CompletionItemKind::TYPE_PARAMETER) => "type parameter",
        Some(CompletionItemKind::STRUCT) => "type",
        _ => "text",
    }
}

/// Whether an item survives the completion flags
fn accepts(item: &CompletionItem, options: &CompletionOptions) -> bool {
    if !options.include_snippets
        && (item.kind == Some(CompletionItemKind::SNIPPET)
            || item.insert_text_format == Some(InsertTextFormat::SNIPPET))
    {
        return false;
    }
    // Auto-import entries carry the import edit
    if !options.include_module_exports
        && item
            .additional_text_edits
            .as_ref()
            .is_some_and(|edits| !edits.is_empty())
    {
        return false;
    }
    if !options.include_insert_text && item.insert_text.as_deref().is_some_and(|t| t != item.label) {
        return false;
    }
    true
}

/// Split hover markdown into the signature (first code block) and the
/// remaining prose
fn split_markdown(markdown: &str) -> (String, String) {
    let mut display = String::new();
    let mut documentation = String::new();
    let mut in_code = false;
    let mut seen_code = false;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(_)) if !seen_code => in_code = true,
            Event::End(TagEnd::CodeBlock) if in_code => {
                in_code = false;
                seen_code = true;
            }
            Event::Text(text) if in_code => display.push_str(&text),
            Event::Text(text) | Event::Code(text) => documentation.push_str(&text),
            Event::SoftBreak => documentation.push(' '),
            Event::HardBreak => documentation.push('\n'),
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::CodeBlock) => {
                documentation.push_str("\n\n")
            }
            _ => {}
        }
    }

    (
        display.trim_end().to_string(),
        documentation.trim().to_string(),
    )
}

fn hover_text(contents: HoverContents) -> (String, String) {
    match contents {
        HoverContents::Markup(markup) => split_markdown(&markup.value),
        HoverContents::Scalar(marked) => marked_to_parts(vec![marked]),
        HoverContents::Array(marked) => marked_to_parts(marked),
    }
}

fn marked_to_parts(marked: Vec<MarkedString>) -> (String, String) {
    let mut display = String::new();
    let mut documentation = Vec::new();
    for item in marked {
        match item {
            MarkedString::LanguageString(code) if display.is_empty() => display = code.value,
            MarkedString::LanguageString(code) => documentation.push(code.value),
            MarkedString::String(text) => documentation.push(split_markdown(&text).1),
        }
    }
    (display, documentation.join("\n\n"))
}

#[async_trait]
impl AnalysisBackend for LspAnalysisBackend {
    async fn register_or_update(&self, file_id: &str, text: &str) -> anyhow::Result<()> {
        let mut documents = self.documents.lock().await;
        let since_seq = self.client.publish_seq();

        match documents.get_mut(file_id) {
            Some(document) => {
                if document.text == text {
                    return Ok(());
                }
                document.version += 1;
                document.text = text.to_string();
                document.since_seq = since_seq;
                tracing::debug!("LSP: did_change for {} v{}", file_id, document.version);

                self.client
                    .notify::<DidChangeTextDocument>(DidChangeTextDocumentParams {
                        text_document: VersionedTextDocumentIdentifier {
                            uri: document.uri.clone(),
                            version: document.version,
                        },
                        content_changes: vec![TextDocumentContentChangeEvent {
                            range: None,
                            range_length: None,
                            text: text.to_string(),
                        }],
                    })
                    .await
            }
            None => {
                let uri = self.uri_for(file_id)?;
                tracing::debug!("LSP: did_open for {}", uri.as_str());

                self.client
                    .notify::<DidOpenTextDocument>(DidOpenTextDocumentParams {
                        text_document: TextDocumentItem {
                            uri: uri.clone(),
                            language_id: language_id_for(file_id),
                            version: 1,
                            text: text.to_string(),
                        },
                    })
                    .await?;
                documents.insert(
                    file_id.to_string(),
                    Document {
                        uri,
                        version: 1,
                        text: text.to_string(),
                        since_seq,
                    },
                );
                Ok(())
            }
        }
    }

    async fn diagnostics(&self, file_id: &str) -> anyhow::Result<Vec<Diagnostic>> {
        let Some(document) = self.document(file_id).await else {
            return Ok(Vec::new());
        };
        let published = self
            .client
            .wait_for_diagnostics(
                &document.uri,
                document.version,
                document.since_seq,
                self.diagnostics_timeout,
            )
            .await
            .unwrap_or_default();

        Ok(published
            .into_iter()
            .map(|d| Diagnostic {
                range: position_to_offset(&document.text, d.range.start)
                    ..position_to_offset(&document.text, d.range.end),
                severity: convert_severity(d.severity),
                message: d.message,
            })
            .collect())
    }

    async fn completions(
        &self,
        file_id: &str,
        offset: usize,
        options: &CompletionOptions,
    ) -> anyhow::Result<Option<Vec<CompletionSuggestion>>> {
        let Some(document) = self.document(file_id).await else {
            return Ok(None);
        };

        let previous = offset
            .checked_sub(1)
            .and_then(|i| document.text.chars().nth(i));
        let context = match options.trigger_character {
            Some(trigger) if previous == Some(trigger) => CompletionContext {
                trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
                trigger_character: Some(trigger.to_string()),
            },
            _ => CompletionContext {
                trigger_kind: CompletionTriggerKind::INVOKED,
                trigger_character: None,
            },
        };

        let params = CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier {
                    uri: document.uri.clone(),
                },
                position: offset_to_position(&document.text, offset),
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: Some(context),
        };

        let Some(response) = self.client.request::<Completion>(params).await? else {
            return Ok(None);
        };
        let mut items = match response {
            CompletionResponse::Array(items) => items,
            CompletionResponse::List(list) => list.items,
        };
        // Stable: equal sort keys keep server order
        items.sort_by(|a, b| {
            let a = a.sort_text.as_deref().unwrap_or(&a.label);
            let b = b.sort_text.as_deref().unwrap_or(&b.label);
            a.cmp(b)
        });

        Ok(Some(
            items
                .into_iter()
                .filter(|item| accepts(item, options))
                .map(|item| CompletionSuggestion::new(item.label, kind_name(item.kind)))
                .collect(),
        ))
    }

    async fn quick_info(&self, file_id: &str, offset: usize) -> anyhow::Result<Option<QuickInfo>> {
        let Some(document) = self.document(file_id).await else {
            return Ok(None);
        };

        let params = HoverParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier {
                    uri: document.uri.clone(),
                },
                position: offset_to_position(&document.text, offset),
            },
            work_done_progress_params: Default::default(),
        };

        let Some(hover) = self.client.request::<HoverRequest>(params).await? else {
            return Ok(None);
        };
        let (display, documentation) = hover_text(hover.contents);
        if display.is_empty() && documentation.is_empty() {
            return Ok(None);
        }
        let span = hover.range.map(|range| {
            position_to_offset(&document.text, range.start)..position_to_offset(&document.text, range.end)
        });

        Ok(Some(QuickInfo {
            display,
            documentation,
            span,
        }))
    }
}
