//! Syntax highlighting with tree-sitter
//!
//! # Design
//! - **Load once**: highlight configurations for the configured language set
//!   are compiled once per host and shared by every surface.
//! - **Whole-buffer tokenization**: every content change re-tokenizes the
//!   full text into ordered lines of [`Token`]s. Nothing is patched in place.
//! - **Theme resolution**: tree-sitter capture names map to TextMate scopes,
//!   which the [`Theme`] resolves to colours.
//! - **Graceful degradation**: unsupported languages and tokenizer errors
//!   render the raw text as one unstyled run per line.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tree_sitter_highlight::{HighlightConfiguration, HighlightEvent, Highlighter as TSHighlighter};

use crate::model::diagnostic::{Diagnostic, Severity};
use crate::model::token::{plain_lines, Token, TokenLine};
use crate::primitives::language::Language;
use crate::primitives::syntax::ts_language;
use crate::view::theme::{Theme, TokenStyle};

/// Capture names recognized in highlight queries
pub const HIGHLIGHT_NAMES: &[&str] = &[
    "attribute",
    "comment",
    "constant",
    "constant.builtin",
    "constructor",
    "embedded",
    "escape",
    "function",
    "function.builtin",
    "function.method",
    "keyword",
    "label",
    "module",
    "number",
    "operator",
    "property",
    "punctuation",
    "punctuation.bracket",
    "punctuation.delimiter",
    "punctuation.special",
    "string",
    "string.special",
    "tag",
    "type",
    "type.builtin",
    "variable",
    "variable.builtin",
    "variable.parameter",
];

/// TextMate scopes a capture resolves through, most specific first
pub fn capture_scopes(capture: &str) -> &'static [&'static str] {
    match capture {
        "attribute" => &["entity.other.attribute-name"],
        "comment" => &["comment"],
        "constant" => &["variable.other.constant", "constant"],
        "constant.builtin" => &["constant.language"],
        "constructor" => &["entity.name.class", "entity.name.type"],
        "embedded" => &["meta.embedded"],
        "escape" => &["constant.character.escape"],
        "function" => &["entity.name.function"],
        "function.builtin" => &["support.function", "entity.name.function"],
        "function.method" => &["entity.name.function.method", "entity.name.function"],
        "keyword" => &["keyword", "storage.type", "storage.modifier"],
        "label" => &["entity.name.label"],
        "module" => &["entity.name.namespace"],
        "number" => &["constant.numeric"],
        "operator" => &["keyword.operator"],
        "property" => &[
            "variable.other.property",
            "variable.other.object.property",
            "support.type.property-name",
        ],
        "punctuation" | "punctuation.bracket" | "punctuation.delimiter" => &["punctuation"],
        "punctuation.special" => &["punctuation.definition.template-expression", "punctuation"],
        "string" => &["string"],
        "string.special" => &["string.regexp", "string"],
        "tag" => &["entity.name.tag"],
        "type" => &["entity.name.type", "support.type"],
        "type.builtin" => &["support.type.primitive", "support.type"],
        "variable" => &["variable"],
        "variable.builtin" => &["variable.language"],
        "variable.parameter" => &["variable.parameter"],
        _ => &[],
    }
}

/// Built-in highlights query for a language
fn builtin_query(language: &Language) -> Option<String> {
    let query = match language {
        Language::JavaScript | Language::Jsx => tree_sitter_javascript::HIGHLIGHT_QUERY.to_string(),
        // TypeScript's query only covers TS-specific syntax; the JS query supplies the rest
        Language::TypeScript | Language::Tsx => format!(
            "{}\n{}",
            tree_sitter_typescript::HIGHLIGHTS_QUERY,
            tree_sitter_javascript::HIGHLIGHT_QUERY
        ),
        Language::Css => tree_sitter_css::HIGHLIGHTS_QUERY.to_string(),
        Language::Json => tree_sitter_json::HIGHLIGHTS_QUERY.to_string(),
        Language::ShellScript => tree_sitter_bash::HIGHLIGHT_QUERY.to_string(), // Note: singular, not plural
        Language::Html => tree_sitter_html::HIGHLIGHTS_QUERY.to_string(),
        Language::Python => tree_sitter_python::HIGHLIGHTS_QUERY.to_string(),
        Language::Rust => tree_sitter_rust::HIGHLIGHTS_QUERY.to_string(),
        Language::Other(_) => return None,
    };
    Some(query)
}

/// Read `<query_dir>/<language>/highlights.scm` if present
fn query_override(query_dir: Option<&Path>, language: &Language) -> Option<String> {
    let path = query_dir?.join(language.id()).join("highlights.scm");
    match std::fs::read_to_string(&path) {
        Ok(query) => {
            tracing::debug!("Using highlight query override {}", path.display());
            Some(query)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// Build the highlight configuration for a language
fn highlight_config(
    language: &Language,
    query_dir: Option<&Path>,
) -> Result<HighlightConfiguration, String> {
    let (Some(grammar), Some(builtin)) = (ts_language(language), builtin_query(language)) else {
        return Err(format!("No grammar for {}", language));
    };
    let query = query_override(query_dir, language).unwrap_or(builtin);

    let mut config = HighlightConfiguration::new(
        grammar,
        language.id(),
        &query,
        "", // injections query
        "", // locals query
    )
    .map_err(|e| format!("Failed to create {} highlight config: {e}", language))?;
    config.configure(HIGHLIGHT_NAMES);
    Ok(config)
}

/// Style per entry of [`HIGHLIGHT_NAMES`] under `theme`
fn resolve_styles(theme: &Theme) -> Vec<TokenStyle> {
    HIGHLIGHT_NAMES
        .iter()
        .map(|name| theme.style_for_scopes(capture_scopes(name)))
        .collect()
}

/// Themed tokenizer for a fixed language set
pub struct Highlighter {
    theme: Arc<Theme>,
    configs: HashMap<Language, HighlightConfiguration>,
    /// Resolved style per entry of [`HIGHLIGHT_NAMES`]
    styles: Vec<TokenStyle>,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("theme", &self.theme.name)
            .field("languages", &self.configs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Highlighter {
    /// Compile highlight configurations for `languages`.
    ///
    /// Languages without a grammar, or whose query fails to compile, are
    /// skipped with a warning and render as plain text.
    pub fn load(theme: Arc<Theme>, languages: &[Language], query_dir: Option<&Path>) -> Self {
        let mut configs = HashMap::new();
        for language in languages {
            if configs.contains_key(language) {
                continue;
            }
            match highlight_config(language, query_dir) {
                Ok(config) => {
                    configs.insert(language.clone(), config);
                }
                Err(e) => tracing::warn!("Highlighting disabled for {}: {}", language, e),
            }
        }
        tracing::debug!("Highlighter loaded for {} languages", configs.len());

        let styles = resolve_styles(&theme);

        Self {
            theme,
            configs,
            styles,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn supports(&self, language: &Language) -> bool {
        self.configs.contains_key(language)
    }

    /// Style resolved for a capture name
    pub fn style_for_capture(&self, capture: &str) -> TokenStyle {
        HIGHLIGHT_NAMES
            .iter()
            .position(|name| *name == capture)
            .and_then(|index| self.styles.get(index).copied())
            .unwrap_or_else(|| self.theme.default_style())
    }

    /// Tokenize `text` into ordered lines.
    ///
    /// `diagnostics` enrich analyzable languages with per-token error flags;
    /// they are ignored for every other language.
    pub fn highlight(
        &self,
        text: &str,
        language: &Language,
        diagnostics: Option<&[Diagnostic]>,
    ) -> Vec<TokenLine> {
        self.highlight_with_theme(text, language, diagnostics, &self.theme)
    }

    /// [`Highlighter::highlight`] under a theme other than the loaded one
    pub fn highlight_with_theme(
        &self,
        text: &str,
        language: &Language,
        diagnostics: Option<&[Diagnostic]>,
        theme: &Theme,
    ) -> Vec<TokenLine> {
        let resolved;
        let styles = if std::ptr::eq(theme, &*self.theme) {
            &self.styles
        } else {
            resolved = resolve_styles(theme);
            &resolved
        };
        let default_style = theme.default_style();

        let errors: Vec<&Diagnostic> = diagnostics
            .filter(|_| language.is_analyzable())
            .unwrap_or_default()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();

        let mut lines = match self.configs.get(language) {
            Some(config) => match tokenize(text, config, styles, default_style) {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!("Highlight error for {}: {}", language, e);
                    plain_lines(text, default_style)
                }
            },
            None => plain_lines(text, default_style),
        };

        if !errors.is_empty() {
            for token in lines.iter_mut().flatten() {
                let (start, end) = (token.offset, token.end());
                token.has_error = errors.iter().any(|d| d.overlaps(start, end));
            }
        }
        lines
    }
}

fn tokenize(
    text: &str,
    config: &HighlightConfiguration,
    styles: &[TokenStyle],
    default_style: TokenStyle,
) -> Result<Vec<TokenLine>, tree_sitter_highlight::Error> {
    let mut ts_highlighter = TSHighlighter::new();
    let highlights = ts_highlighter.highlight(
        config,
        text.as_bytes(),
        None,     // cancellation flag
        |_| None, // injection callback
    )?;

    let mut lines: Vec<TokenLine> = Vec::new();
    let mut line: TokenLine = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut offset = 0usize;

    for event in highlights {
        match event? {
            HighlightEvent::Source { start, end } => {
                let style = stack
                    .last()
                    .and_then(|index| styles.get(*index).copied())
                    .unwrap_or(default_style);
                let Some(source) = text.get(start..end) else {
                    continue;
                };
                for (i, piece) in source.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(std::mem::take(&mut line));
                        offset += 1;
                    }
                    if piece.is_empty() {
                        continue;
                    }
                    match line.last_mut() {
                        Some(last) if last.style() == style && last.end() == offset => {
                            last.content.push_str(piece);
                        }
                        _ => line.push(Token::new(piece, style, offset)),
                    }
                    offset += piece.chars().count();
                }
            }
            HighlightEvent::HighlightStart(highlight) => stack.push(highlight.0),
            HighlightEvent::HighlightEnd => {
                stack.pop();
            }
        }
    }
    lines.push(line);

    Ok(lines)
}
