//! Scripted analysis backend
//!
//! Knows one object, `foo`, with members `bar` (property) and `baz`
//! (method), and reports every `oops` as an undefined name.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use livepad::model::diagnostic::Diagnostic;
use livepad::services::analysis::{
    AnalysisBackend, CompletionOptions, CompletionSuggestion, QuickInfo,
};

pub const GLOBALS: &[&str] = &["foo", "fetch", "console"];

#[derive(Default)]
pub struct FakeBackend {
    files: Mutex<HashMap<String, String>>,
    registrations: Mutex<Vec<(String, String)>>,
    diagnostics_calls: AtomicUsize,
    /// Delay of the first diagnostics call
    first_diagnostics_delay: Option<Duration>,
    completion_calls: AtomicUsize,
    quick_info_calls: AtomicUsize,
    /// Completion and quick-info lookups fail
    failing_lookups: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_first_diagnostics(mut self, delay: Duration) -> Self {
        self.first_diagnostics_delay = Some(delay);
        self
    }

    pub fn with_failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    /// Every registration, in arrival order
    pub fn registrations(&self) -> Vec<(String, String)> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn text_of(&self, file_id: &str) -> Option<String> {
        self.files.lock().unwrap().get(file_id).cloned()
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn quick_info_calls(&self) -> usize {
        self.quick_info_calls.load(Ordering::SeqCst)
    }

    fn text(&self, file_id: &str) -> anyhow::Result<String> {
        self.text_of(file_id)
            .ok_or_else(|| anyhow::anyhow!("unknown file {}", file_id))
    }
}

/// Identifier around `offset`, as a char range
fn word_at(chars: &[char], offset: usize) -> Option<Range<usize>> {
    let is_word = |c: &char| c.is_ascii_alphanumeric() || *c == '_';
    if !chars.get(offset).is_some_and(is_word) {
        return None;
    }
    let start = chars[..offset].iter().rev().take_while(|c| is_word(c)).count();
    let end = chars[offset..].iter().take_while(|c| is_word(c)).count();
    Some(offset - start..offset + end)
}

#[async_trait]
impl AnalysisBackend for FakeBackend {
    async fn register_or_update(&self, file_id: &str, text: &str) -> anyhow::Result<()> {
        self.registrations
            .lock()
            .unwrap()
            .push((file_id.to_string(), text.to_string()));
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), text.to_string());
        Ok(())
    }

    async fn diagnostics(&self, file_id: &str) -> anyhow::Result<Vec<Diagnostic>> {
        let text = self.text(file_id)?;
        let call = self.diagnostics_calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(delay) = self.first_diagnostics_delay {
                tokio::time::sleep(delay).await;
            }
        }

        let chars: Vec<char> = text.chars().collect();
        let mut diagnostics = Vec::new();
        let mut i = 0;
        while i + 4 <= chars.len() {
            if chars[i..i + 4].iter().collect::<String>() == "oops" {
                diagnostics.push(Diagnostic::error(i..i + 4, "Cannot find name 'oops'."));
                i += 4;
            } else {
                i += 1;
            }
        }
        Ok(diagnostics)
    }

    async fn completions(
        &self,
        file_id: &str,
        offset: usize,
        options: &CompletionOptions,
    ) -> anyhow::Result<Option<Vec<CompletionSuggestion>>> {
        assert_eq!(options, &CompletionOptions::direct_members());
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_lookups {
            anyhow::bail!("completion service crashed");
        }

        let text = self.text(file_id)?;
        let before: String = text.chars().take(offset).collect();
        let prefix_len = before
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_alphabetic() || *c == '_')
            .count();
        let split = before.chars().count() - prefix_len;
        let head: String = before.chars().take(split).collect();
        let prefix: String = before.chars().skip(split).collect();

        if head.ends_with("foo.") {
            return Ok(Some(vec![
                CompletionSuggestion::new("bar", "property"),
                CompletionSuggestion::new("baz", "method"),
            ]));
        }
        if head.ends_with('.') {
            return Ok(None);
        }
        Ok(Some(
            GLOBALS
                .iter()
                .filter(|name| !prefix.is_empty() && name.starts_with(&prefix))
                .map(|name| CompletionSuggestion::new(*name, "variable"))
                .collect(),
        ))
    }

    async fn quick_info(&self, file_id: &str, offset: usize) -> anyhow::Result<Option<QuickInfo>> {
        self.quick_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_lookups {
            anyhow::bail!("quick info service crashed");
        }
        let text = self.text(file_id)?;
        let chars: Vec<char> = text.chars().collect();
        let Some(span) = word_at(&chars, offset) else {
            return Ok(None);
        };
        let word: String = chars[span.clone()].iter().collect();
        let info = match word.as_str() {
            "bar" => QuickInfo {
                display: "(property) bar: number".to_string(),
                documentation: "The bar.".to_string(),
                span: Some(span),
            },
            "foo" => QuickInfo {
                display: "const foo: { bar: number; baz(): void; }".to_string(),
                documentation: String::new(),
                span: Some(span),
            },
            _ => return Ok(None),
        };
        Ok(Some(info))
    }
}
