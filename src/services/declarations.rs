//! Ambient declaration bundles
//!
//! A bundle is a JSON array of `{ "path": ..., "code": ... }` entries that is
//! registered with the analysis backend before any buffer is analyzed, so
//! library types resolve in user snippets.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One ambient source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeclarationFile {
    pub path: String,
    pub code: String,
}

/// Where a declaration bundle comes from
#[async_trait]
pub trait DeclarationSource: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<Vec<DeclarationFile>>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// Bundle served over HTTP
#[derive(Debug, Clone)]
pub struct HttpDeclarationSource {
    url: String,
    timeout: Duration,
}

impl HttpDeclarationSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DeclarationSource for HttpDeclarationSource {
    async fn fetch(&self) -> anyhow::Result<Vec<DeclarationFile>> {
        let url = self.url.clone();
        let timeout = self.timeout;
        // ureq is blocking
        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<DeclarationFile>> {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();
            let response = agent
                .get(&url)
                .call()
                .with_context(|| format!("Failed to fetch declarations from {}", url))?;
            let files: Vec<DeclarationFile> =
                serde_json::from_reader(response.into_body().into_reader())
                    .with_context(|| format!("Invalid declaration bundle from {}", url))?;
            Ok(files)
        })
        .await
        .context("Declaration fetch task failed")?
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Bundle stored in a local JSON file
#[derive(Debug, Clone)]
pub struct FileDeclarationSource {
    path: PathBuf,
}

impl FileDeclarationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeclarationSource for FileDeclarationSource {
    async fn fetch(&self) -> anyhow::Result<Vec<DeclarationFile>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read declarations {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid declaration bundle {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Bundle already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeclarations {
    files: Vec<DeclarationFile>,
}

impl InMemoryDeclarations {
    pub fn new(files: Vec<DeclarationFile>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl DeclarationSource for InMemoryDeclarations {
    async fn fetch(&self) -> anyhow::Result<Vec<DeclarationFile>> {
        Ok(self.files.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory files", self.files.len())
    }
}

/// Pick a source for a configured location: `http(s)://` URLs are fetched,
/// anything else is read as a file path.
pub fn source_for_location(location: &str) -> Box<dyn DeclarationSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpDeclarationSource::new(location))
    } else {
        Box::new(FileDeclarationSource::new(location))
    }
}
