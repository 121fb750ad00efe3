use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::primitives::language::{Language, DEFAULT_LANGUAGES};

/// Options of one editing surface
///
/// The content-change callback is attached programmatically
/// (`EditingSurface::on_change`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EditorOptions {
    /// Initial content of an uncontrolled surface
    #[serde(default)]
    pub default_value: Option<String>,

    /// Controlled content; overrides `default_value` when present
    #[serde(default)]
    pub value: Option<String>,

    /// Virtual file identifier (auto-generated when absent)
    #[serde(default)]
    pub filename: Option<String>,

    /// Source language id; aliases such as "bash"/"shell" are normalized
    #[serde(default)]
    pub language: Option<String>,

    /// Theme name or path to a theme JSON file (defaults to the host theme)
    #[serde(default)]
    pub theme: Option<String>,
}

impl EditorOptions {
    pub fn is_controlled(&self) -> bool {
        self.value.is_some()
    }

    /// Content the surface starts with
    pub fn initial_text(&self) -> &str {
        self.value
            .as_deref()
            .or(self.default_value.as_deref())
            .unwrap_or("")
    }
}

/// Process-wide host configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HostConfig {
    /// Theme name ("dark", "light", a user theme) or path to a theme JSON file
    #[serde(default = "default_theme_name")]
    pub theme: String,

    /// Languages the tokenizer is loaded for
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    #[serde(default)]
    pub asset_paths: AssetPaths,

    /// Declaration bundle location: an http(s) URL or a file path
    #[serde(default)]
    pub declarations: Option<String>,

    /// Language server providing analysis
    #[serde(default)]
    pub lsp: Option<LspServerConfig>,

    #[serde(default)]
    pub surface: SurfaceConfig,
}

fn default_theme_name() -> String {
    "dark".to_string()
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|l| l.id().to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_diagnostics_timeout_ms() -> u64 {
    2_000
}

fn default_scroll_offset() -> usize {
    3
}

/// Optional asset directories
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AssetPaths {
    /// Directory of `<language>/highlights.scm` query overrides
    #[serde(default)]
    pub queries: Option<PathBuf>,
}

/// Surface behavior
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SurfaceConfig {
    /// Lines kept visible between the caret and the viewport edge
    #[serde(default = "default_scroll_offset")]
    pub scroll_offset: usize,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            scroll_offset: default_scroll_offset(),
        }
    }
}

/// LSP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LspServerConfig {
    /// Command to spawn the server
    pub command: String,

    /// Arguments to pass to the server
    #[serde(default)]
    pub args: Vec<String>,

    /// Whether the server is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Workspace root virtual files are placed under (defaults to the current directory)
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// Timeout for completion and hover requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long to wait for diagnostics of a registered version
    #[serde(default = "default_diagnostics_timeout_ms")]
    pub diagnostics_timeout_ms: u64,

    /// Custom initialization options to send to the server
    /// These are merged into the `initializationOptions` field of the LSP Initialize request
    #[serde(default)]
    pub initialization_options: Option<serde_json::Value>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            theme: default_theme_name(),
            languages: default_languages(),
            asset_paths: AssetPaths::default(),
            declarations: None,
            lsp: None,
            surface: SurfaceConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: HostConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Default config file location (`<config>/livepad/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("livepad").join("config.json"))
    }

    /// Load the user config if one exists, defaults otherwise
    pub fn load() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Normalized language set
    pub fn language_set(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = Vec::new();
        for id in &self.languages {
            let language = Language::from_id(id);
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        languages
    }

    /// JSON schema of the config file
    pub fn json_schema() -> anyhow::Result<String> {
        let schema = schemars::schema_for!(HostConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}
