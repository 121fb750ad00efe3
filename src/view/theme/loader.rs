//! Theme loading from filesystem
//!
//! For pure theme types and built-in themes, see the `types` module.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::{Theme, ThemeFile};

impl Theme {
    /// Load theme from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme file {}", path.display()))?;
        let theme_file: ThemeFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse theme file {}", path.display()))?;
        let mut theme: Theme = theme_file.into();
        if theme.name == "custom" {
            if let Some(stem) = path.file_stem() {
                theme.name = stem.to_string_lossy().to_string();
            }
        }
        Ok(theme)
    }

    /// Directory holding user themes (`<config>/livepad/themes`)
    pub fn user_themes_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("livepad").join("themes"))
    }

    /// Load a named theme from the themes directories
    pub fn load_builtin_theme(name: &str) -> Option<Self> {
        // Build list of paths to search
        let mut theme_paths = vec![
            PathBuf::from(format!("themes/{}.json", name)),
            PathBuf::from(format!("../themes/{}.json", name)),
        ];

        // User themes take precedence
        if let Some(dir) = Self::user_themes_dir() {
            theme_paths.insert(0, dir.join(format!("{}.json", name)));
        }

        theme_paths
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::from_file(path) {
                Ok(theme) => Some(theme),
                Err(e) => {
                    tracing::warn!("Skipping theme {}: {:#}", path.display(), e);
                    None
                }
            })
    }

    /// Get a theme by name, defaults to dark if not found
    ///
    /// Tries to load from JSON file first, falls back to embedded themes.
    pub fn from_name(name: &str) -> Self {
        let normalized_name = name.to_lowercase().replace('_', "-");

        if let Some(theme) = Self::load_builtin_theme(&normalized_name) {
            return theme;
        }

        Self::from_name_embedded(&normalized_name)
    }

    /// Resolve a theme reference: a path to a `.json` file, or a theme name
    pub fn load(reference: &str) -> anyhow::Result<Self> {
        let path = Path::new(reference);
        if path.extension().is_some_and(|ext| ext == "json") {
            return Self::from_file(path);
        }
        Ok(Self::from_name(reference))
    }
}
