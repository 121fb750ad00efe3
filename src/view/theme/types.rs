//! Pure theme types
//!
//! Themes use the VS Code JSON layout: a flat `colors` table for UI surfaces
//! and a list of `tokenColors` rules keyed by TextMate scope selectors.

use std::collections::HashMap;

use ratatui::style::{Color, Modifier};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const DARK_THEME_JSON: &str = include_str!("../../../themes/dark.json");
const LIGHT_THEME_JSON: &str = include_str!("../../../themes/light.json");

/// Serializable theme definition (matches JSON structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ThemeFile {
    #[serde(default)]
    pub name: Option<String>,
    /// "dark" or "light"
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default, rename = "tokenColors")]
    pub token_colors: Vec<TokenColorRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TokenColorRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeSelector>,
    #[serde(default)]
    pub settings: TokenSettings,
}

/// A scope selector is either a comma separated string or a list
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ScopeSelector {
    One(String),
    Many(Vec<String>),
}

impl ScopeSelector {
    fn scopes(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ScopeSelector::One(s) => s.split(',').collect(),
            ScopeSelector::Many(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TokenSettings {
    #[serde(default)]
    pub foreground: Option<String>,
    #[serde(default, rename = "fontStyle")]
    pub font_style: Option<String>,
}

/// Resolved style of one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenStyle {
    pub color: Color,
    pub font_style: Modifier,
}

#[derive(Debug, Clone)]
struct ScopeRule {
    scope: String,
    color: Option<Color>,
    font_style: Option<Modifier>,
}

/// Resolved theme: UI colours plus scope rules
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color,
    pub foreground: Color,
    pub cursor: Color,
    pub hover_background: Color,
    pub hover_border: Color,
    pub selection_background: Color,
    pub error_foreground: Color,
    rules: Vec<ScopeRule>,
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (alpha is dropped)
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 16 + v;
            }
            Some(Color::Rgb(rgb[0], rgb[1], rgb[2]))
        }
        6 | 8 => Some(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

/// Map a `fontStyle` string ("italic bold", "underline", "") to modifiers
pub fn parse_font_style(value: &str) -> Modifier {
    value
        .split_whitespace()
        .fold(Modifier::empty(), |acc, part| match part {
            "italic" => acc | Modifier::ITALIC,
            "bold" => acc | Modifier::BOLD,
            "underline" => acc | Modifier::UNDERLINED,
            "strikethrough" => acc | Modifier::CROSSED_OUT,
            _ => acc,
        })
}

/// `selector` matches `scope` when it equals it or is a dot-segment prefix
fn selector_matches(selector: &str, scope: &str) -> bool {
    scope == selector
        || (scope.starts_with(selector) && scope.as_bytes().get(selector.len()) == Some(&b'.'))
}

impl From<ThemeFile> for Theme {
    fn from(file: ThemeFile) -> Self {
        let is_light = file.kind.as_deref() == Some("light");
        let fallback = |dark: Color, light: Color| if is_light { light } else { dark };
        let color = |key: &str, default: Color| {
            file.colors
                .get(key)
                .and_then(|v| parse_hex_color(v))
                .unwrap_or(default)
        };

        let background = color(
            "editor.background",
            fallback(Color::Rgb(30, 30, 30), Color::Rgb(255, 255, 255)),
        );
        let foreground = color(
            "editor.foreground",
            fallback(Color::Rgb(212, 212, 212), Color::Rgb(0, 0, 0)),
        );
        let cursor = color("editorCursor.foreground", foreground);
        let hover_background = color("editorHoverWidget.background", background);
        let hover_border = color("editorHoverWidget.border", foreground);
        let selection_background = color("list.activeSelectionBackground", Color::Rgb(0, 134, 255));
        let error_foreground = color("editorError.foreground", Color::Rgb(241, 76, 76));

        let mut rules = Vec::new();
        for rule in &file.token_colors {
            let color = rule.settings.foreground.as_deref().and_then(parse_hex_color);
            let font_style = rule.settings.font_style.as_deref().map(parse_font_style);
            if let Some(selector) = &rule.scope {
                for scope in selector.scopes() {
                    rules.push(ScopeRule {
                        scope,
                        color,
                        font_style,
                    });
                }
            }
        }

        Self {
            name: file.name.unwrap_or_else(|| "custom".to_string()),
            background,
            foreground,
            cursor,
            hover_background,
            hover_border,
            selection_background,
            error_foreground,
            rules,
        }
    }
}

impl Theme {
    /// Style of plain, unclassified text
    pub fn default_style(&self) -> TokenStyle {
        TokenStyle {
            color: self.foreground,
            font_style: Modifier::empty(),
        }
    }

    /// Resolve a scope list (most specific preference first).
    ///
    /// For each candidate scope the rule with the longest matching selector
    /// wins; the first candidate that any rule matches decides. Later rules
    /// override earlier ones on equal selector length.
    pub fn style_for_scopes(&self, scopes: &[&str]) -> TokenStyle {
        let mut style = self.default_style();
        for scope in scopes {
            let mut best: Option<&ScopeRule> = None;
            for rule in &self.rules {
                if !selector_matches(&rule.scope, scope) {
                    continue;
                }
                if best.map_or(true, |b| rule.scope.len() >= b.scope.len()) {
                    best = Some(rule);
                }
            }
            if let Some(rule) = best {
                if let Some(color) = rule.color {
                    style.color = color;
                }
                if let Some(font_style) = rule.font_style {
                    style.font_style = font_style;
                }
                return style;
            }
        }
        style
    }

    /// Parse a theme from JSON text
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: ThemeFile = serde_json::from_str(json)?;
        Ok(file.into())
    }

    /// Built-in dark theme
    pub fn dark() -> Self {
        Self::embedded(DARK_THEME_JSON, "dark")
    }

    /// Built-in light theme
    pub fn light() -> Self {
        Self::embedded(LIGHT_THEME_JSON, "light")
    }

    fn embedded(json: &str, name: &str) -> Self {
        match Self::from_json(json) {
            Ok(mut theme) => {
                theme.name = name.to_string();
                theme
            }
            Err(e) => {
                tracing::error!("Embedded theme {} failed to parse: {}", name, e);
                ThemeFile {
                    name: Some(name.to_string()),
                    kind: Some(name.to_string()),
                    ..Default::default()
                }
                .into()
            }
        }
    }

    /// Get a built-in theme by name, defaults to dark if not found
    pub fn from_name_embedded(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Names of the built-in themes
    pub fn embedded_themes() -> Vec<String> {
        vec!["dark".to_string(), "light".to_string()]
    }
}
