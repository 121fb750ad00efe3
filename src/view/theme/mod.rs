//! Theme module - color schemes and token styling
//!
//! This module is organized into two parts:
//!
//! - **`types`**: Pure theme types
//!   - `Theme` with resolved UI colours and TextMate scope rules
//!   - `ThemeFile` and related serde types for VS Code style JSON
//!   - Built-in themes: `dark()`, `light()`
//!
//! - **`loader`**: Theme loading from filesystem
//!   - `from_file()` - Load theme from JSON path
//!   - `load_builtin_theme()` - Scan themes directories
//!   - `from_name()` - Load by name (tries file first, then embedded)
//!
//! # Usage
//!
//! ```ignore
//! use livepad::view::theme::Theme;
//!
//! let theme = Theme::dark();
//! let keyword = theme.style_for_scopes(&["keyword", "storage.type"]);
//! let theme = Theme::load("~/themes/custom.json")?;
//! ```

mod loader;
mod types;

pub use types::{
    parse_font_style, parse_hex_color, ScopeSelector, Theme, ThemeFile, TokenColorRule,
    TokenSettings, TokenStyle,
};
