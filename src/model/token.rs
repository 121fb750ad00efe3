use ratatui::style::{Color, Modifier};

use crate::view::theme::TokenStyle;

/// A styled contiguous run of source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub content: String,
    pub color: Color,
    pub font_style: Modifier,
    /// Overlaps an error diagnostic (rendered with an error underline)
    pub has_error: bool,
    /// Character offset of the first character in the buffer
    pub offset: usize,
}

/// Tokens of one line, in order
pub type TokenLine = Vec<Token>;

impl Token {
    pub fn new(content: impl Into<String>, style: TokenStyle, offset: usize) -> Self {
        Self {
            content: content.into(),
            color: style.color,
            font_style: style.font_style,
            has_error: false,
            offset,
        }
    }

    pub fn style(&self) -> TokenStyle {
        TokenStyle {
            color: self.color,
            font_style: self.font_style,
        }
    }

    /// Offset one past the last character
    pub fn end(&self) -> usize {
        self.offset + self.content.chars().count()
    }
}

/// Render `text` as one unstyled run per line (empty lines carry no token)
pub fn plain_lines(text: &str, style: TokenStyle) -> Vec<TokenLine> {
    let mut offset = 0;
    text.split('\n')
        .map(|line| {
            let len = line.chars().count();
            let tokens = if line.is_empty() {
                Vec::new()
            } else {
                vec![Token::new(line, style, offset)]
            };
            offset += len + 1;
            tokens
        })
        .collect()
}

/// Concatenated text of token lines (inverse of tokenization)
pub fn lines_text(lines: &[TokenLine]) -> String {
    lines
        .iter()
        .map(|line| line.iter().map(|t| t.content.as_str()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
