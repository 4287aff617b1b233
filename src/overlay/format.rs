//! Display-string formatting: templating, width measurement, truncation and wrapping.

use serde::Deserialize;
use thiserror::Error;
use unicode_width::UnicodeWidthChar;

/// Appended to display text cut at the length cap.
pub const TRUNCATION_MARKER: &str = "...\nResult truncated.";

/// Multiple of the viewport width beyond which display text is truncated.
pub const MAX_WIDTH_FACTOR: usize = 3;

const SLOT: &str = "{}";

/// Error building a [`DisplayFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("display format {template:?} must contain exactly one `{{}}` slot, found {found}")]
    SlotCount { template: String, found: usize },
}

/// A template with exactly one `{}` slot for the value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct DisplayFormat(String);

impl DisplayFormat {
    pub fn new(template: impl Into<String>) -> Result<Self, FormatError> {
        let template = template.into();
        let found = template.matches(SLOT).count();
        if found != 1 {
            return Err(FormatError::SlotCount { template, found });
        }
        Ok(Self(template))
    }

    /// The default template for a result prefix: `" => {} "` for `"=> "`.
    pub fn with_prefix(prefix: &str) -> Self {
        // Braces in the prefix would add slots; they are not a valid prefix.
        let prefix = prefix.replace(SLOT, "");
        Self(format!(" {}{} ", prefix, SLOT))
    }

    /// Substitute `value` into the slot.
    pub fn render(&self, value: &str) -> String {
        self.0.replacen(SLOT, value, 1)
    }
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self::with_prefix(super::config::DEFAULT_RESULT_PREFIX)
    }
}

impl TryFrom<String> for DisplayFormat {
    type Error = FormatError;

    fn try_from(template: String) -> Result<Self, Self::Error> {
        Self::new(template)
    }
}

fn char_width(c: char) -> usize {
    if c == '\n' {
        0
    } else {
        c.width().unwrap_or(0)
    }
}

/// Rendered width of `text` in columns; line breaks count as zero.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Width of the widest line of `text`.
pub fn max_line_width(text: &str) -> usize {
    text.split('\n').map(display_width).max().unwrap_or(0)
}

/// Cut `text` to at most `limit` columns and append [`TRUNCATION_MARKER`].
///
/// Text within the limit is returned unchanged.
pub fn truncate(text: String, limit: usize) -> String {
    if display_width(&text) <= limit {
        return text;
    }

    let mut width = 0;
    let mut cut = text.len();
    for (idx, c) in text.char_indices() {
        let w = char_width(c);
        if width + w > limit {
            cut = idx;
            break;
        }
        width += w;
    }

    let mut truncated = text;
    truncated.truncate(cut);
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Prefix `text` with a line break when it is multi-line or wider than `remaining`.
pub fn wrap(text: String, remaining: usize) -> String {
    if text.contains('\n') || display_width(&text) > remaining {
        format!("\n{}", text)
    } else {
        text
    }
}

/// Full display pipeline for one value.
///
/// `viewport_width` bounds the length cap and `column` is where the text
/// starts on the anchor line.
pub fn layout(format: &DisplayFormat, value: &str, viewport_width: usize, column: usize) -> String {
    let text = format.render(value);
    let text = truncate(text, viewport_width.saturating_mul(MAX_WIDTH_FACTOR));
    wrap(text, viewport_width.saturating_sub(column))
}
