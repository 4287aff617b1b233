//! Core data types for inline result annotations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Identifies a document known to the editor surface (a URI or buffer name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for an annotation, never reused within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

/// A byte range in a document. `start == end` is a zero-width point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a span, swapping the bounds if they are reversed.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn point(offset: usize) -> Self {
        Self { start: offset, end: offset }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two spans share any position.
    ///
    /// Non-empty spans must share at least one byte; a zero-width span
    /// overlaps anything that contains it, boundaries included.
    pub fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            self.start <= other.end && other.start <= self.end
        } else {
            self.start < other.end && other.start < self.end
        }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Grouping tag used to find and mutually exclude related annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category(String);

impl Category {
    /// Category used for evaluation results.
    pub const RESULT: &'static str = "result";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::new(Self::RESULT)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When an annotation is automatically destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RemovalPolicySetting")]
pub enum RemovalPolicy {
    /// Only explicit removal, a same-category replacement or an edit removes it.
    Never,
    /// Removed by a one-shot timer after the duration elapses.
    AfterDuration(Duration),
    /// Removed when the next user command starts in the owning document.
    #[default]
    BeforeNextCommand,
}

/// Serialized form of [`RemovalPolicy`]: `{"kind": "afterDuration", "seconds": 2.5}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum RemovalPolicySetting {
    Never,
    AfterDuration { seconds: f64 },
    BeforeNextCommand,
}

impl TryFrom<RemovalPolicySetting> for RemovalPolicy {
    type Error = PolicyParseError;

    fn try_from(setting: RemovalPolicySetting) -> Result<Self, Self::Error> {
        match setting {
            RemovalPolicySetting::Never => Ok(Self::Never),
            RemovalPolicySetting::AfterDuration { seconds } => delay_from_secs(seconds)
                .map(Self::AfterDuration)
                .ok_or_else(|| PolicyParseError(format!("{} seconds", seconds))),
            RemovalPolicySetting::BeforeNextCommand => Ok(Self::BeforeNextCommand),
        }
    }
}

/// Non-negative delay no longer than [`MAX_DELAY`].
fn delay_from_secs(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|delay| *delay <= MAX_DELAY)
}

/// Longest accepted timed-removal delay, one year.
pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Error parsing a removal policy from its command-line form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid removal policy '{0}'; expected: never, command, or up to a year in seconds")]
pub struct PolicyParseError(String);

impl FromStr for RemovalPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "command" | "next-command" | "before-next-command" => Ok(Self::BeforeNextCommand),
            other => other
                .strip_suffix('s')
                .unwrap_or(other)
                .parse::<f64>()
                .ok()
                .and_then(delay_from_secs)
                .map(Self::AfterDuration)
                .ok_or_else(|| PolicyParseError(s.to_string())),
        }
    }
}

/// Light or dark display, selects which configured face applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    #[default]
    Light,
    Dark,
}

/// Visual attributes of an annotation box.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    pub background: Option<String>,
    pub border: Option<String>,
}

impl Face {
    pub fn new(background: &str, border: &str) -> Self {
        Self {
            background: Some(background.to_string()),
            border: Some(border.to_string()),
        }
    }
}

/// How the face combines with the rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleLayer {
    /// Text is syntax-colored; the face sits underneath the highlighting.
    BelowSyntax,
    /// The whole string gets the face uniformly.
    Uniform,
}

/// Resolved styling of a placed annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub face: Face,
    pub layer: StyleLayer,
    /// Pass-through attributes the host interprets (e.g. `"italic": "true"`).
    pub extra: BTreeMap<String, String>,
}

/// A transient, rendered attachment to a document span.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub document: DocumentId,
    pub span: Span,
    /// What the host renders after the span.
    pub display_text: String,
    /// The value's full display form, before templating and truncation.
    pub value_text: String,
    pub category: Category,
    pub removal_policy: RemovalPolicy,
    pub style: AnnotationStyle,
    /// Character index in `display_text` where cursor motion should land.
    pub cursor_hint: usize,
}

impl Annotation {
    /// Whether the display text was pushed onto its own line.
    pub fn is_wrapped(&self) -> bool {
        self.display_text.starts_with('\n')
    }
}

/// A text change reported by the editor surface, in pre-edit byte offsets.
///
/// `start..old_end` was replaced by text now occupying `start..new_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl TextEdit {
    pub fn insertion(at: usize, len: usize) -> Self {
        Self { start: at, old_end: at, new_end: at + len }
    }

    pub fn deletion(span: Span) -> Self {
        Self { start: span.start, old_end: span.end, new_end: span.start }
    }

    pub fn replacement(span: Span, new_len: usize) -> Self {
        Self { start: span.start, old_end: span.end, new_end: span.start + new_len }
    }

    /// Signed change in document length.
    pub fn delta(&self) -> i64 {
        self.new_end as i64 - self.old_end as i64
    }

    /// Whether this edit modifies text inside `span`.
    ///
    /// Insertions exactly at a span boundary do not touch it.
    pub fn touches(&self, span: &Span) -> bool {
        if self.start == self.old_end {
            span.start < self.start && self.start < span.end
        } else {
            self.start < span.end && span.start < self.old_end
        }
    }

    /// Map a pre-edit offset to its post-edit position.
    ///
    /// Offsets inside a replaced range collapse to the end of the new text.
    pub fn shift(&self, offset: usize) -> usize {
        if offset <= self.start {
            offset
        } else if offset >= self.old_end {
            (offset as i64).saturating_add(self.delta()).max(0) as usize
        } else {
            self.new_end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_overlap() {
        let a = Span::new(0, 5);
        assert!(a.overlaps(&Span::new(4, 8)));
        assert!(!a.overlaps(&Span::new(5, 8)));
        assert!(a.overlaps(&Span::point(5)));
        assert!(Span::point(3).overlaps(&Span::point(3)));
        assert!(!Span::point(3).overlaps(&Span::point(4)));
        assert_eq!(Span::new(7, 2), Span { start: 2, end: 7 });
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("never".parse::<RemovalPolicy>(), Ok(RemovalPolicy::Never));
        assert_eq!("command".parse::<RemovalPolicy>(), Ok(RemovalPolicy::BeforeNextCommand));
        assert_eq!(
            "2.5s".parse::<RemovalPolicy>(),
            Ok(RemovalPolicy::AfterDuration(Duration::from_millis(2500)))
        );
        assert_eq!(
            "10".parse::<RemovalPolicy>(),
            Ok(RemovalPolicy::AfterDuration(Duration::from_secs(10)))
        );
        assert!("soon".parse::<RemovalPolicy>().is_err());
        assert!("-1".parse::<RemovalPolicy>().is_err());
    }

    #[test]
    fn test_policy_from_str_rejects_huge_delays() {
        assert!("1e30".parse::<RemovalPolicy>().is_err());
        assert!("inf".parse::<RemovalPolicy>().is_err());
        assert!("31536001".parse::<RemovalPolicy>().is_err());
        assert_eq!(
            "31536000".parse::<RemovalPolicy>(),
            Ok(RemovalPolicy::AfterDuration(MAX_DELAY))
        );
    }

    #[test]
    fn test_policy_deserialize() {
        let p: RemovalPolicy =
            serde_json::from_str(r#"{"kind": "afterDuration", "seconds": 3}"#).unwrap();
        assert_eq!(p, RemovalPolicy::AfterDuration(Duration::from_secs(3)));
        let p: RemovalPolicy = serde_json::from_str(r#"{"kind": "never"}"#).unwrap();
        assert_eq!(p, RemovalPolicy::Never);
    }

    #[test]
    fn test_policy_deserialize_rejects_out_of_range_seconds() {
        for seconds in ["1e300", "-1", "31536001"] {
            let json = format!(r#"{{"kind": "afterDuration", "seconds": {}}}"#, seconds);
            assert!(serde_json::from_str::<RemovalPolicy>(&json).is_err(), "{}", seconds);
        }
    }

    #[test]
    fn test_edit_touches() {
        let span = Span::new(10, 20);
        assert!(TextEdit::replacement(Span::new(15, 16), 3).touches(&span));
        assert!(TextEdit::deletion(Span::new(5, 11)).touches(&span));
        assert!(!TextEdit::deletion(Span::new(5, 10)).touches(&span));
        assert!(TextEdit::insertion(12, 1).touches(&span));
        assert!(!TextEdit::insertion(10, 1).touches(&span));
        assert!(!TextEdit::insertion(20, 1).touches(&span));
    }

    #[test]
    fn test_edit_shift() {
        let ins = TextEdit::insertion(5, 3);
        assert_eq!(ins.shift(2), 2);
        assert_eq!(ins.shift(5), 5);
        assert_eq!(ins.shift(9), 12);

        let del = TextEdit::deletion(Span::new(2, 6));
        assert_eq!(del.shift(1), 1);
        assert_eq!(del.shift(10), 6);
    }
}
