//! Collaborator seams: the editing surface, the evaluator and the result sink.

use super::types::{DisplayMode, DocumentId, Span, TextEdit};
use std::collections::HashMap;
use std::fmt::Display;

/// The visible portion of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// First visible line (zero-based).
    pub first_line: u32,
    /// Last visible line, inclusive.
    pub last_line: u32,
    /// Width in columns.
    pub width: usize,
    /// Long lines wrap instead of running off the right edge.
    pub soft_wrap: bool,
}

impl Viewport {
    pub fn new(first_line: u32, last_line: u32, width: usize) -> Self {
        Self {
            first_line,
            last_line,
            width,
            soft_wrap: false,
        }
    }

    pub fn with_soft_wrap(mut self, soft_wrap: bool) -> Self {
        self.soft_wrap = soft_wrap;
        self
    }

    pub fn shows_line(&self, line: u32) -> bool {
        self.first_line <= line && line <= self.last_line
    }
}

/// What the annotation manager needs from the host editor.
pub trait EditorSurface {
    /// Current text of a live document; `None` once it is closed or unknown.
    fn text(&self, doc: &DocumentId) -> Option<&str>;

    /// Cursor byte offset in the document.
    fn cursor(&self, doc: &DocumentId) -> Option<usize>;

    /// The viewport currently showing the document, if any.
    fn viewport(&self, doc: &DocumentId) -> Option<Viewport>;

    /// Whether a user command is executing right now.
    fn command_in_progress(&self) -> bool;

    fn display_mode(&self) -> DisplayMode {
        DisplayMode::Light
    }
}

/// Evaluates source text. Errors are reported to the caller untouched.
pub trait Evaluator {
    type Value: Display;
    type Error;

    fn evaluate(&mut self, source: &str) -> Result<Self::Value, Self::Error>;
}

/// Durable, always-visible channel for results (status line, log).
pub trait ResultSink {
    fn publish(&mut self, value: &str);
}

impl ResultSink for Vec<String> {
    fn publish(&mut self, value: &str) {
        self.push(value.to_string());
    }
}

#[derive(Debug, Clone)]
struct MemoryDocument {
    text: String,
    cursor: usize,
    viewport: Option<Viewport>,
}

/// An in-process editor surface holding documents as strings.
///
/// Backs the command-line host and drives tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    documents: HashMap<DocumentId, MemoryDocument>,
    in_command: bool,
    display_mode: DisplayMode,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document with the cursor at its end and no viewport.
    pub fn open(&mut self, doc: DocumentId, text: impl Into<String>) {
        let text = text.into();
        let cursor = text.len();
        self.documents.insert(
            doc,
            MemoryDocument {
                text,
                cursor,
                viewport: None,
            },
        );
    }

    pub fn close(&mut self, doc: &DocumentId) {
        self.documents.remove(doc);
    }

    pub fn set_cursor(&mut self, doc: &DocumentId, offset: usize) {
        if let Some(d) = self.documents.get_mut(doc) {
            d.cursor = offset.min(d.text.len());
        }
    }

    pub fn set_viewport(&mut self, doc: &DocumentId, viewport: Option<Viewport>) {
        if let Some(d) = self.documents.get_mut(doc) {
            d.viewport = viewport;
        }
    }

    /// Show the whole document in a viewport of `width` columns.
    pub fn show_all(&mut self, doc: &DocumentId, width: usize) {
        let lines = self
            .documents
            .get(doc)
            .map(|d| d.text.lines().count().max(1) as u32)
            .unwrap_or(1);
        self.set_viewport(doc, Some(Viewport::new(0, lines - 1, width)));
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    pub fn begin_command(&mut self) {
        self.in_command = true;
    }

    pub fn end_command(&mut self) {
        self.in_command = false;
    }

    /// Replace `span` with `replacement`, returning the edit to forward to
    /// the annotation manager.
    pub fn edit(&mut self, doc: &DocumentId, span: Span, replacement: &str) -> Option<TextEdit> {
        let d = self.documents.get_mut(doc)?;
        if span.end > d.text.len()
            || !d.text.is_char_boundary(span.start)
            || !d.text.is_char_boundary(span.end)
        {
            return None;
        }
        d.text.replace_range(span.start..span.end, replacement);
        let edit = TextEdit::replacement(span, replacement.len());
        d.cursor = edit.shift(d.cursor).min(d.text.len());
        Some(edit)
    }
}

impl EditorSurface for MemorySurface {
    fn text(&self, doc: &DocumentId) -> Option<&str> {
        self.documents.get(doc).map(|d| d.text.as_str())
    }

    fn cursor(&self, doc: &DocumentId) -> Option<usize> {
        self.documents.get(doc).map(|d| d.cursor)
    }

    fn viewport(&self, doc: &DocumentId) -> Option<Viewport> {
        self.documents.get(doc).and_then(|d| d.viewport)
    }

    fn command_in_progress(&self) -> bool {
        self.in_command
    }

    fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }
}
