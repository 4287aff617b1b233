//! Inline result annotations.
//!
//! The [`AnnotationManager`] places an annotation showing a value next to the
//! code that produced it, keeps annotations of one category exclusive per
//! span, and removes them when their text is edited, when a timer fires, or
//! at the next command boundary.
//!
//! # Module Structure
//!
//! - `types` - Spans, categories, removal policies, the [`Annotation`] record
//! - `format` - Display templates, truncation and line-wrap rules
//! - `config` - [`OverlayConfig`] defaults and per-call [`AnnotationOptions`]
//! - `host` - Collaborator traits ([`EditorSurface`], [`Evaluator`], [`ResultSink`])
//! - `schedule` - Pending command hooks and removal timers
//! - `manager` - The [`AnnotationManager`] itself
//!
//! # Removal
//!
//! | Policy | Removed when |
//! |--------|--------------|
//! | `Never` | explicitly, replaced, or its text is edited |
//! | `AfterDuration` | the host calls `fire_due_timers` past the deadline |
//! | `BeforeNextCommand` | the host calls `pre_command` for the document |

mod config;
pub mod format;
mod host;
mod manager;
mod schedule;
mod types;

pub use config::{
    AnnotationOptions, OverlayConfig, ThemedFace, DEFAULT_FALLBACK_WIDTH, DEFAULT_RESULT_PREFIX,
};
pub use format::{DisplayFormat, FormatError, TRUNCATION_MARKER};
pub use host::{EditorSurface, Evaluator, MemorySurface, ResultSink, Viewport};
pub use manager::{AnnotationManager, Location};
pub use schedule::{CommandHooks, TimerQueue};
pub use types::{
    Annotation, AnnotationId, AnnotationStyle, Category, DisplayMode, DocumentId, Face,
    PolicyParseError, RemovalPolicy, Span, StyleLayer, TextEdit, MAX_DELAY,
};
