//! eval-overlay: inline evaluation results for editors
//!
//! This library shows the value of an evaluated expression right next to
//! the code that produced it, as a transient annotation that disappears on
//! the next command, after a delay, or when its text is edited.

pub mod eval;
pub mod lsp;
pub mod output;
pub mod overlay;
pub mod util;

pub use eval::{evaluate_and_annotate, Evaluation, SexpEvaluator};
pub use overlay::{
    Annotation, AnnotationManager, AnnotationOptions, Category, DocumentId, EditorSurface,
    Location, OverlayConfig, RemovalPolicy, Span, TextEdit,
};
pub use util::{offset_to_position, position_to_offset};
