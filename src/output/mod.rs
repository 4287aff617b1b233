//! Output formatting for annotations.
//!
//! - `render` - Source text with annotations spliced in, for terminals
//! - [`lsp`] - LSP-specific formatters (hover, inlay hints)

mod render;

pub mod lsp;

pub use render::render_inline;

// Re-export LSP formatters
pub use lsp::{find_annotation_at_position, format_hover, format_inlay_hints};
