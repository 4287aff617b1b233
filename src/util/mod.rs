//! Shared text utilities for eval-overlay.

mod position;
pub mod syntax;

pub use position::{
    display_column, line_end, line_of, line_start, offset_to_position, position_to_offset,
};
pub use syntax::{form_end, preceding_form_start, skip_whitespace_backward};
