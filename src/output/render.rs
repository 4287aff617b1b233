//! Plain-text rendering of a document with its annotations shown inline.

use crate::overlay::Annotation;
use std::cmp::Reverse;

/// Insert each annotation's display text right after its span.
///
/// Wrapped annotations start with a line break and land on their own line.
pub fn render_inline(source: &str, annotations: &[Annotation]) -> String {
    let mut ordered: Vec<&Annotation> = annotations.iter().collect();
    ordered.sort_by_key(|a| Reverse(a.span.end));

    let mut out = source.to_string();
    for annotation in ordered {
        let at = annotation.span.end;
        if at <= out.len() && out.is_char_boundary(at) {
            out.insert_str(at, &annotation.display_text);
        }
    }
    out
}
