//! Hover information for annotated spans.

use crate::overlay::Annotation;
use crate::util::{offset_to_position, position_to_offset};
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

/// Format an annotation as hover information showing the full value.
///
/// The inline text may be truncated; the hover never is.
pub fn format_hover(annotation: &Annotation, document: &str) -> Hover {
    let content = format!(
        "**{}**\n\n```\n{}\n```",
        annotation.category, annotation.value_text
    );

    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: content,
        }),
        range: Some(Range {
            start: offset_to_position(document, annotation.span.start),
            end: offset_to_position(document, annotation.span.end),
        }),
    }
}

/// Find the most recent annotation whose span contains `position`.
pub fn find_annotation_at_position<'a>(
    annotations: &'a [Annotation],
    document: &str,
    position: Position,
) -> Option<&'a Annotation> {
    let offset = position_to_offset(document, position);
    annotations
        .iter()
        .rev()
        .find(|ann| ann.span.contains(offset))
}
