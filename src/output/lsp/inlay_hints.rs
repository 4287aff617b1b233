//! Inlay hint generation from annotations.

use crate::overlay::Annotation;
use crate::util::offset_to_position;
use lsp_types::{InlayHint, InlayHintLabel, InlayHintTooltip, MarkupContent, MarkupKind, Range};

/// Collapse multi-line display text onto one line; hints cannot break lines.
fn hint_label(annotation: &Annotation) -> String {
    annotation
        .display_text
        .trim_start_matches('\n')
        .lines()
        .collect::<Vec<_>>()
        .join(" ⏎ ")
}

/// Format annotations whose anchor falls inside `range` as LSP inlay hints.
pub fn format_inlay_hints(
    annotations: &[Annotation],
    document: &str,
    range: Range,
) -> Vec<InlayHint> {
    annotations
        .iter()
        .filter_map(|annotation| {
            let position = offset_to_position(document, annotation.span.end);
            if position.line < range.start.line || position.line > range.end.line {
                return None;
            }

            Some(InlayHint {
                position,
                label: InlayHintLabel::String(hint_label(annotation)),
                kind: None,
                text_edits: None,
                tooltip: Some(InlayHintTooltip::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: format!("```\n{}\n```", annotation.value_text),
                })),
                padding_left: None,
                padding_right: None,
                data: None,
            })
        })
        .collect()
}
