//! Text position utilities: byte offsets, line/column positions and line bounds.

use lsp_types::Position;
use unicode_width::UnicodeWidthChar;

/// Convert a byte offset to a line/column position.
///
/// Columns count UTF-16 code units, the LSP default encoding. Offsets past
/// the end of the text resolve to the end of the text.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 0;
    let mut col = 0;

    for (idx, ch) in text.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += ch.len_utf16() as u32;
        }
    }

    Position {
        line,
        character: col,
    }
}

/// Convert a line/column position to a byte offset.
///
/// Columns are UTF-16 code units; a column inside a surrogate pair resolves
/// to the start of that character. A column past the end of its line
/// resolves to the end of that line, and a line past the end of the text
/// resolves to the end of the text.
pub fn position_to_offset(text: &str, position: Position) -> usize {
    let mut current_line = 0;
    let mut current_col = 0;

    for (idx, ch) in text.char_indices() {
        if current_line == position.line {
            let next_col = current_col + ch.len_utf16() as u32;
            if ch == '\n' || next_col > position.character {
                return idx;
            }
            current_col = next_col;
        } else if ch == '\n' {
            current_line += 1;
        }
    }

    text.len()
}

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Byte offset of the end of the line containing `offset` (before its newline).
pub fn line_end(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len())
}

/// Zero-based line number containing `offset`.
pub fn line_of(text: &str, offset: usize) -> u32 {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() as u32
}

/// Display column of `offset` within its line, counting wide characters twice.
pub fn display_column(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[line_start(text, offset)..offset]
        .chars()
        .map(|c| c.width().unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_position_simple() {
        let text = "hello\nworld";
        assert_eq!(offset_to_position(text, 0), Position { line: 0, character: 0 });
        assert_eq!(offset_to_position(text, 5), Position { line: 0, character: 5 });
        assert_eq!(offset_to_position(text, 6), Position { line: 1, character: 0 });
        assert_eq!(offset_to_position(text, 11), Position { line: 1, character: 5 });
    }

    #[test]
    fn test_position_to_offset_simple() {
        let text = "hello\nworld";
        assert_eq!(position_to_offset(text, Position { line: 0, character: 0 }), 0);
        assert_eq!(position_to_offset(text, Position { line: 0, character: 5 }), 5);
        assert_eq!(position_to_offset(text, Position { line: 1, character: 0 }), 6);
        assert_eq!(position_to_offset(text, Position { line: 1, character: 5 }), 11);
    }

    #[test]
    fn test_position_past_line_end_clamps() {
        let text = "ab\ncd";
        assert_eq!(position_to_offset(text, Position { line: 0, character: 40 }), 2);
        assert_eq!(position_to_offset(text, Position { line: 9, character: 0 }), 5);
    }

    #[test]
    fn test_roundtrip() {
        let text = "(defn f [x]\n  (+ x 1))\n(f 2)";
        for offset in 0..text.len() {
            let pos = offset_to_position(text, offset);
            let back = position_to_offset(text, pos);
            assert_eq!(back, offset, "roundtrip failed for offset {}", offset);
        }
    }

    #[test]
    fn test_columns_are_utf16_code_units() {
        // U+1F600 takes two UTF-16 code units and four bytes.
        let text = "(str \"\u{1F600}\" 1)\n(+ 1 2)";
        let after_emoji = "(str \"\u{1F600}".len();
        assert_eq!(offset_to_position(text, after_emoji), Position { line: 0, character: 8 });
        assert_eq!(position_to_offset(text, Position { line: 0, character: 8 }), after_emoji);
        let newline = text.find('\n').unwrap();
        assert_eq!(position_to_offset(text, Position { line: 0, character: 12 }), newline);
        // Inside the surrogate pair resolves to the character start.
        assert_eq!(position_to_offset(text, Position { line: 0, character: 7 }), 6);
        assert_eq!(position_to_offset(text, Position { line: 1, character: 3 }), text.len() - 4);
    }

    #[test]
    fn test_line_bounds() {
        let text = "(+ 1 2)\n(* 3 4)\n";
        assert_eq!(line_start(text, 10), 8);
        assert_eq!(line_end(text, 10), 15);
        assert_eq!(line_end(text, 0), 7);
        assert_eq!(line_of(text, 10), 1);
        assert_eq!(line_of(text, 0), 0);
    }

    #[test]
    fn test_display_column_counts_wide_chars() {
        let text = "x\n漢字 y";
        assert_eq!(display_column(text, text.len()), 6);
        assert_eq!(display_column(text, 1), 1);
    }
}
