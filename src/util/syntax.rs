//! S-expression lexing and form navigation.
//!
//! Used to find the syntactic unit an annotation attaches to and to read
//! source text for the bundled evaluator.

use thiserror::Error;

/// A lexical token with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// `(`, `[` or `{`
    Open(char),
    /// `)`, `]` or `}`
    Close(char),
    /// `'` prefix, attaches to the following form.
    Quote,
    /// String literal with escapes resolved.
    Str(String),
    /// Anything else: numbers, symbols, keywords.
    Atom(&'a str),
}

/// Error produced while lexing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '\'')
}

/// Split `source` into tokens, skipping whitespace and `;` comments.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            ';' => {
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' | '[' | '{' => tokens.push(Token {
                kind: TokenKind::Open(c),
                start,
                end: start + 1,
            }),
            ')' | ']' | '}' => tokens.push(Token {
                kind: TokenKind::Close(c),
                start,
                end: start + 1,
            }),
            '\'' => tokens.push(Token {
                kind: TokenKind::Quote,
                start,
                end: start + 1,
            }),
            '"' => {
                let mut value = String::new();
                let mut end = None;
                while let Some((idx, c)) = chars.next() {
                    match c {
                        '"' => {
                            end = Some(idx + 1);
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, other)) => value.push(other),
                            None => break,
                        },
                        other => value.push(other),
                    }
                }
                let end = end.ok_or(LexError::UnterminatedString(start))?;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    start,
                    end,
                });
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, c)) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    end = idx + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Atom(&source[start..end]),
                    start,
                    end,
                });
            }
        }
    }

    Ok(tokens)
}

/// Skip whitespace (including newlines) backward from `offset`.
pub fn skip_whitespace_backward(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[..offset]
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0)
}

/// Start of the form that ends at `offset`, scanning only `text[..offset]`.
///
/// Returns `None` when nothing complete precedes `offset` at the current
/// nesting depth (e.g. right after an open paren) or the text cannot be lexed.
pub fn preceding_form_start(text: &str, offset: usize) -> Option<usize> {
    let offset = offset.min(text.len());
    if !text.is_char_boundary(offset) {
        return None;
    }
    let tokens = tokenize(&text[..offset]).ok()?;

    // Open-paren starts, each paired with the quote prefix in front of it.
    let mut stack: Vec<usize> = Vec::new();
    let mut last: Option<usize> = None;
    let mut quote: Option<usize> = None;

    for token in &tokens {
        let form_start = quote.take().unwrap_or(token.start);
        match token.kind {
            TokenKind::Quote => {
                quote = Some(form_start);
                last = None;
            }
            TokenKind::Open(_) => {
                stack.push(form_start);
                last = None;
            }
            TokenKind::Close(_) => last = stack.pop(),
            TokenKind::Str(_) | TokenKind::Atom(_) => last = Some(form_start),
        }
    }

    // A dangling quote prefix has no form to attach to.
    if quote.is_some() {
        return None;
    }
    last
}

/// End of the first form starting at or after `offset`.
pub fn form_end(text: &str, offset: usize) -> Option<usize> {
    let offset = offset.min(text.len());
    if !text.is_char_boundary(offset) {
        return None;
    }
    let tokens = tokenize(&text[offset..]).ok()?;
    let mut depth = 0usize;

    for token in &tokens {
        match token.kind {
            TokenKind::Quote => continue,
            TokenKind::Open(_) => depth += 1,
            TokenKind::Close(_) => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            TokenKind::Str(_) | TokenKind::Atom(_) => {}
        }
        if depth == 0 {
            return Some(offset + token.end);
        }
    }
    None
}
