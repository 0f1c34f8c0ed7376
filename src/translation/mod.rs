//! Parsing of the `{call name(?,…)}` escape into parts a backend can re-render natively.

mod parsers;
mod scanner;

use parsers::strip_keyword;
use scanner::{State, step};

use crate::error::SprocError;

/// One argument of a call escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallArgument<'a> {
    /// A `?` marker; numbered from 1 in order of appearance.
    Placeholder(usize),
    /// Anything else, passed to the backend verbatim.
    Literal(&'a str),
}

/// A parsed `{call name(args)}` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEscape<'a> {
    /// The procedure name exactly as written (not validated).
    pub procedure: &'a str,
    pub arguments: Vec<CallArgument<'a>>,
}

impl CallEscape<'_> {
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.arguments
            .iter()
            .filter(|a| matches!(a, CallArgument::Placeholder(_)))
            .count()
    }
}

/// Parse a call escape. Braces are optional; the `call` keyword is not.
///
/// Commas and parentheses inside quoted strings, bracketed identifiers, and comments do not
/// split arguments.
///
/// # Errors
/// Returns `SprocError::ExecutionError` if the text is not a call escape.
pub fn parse_call_escape(sql: &str) -> Result<CallEscape<'_>, SprocError> {
    let trimmed = sql.trim();
    let inner = match (trimmed.strip_prefix('{'), trimmed.ends_with('}')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (Some(_), false) => return Err(malformed(sql, "unbalanced braces")),
        (None, _) => trimmed,
    };
    let rest = strip_keyword(inner.trim(), "call")
        .ok_or_else(|| malformed(sql, "expected the call keyword"))?
        .trim();

    let Some(open) = find_top_level(rest, b'(') else {
        return Ok(CallEscape {
            procedure: rest,
            arguments: Vec::new(),
        });
    };
    let procedure = rest[..open].trim();
    let args_text = rest[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| malformed(sql, "unterminated argument list"))?;

    let mut arguments = Vec::new();
    if args_text.trim().is_empty() {
        return Ok(CallEscape {
            procedure,
            arguments,
        });
    }

    let mut placeholders = 0;
    for piece in split_top_level(args_text)? {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(malformed(sql, "empty argument"));
        }
        if piece == "?" {
            placeholders += 1;
            arguments.push(CallArgument::Placeholder(placeholders));
        } else {
            arguments.push(CallArgument::Literal(piece));
        }
    }

    Ok(CallEscape {
        procedure,
        arguments,
    })
}

fn malformed(sql: &str, why: &str) -> SprocError {
    SprocError::ExecutionError(format!("malformed call statement ({why}): {sql}"))
}

fn find_top_level(text: &str, target: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut state = State::Normal;
    let mut idx = 0;
    while idx < bytes.len() {
        if state == State::Normal && bytes[idx] == target {
            return Some(idx);
        }
        let (next, skip) = step(state, bytes, idx);
        state = next;
        idx += 1 + skip;
    }
    None
}

fn split_top_level(text: &str) -> Result<Vec<&str>, SprocError> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut state = State::Normal;
    let mut depth: usize = 0;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if state == State::Normal {
            match bytes[idx] {
                b'(' => depth += 1,
                b')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| malformed(text, "unbalanced parentheses"))?;
                }
                b',' if depth == 0 => {
                    pieces.push(&text[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        let (next, skip) = step(state, bytes, idx);
        state = next;
        idx += 1 + skip;
    }

    if depth != 0 {
        return Err(malformed(text, "unbalanced parentheses"));
    }
    pieces.push(&text[start..]);
    Ok(pieces)
}
