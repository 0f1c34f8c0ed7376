#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

/// Advance the lexical state by one byte. Returns the new state and how many extra bytes
/// were consumed (escaped quotes, two-byte comment markers).
pub(super) fn step(state: State, bytes: &[u8], idx: usize) -> (State, usize) {
    use super::parsers::{is_block_comment_end, is_block_comment_start, is_line_comment_start};

    let b = bytes[idx];
    match state {
        State::Normal => match b {
            b'\'' => (State::SingleQuoted, 0),
            b'"' => (State::DoubleQuoted, 0),
            b'[' => (State::Bracketed, 0),
            _ if is_line_comment_start(bytes, idx) => (State::LineComment, 1),
            _ if is_block_comment_start(bytes, idx) => (State::BlockComment(1), 1),
            _ => (State::Normal, 0),
        },
        State::SingleQuoted => closing_quote(bytes, idx, b'\'', State::SingleQuoted),
        State::DoubleQuoted => closing_quote(bytes, idx, b'"', State::DoubleQuoted),
        State::Bracketed => closing_quote(bytes, idx, b']', State::Bracketed),
        State::LineComment => {
            if b == b'\n' {
                (State::Normal, 0)
            } else {
                (State::LineComment, 0)
            }
        }
        State::BlockComment(depth) => {
            if is_block_comment_start(bytes, idx) {
                (State::BlockComment(depth + 1), 1)
            } else if is_block_comment_end(bytes, idx) {
                if depth == 1 {
                    (State::Normal, 1)
                } else {
                    (State::BlockComment(depth - 1), 1)
                }
            } else {
                (state, 0)
            }
        }
    }
}

fn closing_quote(bytes: &[u8], idx: usize, quote: u8, current: State) -> (State, usize) {
    if bytes[idx] != quote {
        return (current, 0);
    }
    if bytes.get(idx + 1) == Some(&quote) {
        // doubled quote is an escape
        (current, 1)
    } else {
        (State::Normal, 0)
    }
}
