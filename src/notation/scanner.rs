//! Hand-written scanner for reference tokens.
//!
//! Grammar: `${` key `,` ws* `tooltip:` sourceType `-` refType `:` value `}` where
//! key, sourceType and refType are `[A-Za-z0-9_]+`, ws is any Unicode whitespace and
//! value is one or more bytes other than `}`. All delimiters are ASCII, so every
//! slice boundary falls on a UTF-8 character boundary.

use super::types::{NotationRef, ParsedSegment};

pub(crate) const OPEN: &str = "${";
const TOOLTIP: &[u8] = b"tooltip:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    AfterComma,
    Literal(usize),
    SourceType,
    RefType,
    Value,
}

#[inline]
pub(crate) fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Attempts to read one token starting at byte `start`, which must point at `${`.
/// Returns the reference and the byte offset just past the closing `}`.
pub(crate) fn match_token(text: &str, start: usize) -> Option<(NotationRef, usize)> {
    let bytes = text.as_bytes();
    if !text[start..].starts_with(OPEN) {
        return None;
    }

    let mut state = State::Key;
    let mut field_start = start + OPEN.len();
    let mut key = (0, 0);
    let mut source_type = (0, 0);
    let mut ref_type = (0, 0);

    let mut pos = field_start;
    while pos < bytes.len() {
        let b = bytes[pos];
        if state == State::AfterComma && !b.is_ascii() {
            match text[pos..].chars().next() {
                Some(c) if c.is_whitespace() => {
                    pos += c.len_utf8();
                    continue;
                }
                _ => return None,
            }
        }
        state = match state {
            State::Key if is_word(b) => State::Key,
            State::Key if b == b',' && pos > field_start => {
                key = (field_start, pos);
                State::AfterComma
            }
            State::AfterComma if char::from(b).is_whitespace() => State::AfterComma,
            State::AfterComma | State::Literal(_) => {
                let k = match state {
                    State::Literal(k) => k,
                    _ => 0,
                };
                if b != TOOLTIP[k] {
                    return None;
                }
                if k + 1 == TOOLTIP.len() {
                    field_start = pos + 1;
                    State::SourceType
                } else {
                    State::Literal(k + 1)
                }
            }
            State::SourceType if is_word(b) => State::SourceType,
            State::SourceType if b == b'-' && pos > field_start => {
                source_type = (field_start, pos);
                field_start = pos + 1;
                State::RefType
            }
            State::RefType if is_word(b) => State::RefType,
            State::RefType if b == b':' && pos > field_start => {
                ref_type = (field_start, pos);
                field_start = pos + 1;
                State::Value
            }
            State::Value if b == b'}' => {
                if pos == field_start {
                    return None;
                }
                let reference = NotationRef {
                    value_key: text[key.0..key.1].to_string(),
                    source_type: text[source_type.0..source_type.1].to_string(),
                    ref_type: text[ref_type.0..ref_type.1].to_string(),
                    ref_value: text[field_start..pos].to_string(),
                };
                return Some((reference, pos + 1));
            }
            State::Value => State::Value,
            _ => return None,
        };
        pos += 1;
    }
    None
}

/// Splits `text` into ordered, gap-free segments. A `${` that does not begin a
/// well-formed token is treated as literal text.
pub(crate) fn scan(text: &str) -> Vec<ParsedSegment> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(OPEN) {
        let at = cursor + offset;
        match match_token(text, at) {
            Some((reference, end)) => {
                if at > text_start {
                    segments.push(ParsedSegment::text(&text[text_start..at]));
                }
                segments.push(ParsedSegment::reference(&text[at..end], reference));
                text_start = end;
                cursor = end;
            }
            // `$` is one byte; resume inside the failed opener.
            None => cursor = at + 1,
        }
    }

    if text_start < text.len() {
        segments.push(ParsedSegment::text(&text[text_start..]));
    }
    segments
}
