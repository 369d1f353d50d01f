//! Character classes used by the reader, scanner and emitter.
//!
//! The predicates take `impl Into<Option<char>>` so that lookahead past the
//! end of the stream (`None`) can be tested with the same calls.

pub(crate) fn is_alpha(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some('0'..='9' | 'A'..='Z' | 'a'..='z' | '_' | '-'))
}

pub(crate) fn is_digit(ch: impl Into<Option<char>>) -> bool {
    ch.into().map_or(false, |ch| ch.is_ascii_digit())
}

pub(crate) fn is_hex(ch: impl Into<Option<char>>) -> bool {
    ch.into().map_or(false, |ch| ch.is_ascii_hexdigit())
}

pub(crate) fn as_hex(ch: char) -> u32 {
    ch.to_digit(16).unwrap_or(0)
}

pub(crate) fn is_ascii(ch: char) -> bool {
    ch.is_ascii()
}

/// Characters that may appear unescaped in YAML output.
pub(crate) fn is_printable(ch: char) -> bool {
    match ch {
        '\u{feff}' | '\u{fffe}' | '\u{ffff}' => false,
        '\x0a'
        | '\x20'..='\x7e'
        | '\u{00a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}' => true,
        _ => false,
    }
}

/// Characters the reader accepts in the input stream (YAML 1.2 c-printable
/// plus tab and the line breaks).
pub(crate) fn is_allowed_input(ch: char) -> bool {
    matches!(ch, '\x09' | '\x0a' | '\x0d' | '\u{0085}') || is_printable(ch)
}

pub(crate) fn is_bom(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\u{feff}')
}

pub(crate) fn is_space(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some(' ')
}

pub(crate) fn is_tab(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\t')
}

pub(crate) fn is_blank(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some(' ' | '\t'))
}

pub(crate) fn is_blankz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_blank(ch) || is_breakz(ch)
}

/// YAML 1.2 line breaks. NEL, LS and PS are ordinary content characters.
pub(crate) fn is_break(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some('\r' | '\n'))
}

pub(crate) fn is_breakz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    ch.is_none() || is_break(ch)
}

pub(crate) fn is_flow_indicator(ch: impl Into<Option<char>>) -> bool {
    matches!(ch.into(), Some(',' | '[' | ']' | '{' | '}'))
}

/// Characters allowed in a tag URI, besides `%` escapes.
pub(crate) fn is_uri_char(ch: impl Into<Option<char>>, verbatim: bool) -> bool {
    let ch = ch.into();
    if is_alpha(ch) {
        return true;
    }
    match ch {
        Some(';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | '.' | '%' | '!' | '~' | '*'
        | '\'' | '(' | ')') => true,
        Some(',' | '[' | ']') => verbatim,
        _ => false,
    }
}
