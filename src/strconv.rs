//! Quote/unquote codec for string-literal tokens.
//!
//! Native parsers hand over string literals in their raw, quoted spelling while
//! canonical trees store the decoded text. Decoding accepts the escape table
//! below; encoding always emits one canonical spelling per character.
//!
//! | Escape                          | Decodes to                               |
//! |---------------------------------|------------------------------------------|
//! | `\a \b \f \n \r \t \v`          | U+0007 U+0008 U+000C U+000A U+000D U+0009 U+000B |
//! | `\\` `\'` `\"`                  | the escaped character                    |
//! | `\0` not followed by a digit    | U+0000                                   |
//! | `\ooo` (three octal digits)     | code point `0o000..=0o377`               |
//! | `\xHH`                          | code point U+00HH                        |
//! | `\uHHHH`, `\UHHHHHHHH`          | that code point                          |
//!
//! Encoding backslash-escapes the quote and the backslash, keeps printable
//! characters, and spells everything else as the shortest of
//! `\a \b \f \n \r \t \v`, `\xHH` (below U+0020), `\uHHHH`, `\UHHHHHHHH`.
//!
//! `quote(unquote(s))` is not always `s`: `'\0'` decodes to NUL and NUL is
//! spelled `'\x00'`. Octal escapes collapse to hex the same way.
//! `\xHH` decodes to a code point, so `'\xff'` comes back as `'ÿ'`.

use thiserror::Error;
use unicode_general_category::{get_general_category, GeneralCategory};

const LOWER_HEX: &[u8; 16] = b"0123456789abcdef";

/// Errors produced while decoding a quoted literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    #[error("{raw:?} is not a quoted string")]
    NotQuoted { raw: String },
    #[error("{raw:?} does not begin and end with the same quote")]
    MismatchedQuotes { raw: String },
    #[error("{raw:?} contains an unescaped line terminator")]
    LineTerminator { raw: String },
    #[error("{raw:?} contains an unescaped {quote} quote")]
    UnescapedQuote { raw: String, quote: char },
    #[error("invalid escape sequence at byte {offset} of {raw:?}")]
    InvalidEscape { raw: String, offset: usize },
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Decodes a literal quoted with `quote`.
///
/// # Examples
///
/// ```rust
/// use arbor::strconv::unquote;
/// assert_eq!(unquote(r"'a\tb'", '\'').unwrap(), "a\tb");
/// assert_eq!(unquote(r"'\0'", '\'').unwrap(), "\u{0}");
/// assert!(unquote("'a\"", '\'').is_err());
/// ```
pub fn unquote(raw: &str, quote: char) -> Result<String, EscapeError> {
    let body = strip_quotes(raw, quote)?;
    decode_body(raw, body, quote)
}

/// Decodes a literal whose quote character is taken from its first character.
pub fn unquote_detect(raw: &str) -> Result<String, EscapeError> {
    match raw.chars().next() {
        Some(quote @ ('\'' | '"')) => unquote(raw, quote),
        _ => Err(EscapeError::NotQuoted {
            raw: raw.to_string(),
        }),
    }
}

/// Decodes a single-quoted literal.
pub fn unquote_single(raw: &str) -> Result<String, EscapeError> {
    unquote(raw, '\'')
}

/// Encodes `decoded` as a literal quoted with `quote`.
///
/// # Examples
///
/// ```rust
/// use arbor::strconv::quote;
/// assert_eq!(quote("it's", '\''), r"'it\'s'");
/// assert_eq!(quote("\u{0}", '\''), r"'\x00'");
/// assert_eq!(quote("\u{7f}", '"'), r#""\u007f""#);
/// ```
pub fn quote(decoded: &str, quote: char) -> String {
    let mut out = String::with_capacity(decoded.len() + 2);
    out.push(quote);
    for c in decoded.chars() {
        push_escaped(&mut out, c, quote);
    }
    out.push(quote);
    out
}

/// Encodes `decoded` as a single-quoted literal.
pub fn quote_single(decoded: &str) -> String {
    quote(decoded, '\'')
}

// ============================================================================
// DECODING
// ============================================================================

fn strip_quotes(raw: &str, quote: char) -> Result<&str, EscapeError> {
    let q = quote.len_utf8();
    if raw.len() < 2 * q {
        return Err(EscapeError::NotQuoted {
            raw: raw.to_string(),
        });
    }
    if !raw.starts_with(quote) {
        return Err(EscapeError::NotQuoted {
            raw: raw.to_string(),
        });
    }
    if !raw.ends_with(quote) {
        return Err(EscapeError::MismatchedQuotes {
            raw: raw.to_string(),
        });
    }
    Ok(&raw[q..raw.len() - q])
}

fn decode_body(raw: &str, body: &str, quote: char) -> Result<String, EscapeError> {
    if body.contains(['\n', '\r']) {
        return Err(EscapeError::LineTerminator {
            raw: raw.to_string(),
        });
    }
    if !body.contains('\\') && !body.contains(quote) {
        return Ok(body.to_string());
    }

    // Offsets in errors are relative to `raw`, past the opening quote.
    let base = quote.len_utf8();
    let invalid = |at: usize| EscapeError::InvalidEscape {
        raw: raw.to_string(),
        offset: base + at,
    };

    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        if c == quote {
            return Err(EscapeError::UnescapedQuote {
                raw: raw.to_string(),
                quote,
            });
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, kind)) = chars.next() else {
            return Err(invalid(at));
        };
        let decoded = match kind {
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{b}',
            '\\' | '\'' | '"' => kind,
            '0' if !matches!(chars.peek(), Some((_, d)) if d.is_ascii_digit()) => '\0',
            '0'..='7' => {
                let digits = take_ascii(bytes, at + 1, 3).ok_or_else(|| invalid(at))?;
                let value = u32::from_str_radix(digits, 8).map_err(|_| invalid(at))?;
                if value > 0o377 {
                    return Err(invalid(at));
                }
                skip(&mut chars, 2);
                char::from_u32(value).ok_or_else(|| invalid(at))?
            }
            'x' | 'u' | 'U' => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits = take_ascii(bytes, at + 2, width).ok_or_else(|| invalid(at))?;
                if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(invalid(at));
                }
                let value = u32::from_str_radix(digits, 16).map_err(|_| invalid(at))?;
                skip(&mut chars, width);
                char::from_u32(value).ok_or_else(|| invalid(at))?
            }
            _ => return Err(invalid(at)),
        };
        out.push(decoded);
    }
    Ok(out)
}

/// Returns `len` ASCII bytes of `bytes` starting at `from`, if all are present.
fn take_ascii(bytes: &[u8], from: usize, len: usize) -> Option<&str> {
    let slice = bytes.get(from..from + len)?;
    if !slice.is_ascii() {
        return None;
    }
    std::str::from_utf8(slice).ok()
}

fn skip<I: Iterator>(iter: &mut I, n: usize) {
    for _ in 0..n {
        iter.next();
    }
}

// ============================================================================
// ENCODING
// ============================================================================

fn push_escaped(out: &mut String, c: char, quote: char) {
    if c == quote || c == '\\' {
        out.push('\\');
        out.push(c);
        return;
    }
    if is_print(c) {
        out.push(c);
        return;
    }
    match c {
        '\u{7}' => out.push_str("\\a"),
        '\u{8}' => out.push_str("\\b"),
        '\u{c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{b}' => out.push_str("\\v"),
        c if (c as u32) < 0x20 => push_hex(out, "\\x", c as u32, 2),
        c if (c as u32) < 0x10000 => push_hex(out, "\\u", c as u32, 4),
        c => push_hex(out, "\\U", c as u32, 8),
    }
}

fn push_hex(out: &mut String, prefix: &str, value: u32, digits: u32) {
    out.push_str(prefix);
    for shift in (0..digits).rev() {
        let nibble = (value >> (shift * 4)) & 0xF;
        out.push(LOWER_HEX[nibble as usize] as char);
    }
}

/// Reports whether `c` is printed verbatim: letters, marks, numbers,
/// punctuation, symbols and the ASCII space.
pub fn is_print(c: char) -> bool {
    use GeneralCategory::*;
    if c == ' ' {
        return true;
    }
    !matches!(
        get_general_category(c),
        SpaceSeparator
            | LineSeparator
            | ParagraphSeparator
            | Control
            | Format
            | Surrogate
            | PrivateUse
            | Unassigned
    )
}
