//! Character data: charset validation and JSON escaping

use std::borrow::Cow;
use std::fmt::Write;

use crate::error::{PkReadError, Result};
use crate::schema::Charset;

/// Whether trailing pad spaces are part of the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Fixed-length CHAR: trailing spaces are padding
    Trim,
    /// Variable-length: keep every byte
    Keep,
}

fn invalid_byte(raw: &[u8], position: usize, charset: Charset) -> PkReadError {
    PkReadError::InvalidEncoding(format!(
        "byte \\x{:02X} at position {} is not valid {:?}",
        raw[position], position, charset
    ))
}

/// Validate `raw` under `charset` and return it as UTF-8 text
pub fn decode_charset(raw: &[u8], charset: Charset) -> Result<Cow<'_, str>> {
    match charset {
        Charset::Utf8mb4 | Charset::Utf8mb3 | Charset::Binary => std::str::from_utf8(raw)
            .map(Cow::Borrowed)
            .map_err(|e| invalid_byte(raw, e.valid_up_to(), charset)),
        Charset::Ascii => match raw.iter().position(|b| !b.is_ascii()) {
            Some(position) => Err(invalid_byte(raw, position, charset)),
            // ASCII is valid UTF-8
            None => Ok(Cow::Borrowed(std::str::from_utf8(raw).unwrap_or_default())),
        },
        Charset::Latin1 => {
            if raw.is_ascii() {
                Ok(Cow::Borrowed(std::str::from_utf8(raw).unwrap_or_default()))
            } else {
                Ok(Cow::Owned(raw.iter().map(|&b| char::from(b)).collect()))
            }
        }
    }
}

fn invalid_char(c: char, position: usize, charset: Charset) -> PkReadError {
    PkReadError::InvalidEncoding(format!(
        "character {:?} at position {} has no {:?} encoding",
        c, position, charset
    ))
}

/// Convert UTF-8 wire text into the bytes stored under `charset`
pub fn encode_charset(text: &[u8], charset: Charset) -> Result<Cow<'_, [u8]>> {
    let utf8 =
        std::str::from_utf8(text).map_err(|e| invalid_byte(text, e.valid_up_to(), charset))?;
    if utf8.is_ascii() {
        return Ok(Cow::Borrowed(text));
    }

    match charset {
        Charset::Utf8mb4 | Charset::Binary => Ok(Cow::Borrowed(text)),
        // three bytes per character at most
        Charset::Utf8mb3 => match utf8.char_indices().find(|(_, c)| c.len_utf8() > 3) {
            Some((position, c)) => Err(invalid_char(c, position, charset)),
            None => Ok(Cow::Borrowed(text)),
        },
        Charset::Ascii => match utf8.char_indices().find(|(_, c)| !c.is_ascii()) {
            Some((position, c)) => Err(invalid_char(c, position, charset)),
            None => Ok(Cow::Borrowed(text)),
        },
        Charset::Latin1 => utf8
            .char_indices()
            .map(|(position, c)| {
                u8::try_from(u32::from(c)).map_err(|_| invalid_char(c, position, charset))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Cow::Owned),
    }
}

/// Strip trailing pad spaces from fixed-length character data
pub fn trim_padding(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |p| p + 1);
    &raw[..end]
}

/// JSON string escaping (without the surrounding quotes)
pub fn escape_json(text: &str) -> Cow<'_, str> {
    let needs_escape = text
        .bytes()
        .any(|b| b == b'"' || b == b'\\' || b < 0x20);
    if !needs_escape {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
