//! Response building
//!
//! `ResponseBuilder` appends JSON text to a caller-owned, fixed-capacity
//! buffer. The document is terminated by a single NUL byte.
//!
//! ## Capacity Rule
//! An append of `n` bytes (plus one for a trailing comma) is accepted only if
//! `cursor + n < capacity`, which always leaves room for the terminating NUL.
//! A rejected append writes nothing.

use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::codec::{decimal, decode_charset, escape_json, trim_padding, Padding};
use crate::error::{PkReadError, Result};
use crate::schema::Charset;

/// Append-only JSON writer over a fixed buffer
#[derive(Debug)]
pub struct ResponseBuilder<'a> {
    buf: &'a mut [u8],
    cursor: usize,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Bytes written so far, excluding the terminating NUL
    pub fn written(&self) -> usize {
        self.cursor
    }

    /// The document written so far
    pub fn as_str(&self) -> &str {
        // only ever fed validated UTF-8
        std::str::from_utf8(&self.buf[..self.cursor]).unwrap_or_default()
    }

    fn reserve(&self, needed: usize) -> Result<()> {
        if self.cursor + needed >= self.buf.len() {
            return Err(PkReadError::BufferOverflow {
                needed,
                remaining: self.remaining_capacity(),
            });
        }
        Ok(())
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
    }

    fn put_comma(&mut self, comma: bool) {
        if comma {
            self.put(b",");
        }
    }

    // -------------------------------------------------------------------------
    // Appends
    // -------------------------------------------------------------------------

    /// Copy text verbatim, optionally followed by a comma
    pub fn append_raw(&mut self, text: &str, comma: bool) -> Result<()> {
        self.reserve(text.len() + comma as usize)?;
        self.put(text.as_bytes());
        self.put_comma(comma);
        Ok(())
    }

    pub fn append_integer(&mut self, value: i64, comma: bool) -> Result<()> {
        self.append_raw(&value.to_string(), comma)
    }

    pub fn append_unsigned(&mut self, value: u64, comma: bool) -> Result<()> {
        self.append_raw(&value.to_string(), comma)
    }

    /// Shortest round-trip form; NaN and infinities become `null`
    pub fn append_floating_point(&mut self, value: f64, comma: bool) -> Result<()> {
        if !value.is_finite() {
            return self.append_raw("null", comma);
        }
        let mut text = String::with_capacity(24);
        let _ = write!(text, "{}", value);
        self.append_raw(&text, comma)
    }

    /// Same as `append_floating_point`, but shortest for single precision
    pub fn append_float32(&mut self, value: f32, comma: bool) -> Result<()> {
        if !value.is_finite() {
            return self.append_raw("null", comma);
        }
        let mut text = String::with_capacity(16);
        let _ = write!(text, "{}", value);
        self.append_raw(&text, comma)
    }

    /// Binary decimal → canonical base-10 number, unquoted
    pub fn append_decimal(&mut self, raw: &[u8], precision: u32, scale: u32, comma: bool) -> Result<()> {
        let text = decimal::decode(raw, precision, scale)
            .map_err(|e| PkReadError::Internal(format!("Failed to convert decimal: {}", e)))?;
        self.append_raw(&text, comma)
    }

    /// Charset-validated, JSON-escaped, double-quoted text
    pub fn append_quoted_text(
        &mut self,
        raw: &[u8],
        charset: Charset,
        padding: Padding,
        comma: bool,
    ) -> Result<()> {
        let raw = match padding {
            Padding::Trim => trim_padding(raw),
            Padding::Keep => raw,
        };
        let text = decode_charset(raw, charset)?;
        let escaped = escape_json(&text);
        self.append_quoted(&escaped, comma)
    }

    /// Standard padded base64, double-quoted
    pub fn append_base64(&mut self, raw: &[u8], comma: bool) -> Result<()> {
        let encoded = STANDARD.encode(raw);
        self.append_quoted(&encoded, comma)
    }

    /// JSON-escape and quote a UTF-8 string (column names, operation ids)
    pub fn append_string(&mut self, text: &str, comma: bool) -> Result<()> {
        let escaped = escape_json(text);
        self.append_quoted(&escaped, comma)
    }

    fn append_quoted(&mut self, escaped: &str, comma: bool) -> Result<()> {
        self.reserve(escaped.len() + 2 + comma as usize)?;
        self.put(b"\"");
        self.put(escaped.as_bytes());
        self.put(b"\"");
        self.put_comma(comma);
        Ok(())
    }

    /// Write the terminating NUL
    ///
    /// The cursor does not move; nothing should be appended afterwards.
    pub fn append_null(&mut self) -> Result<()> {
        if self.cursor >= self.buf.len() {
            return Err(PkReadError::BufferOverflow {
                needed: 1,
                remaining: 0,
            });
        }
        self.buf[self.cursor] = 0;
        Ok(())
    }

    /// Drop everything written so far
    pub fn discard(&mut self) {
        self.cursor = 0;
        if let Some(first) = self.buf.first_mut() {
            *first = 0;
        }
    }
}
