//! Binary decimal format
//!
//! The storage engine keeps `DECIMAL(p, s)` values in a packed, memcmp-able
//! binary form:
//!
//! ```text
//! ┌──────────────┬──────────────┬─────┬──────────────┬──────────────┐
//! │ lead int (k) │ int group(4) │ ... │ frac grp(4)  │ tail frac(k) │
//! └──────────────┴──────────────┴─────┴──────────────┴──────────────┘
//! ```
//!
//! - Digits are grouped in nines; each full group is a 4-byte big-endian word.
//! - Leftover digits use the minimal width from `DIG2BYTES`.
//! - Negative values have every byte inverted.
//! - The top bit of the first byte is flipped, so positive values start >= 0x80.

use thiserror::Error;

const DIG_PER_DEC: usize = 9;
const DIG2BYTES: [usize; DIG_PER_DEC + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];
const POWERS_OF_TEN: [u32; DIG_PER_DEC + 1] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

/// Largest precision the engine accepts
pub const MAX_PRECISION: u32 = 65;

/// Largest scale the engine accepts
pub const MAX_SCALE: u32 = 30;

/// Decimal conversion failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("invalid precision/scale ({precision},{scale})")]
    InvalidPrecision { precision: u32, scale: u32 },

    #[error("not a decimal number")]
    Syntax,

    #[error("too many integer digits for precision")]
    Overflow,

    #[error("too many fractional digits for scale")]
    Truncated,

    #[error("expected {expected} bytes of binary decimal, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("corrupt binary decimal")]
    Corrupt,
}

/// Bytes needed to store a DECIMAL(precision, scale)
pub fn binary_size(precision: u32, scale: u32) -> usize {
    let intg = precision.saturating_sub(scale) as usize;
    let frac = scale as usize;
    (intg / DIG_PER_DEC) * 4
        + DIG2BYTES[intg % DIG_PER_DEC]
        + (frac / DIG_PER_DEC) * 4
        + DIG2BYTES[frac % DIG_PER_DEC]
}

fn check_precision(precision: u32, scale: u32) -> Result<(), DecimalError> {
    if precision == 0 || precision > MAX_PRECISION || scale > MAX_SCALE || scale > precision {
        return Err(DecimalError::InvalidPrecision { precision, scale });
    }
    Ok(())
}

/// Parsed decimal literal: sign plus digit strings
struct Literal<'a> {
    negative: bool,
    int_digits: &'a [u8],
    frac_digits: &'a [u8],
}

fn parse_literal(text: &[u8]) -> Result<Literal<'_>, DecimalError> {
    let (negative, rest) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (int_digits, frac_digits) = match rest.iter().position(|&b| b == b'.') {
        Some(dot) => (&rest[..dot], &rest[dot + 1..]),
        None => (rest, &rest[rest.len()..]),
    };

    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(DecimalError::Syntax);
    }
    if !int_digits.iter().chain(frac_digits).all(u8::is_ascii_digit) {
        return Err(DecimalError::Syntax);
    }

    // strip leading zeros
    let first_significant = int_digits
        .iter()
        .position(|&b| b != b'0')
        .unwrap_or(int_digits.len());

    Ok(Literal {
        negative,
        int_digits: &int_digits[first_significant..],
        frac_digits,
    })
}

fn digits_value(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'))
}

fn put_group(out: &mut Vec<u8>, value: u32, width: usize) {
    out.extend_from_slice(&value.to_be_bytes()[4 - width..]);
}

/// Convert a base-10 literal into binary decimal form
///
/// Accepted grammar: `[+-]?[0-9]*(\.[0-9]*)?` with at least one digit.
/// More fractional digits than `scale` is an error, not a rounding.
pub fn encode(text: &[u8], precision: u32, scale: u32) -> Result<Vec<u8>, DecimalError> {
    check_precision(precision, scale)?;
    let literal = parse_literal(text)?;

    let intg = (precision - scale) as usize;
    let frac = scale as usize;
    if literal.int_digits.len() > intg {
        return Err(DecimalError::Overflow);
    }
    if literal.frac_digits.len() > frac {
        return Err(DecimalError::Truncated);
    }

    // Left-pad the integer part and right-pad the fraction to full width
    let mut int_part = vec![b'0'; intg - literal.int_digits.len()];
    int_part.extend_from_slice(literal.int_digits);
    let mut frac_part = literal.frac_digits.to_vec();
    frac_part.resize(frac, b'0');

    let is_zero = int_part.iter().chain(&frac_part).all(|&d| d == b'0');
    let mask: u8 = if literal.negative && !is_zero { 0xFF } else { 0x00 };

    let mut out = Vec::with_capacity(binary_size(precision, scale));

    let lead = intg % DIG_PER_DEC;
    if lead > 0 {
        put_group(&mut out, digits_value(&int_part[..lead]), DIG2BYTES[lead]);
    }
    for group in int_part[lead..].chunks(DIG_PER_DEC) {
        put_group(&mut out, digits_value(group), 4);
    }

    let full_frac = (frac / DIG_PER_DEC) * DIG_PER_DEC;
    for group in frac_part[..full_frac].chunks(DIG_PER_DEC) {
        put_group(&mut out, digits_value(group), 4);
    }
    let tail = frac % DIG_PER_DEC;
    if tail > 0 {
        put_group(&mut out, digits_value(&frac_part[full_frac..]), DIG2BYTES[tail]);
    }

    for byte in out.iter_mut() {
        *byte ^= mask;
    }
    out[0] ^= 0x80;

    Ok(out)
}

fn read_group(bytes: &[u8], digits: usize) -> Result<u32, DecimalError> {
    let value = bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    if value >= POWERS_OF_TEN[digits] {
        return Err(DecimalError::Corrupt);
    }
    Ok(value)
}

/// Convert binary decimal form into its canonical base-10 string
///
/// Output: optional `-`, integer digits without leading zeros (at least one),
/// then `.` and exactly `scale` fractional digits when `scale > 0`.
pub fn decode(raw: &[u8], precision: u32, scale: u32) -> Result<String, DecimalError> {
    check_precision(precision, scale)?;
    let expected = binary_size(precision, scale);
    if raw.len() != expected {
        return Err(DecimalError::Length {
            expected,
            actual: raw.len(),
        });
    }

    let mut buf = raw.to_vec();
    let negative = buf[0] & 0x80 == 0;
    buf[0] ^= 0x80;
    if negative {
        for byte in buf.iter_mut() {
            *byte = !*byte;
        }
    }

    let intg = (precision - scale) as usize;
    let frac = scale as usize;
    let mut pos = 0;
    let mut int_text = String::with_capacity(intg);
    let mut frac_text = String::with_capacity(frac);

    let lead = intg % DIG_PER_DEC;
    if lead > 0 {
        let width = DIG2BYTES[lead];
        let value = read_group(&buf[pos..pos + width], lead)?;
        int_text.push_str(&format!("{:0width$}", value, width = lead));
        pos += width;
    }
    for _ in 0..intg / DIG_PER_DEC {
        let value = read_group(&buf[pos..pos + 4], DIG_PER_DEC)?;
        int_text.push_str(&format!("{:09}", value));
        pos += 4;
    }
    for _ in 0..frac / DIG_PER_DEC {
        let value = read_group(&buf[pos..pos + 4], DIG_PER_DEC)?;
        frac_text.push_str(&format!("{:09}", value));
        pos += 4;
    }
    let tail = frac % DIG_PER_DEC;
    if tail > 0 {
        let width = DIG2BYTES[tail];
        let value = read_group(&buf[pos..pos + width], tail)?;
        frac_text.push_str(&format!("{:0width$}", value, width = tail));
    }

    let int_trimmed = int_text.trim_start_matches('0');
    let int_trimmed = if int_trimmed.is_empty() { "0" } else { int_trimmed };
    let is_zero = int_trimmed == "0" && frac_text.bytes().all(|d| d == b'0');

    let mut out = String::with_capacity(int_trimmed.len() + frac_text.len() + 2);
    if negative && !is_zero {
        out.push('-');
    }
    out.push_str(int_trimmed);
    if frac > 0 {
        out.push('.');
        out.push_str(&frac_text);
    }
    Ok(out)
}
