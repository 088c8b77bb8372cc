//! Integer columns
//!
//! Wire values are base-10 ASCII numerals; native values are little-endian
//! two's complement of the column's width (1, 2, 3, 4 or 8 bytes).

use crate::error::{PkReadError, Result};
use crate::schema::{ColumnDescriptor, ColumnType};

/// Longest numeral accepted on the wire
pub const MAX_NUMERAL_LEN: usize = 64;

/// Inclusive value range of an integer column type
pub fn range(column_type: ColumnType) -> Option<(i128, i128)> {
    let range = match column_type {
        ColumnType::Tinyint => (i8::MIN as i128, i8::MAX as i128),
        ColumnType::Tinyunsigned => (0, u8::MAX as i128),
        ColumnType::Smallint => (i16::MIN as i128, i16::MAX as i128),
        ColumnType::Smallunsigned => (0, u16::MAX as i128),
        ColumnType::Mediumint => (-(1 << 23), (1 << 23) - 1),
        ColumnType::Mediumunsigned => (0, (1 << 24) - 1),
        ColumnType::Int => (i32::MIN as i128, i32::MAX as i128),
        ColumnType::Unsigned => (0, u32::MAX as i128),
        ColumnType::Bigint => (i64::MIN as i128, i64::MAX as i128),
        ColumnType::Bigunsigned => (0, u64::MAX as i128),
        _ => return None,
    };
    Some(range)
}

pub fn is_unsigned(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::Tinyunsigned
            | ColumnType::Smallunsigned
            | ColumnType::Mediumunsigned
            | ColumnType::Unsigned
            | ColumnType::Bigunsigned
    )
}

/// Parse `[+-]?[0-9]+`
///
/// No whitespace, no other characters. Returns `None` on bad syntax or if
/// the value does not fit in 128 bits.
pub fn parse(text: &[u8]) -> Option<i128> {
    if text.is_empty() || text.len() > MAX_NUMERAL_LEN {
        return None;
    }

    let (negative, digits) = match text[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }

    let mut value: i128 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }

    Some(if negative { -value } else { value })
}

/// Wire numeral → native little-endian bytes
pub fn encode(column: &ColumnDescriptor, text: &[u8]) -> Result<Vec<u8>> {
    let column_type = column.column_type;
    let (min, max) = range(column_type)
        .ok_or_else(|| PkReadError::Internal(format!("{} is not an integer type", column_type)))?;
    let width = column_type.fixed_width().unwrap_or(8);
    let expected = format!("Expecting {}.", column_type.name().to_uppercase());

    if is_unsigned(column_type) && text.first() == Some(&b'-') {
        return Err(PkReadError::type_mismatch(&column.name, expected));
    }

    let value = parse(text).ok_or_else(|| PkReadError::type_mismatch(&column.name, &expected))?;
    if value < min || value > max {
        return Err(PkReadError::type_mismatch(&column.name, expected));
    }

    Ok(value.to_le_bytes()[..width].to_vec())
}

fn widen(column: &ColumnDescriptor, raw: &[u8]) -> Result<[u8; 8]> {
    let width = column.column_type.fixed_width().unwrap_or(0);
    if raw.len() != width || width == 0 {
        return Err(PkReadError::Internal(format!(
            "column {} holds {} bytes, expected {}",
            column.name,
            raw.len(),
            width
        )));
    }
    let mut bytes = [0u8; 8];
    bytes[..width].copy_from_slice(raw);
    Ok(bytes)
}

/// Native bytes → signed value, sign-extended from the column width
pub fn read_signed(column: &ColumnDescriptor, raw: &[u8]) -> Result<i64> {
    let bytes = widen(column, raw)?;
    let shift = 64 - 8 * raw.len() as u32;
    Ok((i64::from_le_bytes(bytes) << shift) >> shift)
}

/// Native bytes → unsigned value
pub fn read_unsigned(column: &ColumnDescriptor, raw: &[u8]) -> Result<u64> {
    Ok(u64::from_le_bytes(widen(column, raw)?))
}
