//! Column Codec
//!
//! Per-type marshalling between wire values and the storage engine's native
//! column representation.
//!
//! ## Responsibilities
//! - Wire value → native equality argument (`key_argument`)
//! - Textual value → native stored form (`encode_native`, used to load rows)
//! - Native attribute → response text (`write_attribute`)
//!
//! ## Type Table
//! ```text
//! ┌──────────────────────────┬─────────────────────┬─────────────────────┐
//! │ Column type              │ Wire (key)          │ Response            │
//! ├──────────────────────────┼─────────────────────┼─────────────────────┤
//! │ tiny/small/medium/int/big│ base-10 numeral     │ bare integer        │
//! │ decimal                  │ base-10 literal     │ bare decimal        │
//! │ char/varchar/longvarchar │ UTF-8, transcoded   │ quoted, escaped     │
//! │ binary/varbinary/long..  │ base64              │ quoted base64       │
//! │ float/double             │ unsupported         │ bare number / null  │
//! │ blob/text/temporal/bit   │ unsupported         │ unsupported         │
//! └──────────────────────────┴─────────────────────┴─────────────────────┘
//! ```

use std::borrow::Cow;

pub mod decimal;
pub mod integer;
mod text;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{PkReadError, Result, TypeUse};
use crate::protocol::ResponseBuilder;
use crate::schema::{ArrayType, ColumnDescriptor, ColumnType};
use crate::store::RecAttr;

pub use text::{decode_charset, encode_charset, escape_json, trim_padding, Padding};

// =============================================================================
// Wire → Native
// =============================================================================

/// Build the native equality argument for a primary-key column
///
/// `payload` is the wire value with its length prefix already stripped.
pub fn key_argument(column: &ColumnDescriptor, payload: &[u8]) -> Result<Vec<u8>> {
    match column.column_type {
        ColumnType::Tinyint
        | ColumnType::Tinyunsigned
        | ColumnType::Smallint
        | ColumnType::Smallunsigned
        | ColumnType::Mediumint
        | ColumnType::Mediumunsigned
        | ColumnType::Int
        | ColumnType::Unsigned
        | ColumnType::Bigint
        | ColumnType::Bigunsigned => integer::encode(column, payload),

        ColumnType::Decimal | ColumnType::Decimalunsigned => decimal_argument(column, payload),

        ColumnType::Char | ColumnType::Varchar | ColumnType::Longvarchar => {
            array_value(column, &character_value(column, payload)?)
        }

        ColumnType::Binary | ColumnType::Varbinary | ColumnType::Longvarbinary => {
            let decoded = STANDARD.decode(payload).map_err(|_| {
                PkReadError::type_mismatch(&column.name, "Expecting base64 encoded data.")
            })?;
            array_value(column, &decoded)
        }

        other => Err(PkReadError::UnsupportedType {
            column: column.name.clone(),
            column_type: other,
            usage: TypeUse::PrimaryKey,
        }),
    }
}

fn decimal_argument(column: &ColumnDescriptor, text: &[u8]) -> Result<Vec<u8>> {
    let expected = || {
        format!(
            "Expecting {} with precision {} and scale {}.",
            column.column_type.name().to_uppercase(),
            column.precision,
            column.scale
        )
    };

    if column.column_type == ColumnType::Decimalunsigned && text.first() == Some(&b'-') {
        return Err(PkReadError::type_mismatch(&column.name, expected()));
    }

    decimal::encode(text, column.precision, column.scale)
        .map_err(|_| PkReadError::type_mismatch(&column.name, expected()))
}

/// UTF-8 text in the column's charset; the length limit applies afterwards
fn character_value<'t>(column: &ColumnDescriptor, text: &'t [u8]) -> Result<Cow<'t, [u8]>> {
    encode_charset(text, column.charset).map_err(|e| {
        tracing::debug!("Rejected value for {}: {}", column.name, e);
        PkReadError::type_mismatch(
            &column.name,
            format!("Expecting {:?} text.", column.charset),
        )
    })
}

/// Lay out character or binary data per the column's array kind
fn array_value(column: &ColumnDescriptor, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > column.length {
        return Err(PkReadError::KeyTooLarge {
            column: column.name.clone(),
            len: data.len(),
            max: column.length,
        });
    }

    let mut native = Vec::with_capacity(column.size_in_bytes());
    match column.array_type {
        ArrayType::Fixed => {
            native.extend_from_slice(data);
            // CHAR pads with spaces, BINARY with zeros
            let pad = if column.column_type.is_character() { b' ' } else { 0 };
            native.resize(column.length, pad);
        }
        ArrayType::ShortVar => {
            let len = u8::try_from(data.len()).map_err(|_| prefix_overflow(column, data.len()))?;
            native.push(len);
            native.extend_from_slice(data);
        }
        ArrayType::MediumVar => {
            let len = u16::try_from(data.len()).map_err(|_| prefix_overflow(column, data.len()))?;
            native.extend_from_slice(&len.to_le_bytes());
            native.extend_from_slice(data);
        }
    }
    Ok(native)
}

fn prefix_overflow(column: &ColumnDescriptor, len: usize) -> PkReadError {
    PkReadError::Internal(format!(
        "{} byte value for column {} does not fit its {:?} length prefix",
        len, column.name, column.array_type
    ))
}

/// Build the native stored form of a value from its textual form
///
/// Follows the key rules, plus float and double. Types the lookup path
/// never interprets (temporal, blob, bit, ...) are stored verbatim.
pub fn encode_native(column: &ColumnDescriptor, text: &str) -> Result<Vec<u8>> {
    match column.column_type {
        ColumnType::Float => text
            .trim()
            .parse::<f32>()
            .map(|v| v.to_le_bytes().to_vec())
            .map_err(|_| PkReadError::type_mismatch(&column.name, "Expecting FLOAT.")),
        ColumnType::Double => text
            .trim()
            .parse::<f64>()
            .map(|v| v.to_le_bytes().to_vec())
            .map_err(|_| PkReadError::type_mismatch(&column.name, "Expecting DOUBLE.")),
        column_type if integer::range(column_type).is_some() => {
            integer::encode(column, text.as_bytes())
        }
        ColumnType::Decimal | ColumnType::Decimalunsigned => {
            decimal_argument(column, text.as_bytes())
        }
        ColumnType::Char | ColumnType::Varchar | ColumnType::Longvarchar => {
            array_value(column, &character_value(column, text.as_bytes())?)
        }
        ColumnType::Binary | ColumnType::Varbinary | ColumnType::Longvarbinary => {
            let decoded = STANDARD.decode(text).map_err(|_| {
                PkReadError::type_mismatch(&column.name, "Expecting base64 encoded data.")
            })?;
            array_value(column, &decoded)
        }
        _ => Ok(text.as_bytes().to_vec()),
    }
}

// =============================================================================
// Native → Response
// =============================================================================

/// Data bytes of a stored attribute, with any length prefix removed
pub fn attribute_payload<'a>(column: &ColumnDescriptor, raw: &'a [u8]) -> Result<&'a [u8]> {
    let (len, prefix) = match column.array_type {
        ArrayType::Fixed => return Ok(raw),
        ArrayType::ShortVar => match raw.first() {
            Some(&len) => (len as usize, 1),
            None => return Err(truncated(column, raw.len())),
        },
        ArrayType::MediumVar => match raw.get(..2) {
            Some(bytes) => (u16::from_le_bytes([bytes[0], bytes[1]]) as usize, 2),
            None => return Err(truncated(column, raw.len())),
        },
    };

    raw.get(prefix..prefix + len)
        .ok_or_else(|| truncated(column, raw.len()))
}

fn truncated(column: &ColumnDescriptor, actual: usize) -> PkReadError {
    PkReadError::Internal(format!(
        "stored value for column {} is truncated ({} bytes)",
        column.name, actual
    ))
}

/// Format a read-back attribute into the response
pub fn write_attribute(
    column: &ColumnDescriptor,
    attr: &RecAttr,
    response: &mut ResponseBuilder<'_>,
    comma: bool,
) -> Result<()> {
    if attr.is_null() {
        return response.append_raw("null", comma);
    }
    let raw = attr.bytes();

    match column.column_type {
        ColumnType::Tinyint
        | ColumnType::Smallint
        | ColumnType::Mediumint
        | ColumnType::Int
        | ColumnType::Bigint => response.append_integer(integer::read_signed(column, raw)?, comma),

        ColumnType::Tinyunsigned
        | ColumnType::Smallunsigned
        | ColumnType::Mediumunsigned
        | ColumnType::Unsigned
        | ColumnType::Bigunsigned => {
            response.append_unsigned(integer::read_unsigned(column, raw)?, comma)
        }

        ColumnType::Float => {
            let bytes: [u8; 4] = raw.try_into().map_err(|_| truncated(column, raw.len()))?;
            response.append_float32(f32::from_le_bytes(bytes), comma)
        }
        ColumnType::Double => {
            let bytes: [u8; 8] = raw.try_into().map_err(|_| truncated(column, raw.len()))?;
            response.append_floating_point(f64::from_le_bytes(bytes), comma)
        }

        ColumnType::Decimal | ColumnType::Decimalunsigned => {
            response.append_decimal(raw, column.precision, column.scale, comma)
        }

        ColumnType::Char => response.append_quoted_text(
            attribute_payload(column, raw)?,
            column.charset,
            Padding::Trim,
            comma,
        ),
        ColumnType::Varchar | ColumnType::Longvarchar => response.append_quoted_text(
            attribute_payload(column, raw)?,
            column.charset,
            Padding::Keep,
            comma,
        ),

        ColumnType::Binary | ColumnType::Varbinary | ColumnType::Longvarbinary => {
            response.append_base64(attribute_payload(column, raw)?, comma)
        }

        other => Err(PkReadError::UnsupportedType {
            column: column.name.clone(),
            column_type: other,
            usage: TypeUse::Response,
        }),
    }
}
