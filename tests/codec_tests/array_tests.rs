//! Array Codec Tests
//!
//! Character and binary columns: length prefixes, padding, oversize keys
//! and rendering back into the response.

use pkread::codec::{attribute_payload, encode_native, key_argument, write_attribute};
use pkread::error::TypeUse;
use pkread::schema::{ArrayType, Charset, ColumnDescriptor, ColumnType};
use pkread::store::RecAttr;
use pkread::{ErrorCategory, PkReadError, ResponseBuilder};

// =============================================================================
// Helpers
// =============================================================================

fn render(column: &ColumnDescriptor, native: Option<Vec<u8>>) -> pkread::Result<String> {
    let mut buf = [0u8; 256];
    let mut response = ResponseBuilder::new(&mut buf);
    write_attribute(column, &RecAttr::new(native), &mut response, false)?;
    Ok(response.as_str().to_string())
}

// =============================================================================
// Character keys
// =============================================================================

#[test]
fn test_varchar_short_prefix() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 20);
    assert_eq!(key_argument(&column, b"alice").unwrap(), b"\x05alice".to_vec());
}

#[test]
fn test_longvarchar_two_byte_prefix() {
    let column = ColumnDescriptor::array("body", ColumnType::Longvarchar, 1000);
    let value = vec![b'x'; 300];
    let native = key_argument(&column, &value).unwrap();
    assert_eq!(&native[..2], &300u16.to_le_bytes());
    assert_eq!(&native[2..], &value[..]);
}

#[test]
fn test_char_padded_to_length() {
    let column = ColumnDescriptor::array("code", ColumnType::Char, 6);
    assert_eq!(key_argument(&column, b"ab").unwrap(), b"ab    ".to_vec());
}

#[test]
fn test_multibyte_length_is_in_bytes() {
    // "żółw" is 4 characters but 7 bytes
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 6);
    let err = key_argument(&column, "żółw".as_bytes()).unwrap_err();
    assert!(matches!(err, PkReadError::KeyTooLarge { len: 7, max: 6, .. }));
}

#[test]
fn test_oversized_key_is_not_found() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 4);
    let err = key_argument(&column, b"abcde").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[test]
fn test_character_key_charset_checked() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 20);
    let err = key_argument(&column, &[b'a', 0xFF]).unwrap_err();
    assert!(matches!(err, PkReadError::TypeMismatch { .. }));

    let latin1 = column.with_charset(Charset::Latin1);
    assert_eq!(key_argument(&latin1, "é".as_bytes()).unwrap(), vec![1, 0xE9]);
    // raw latin1 bytes are not UTF-8 text
    assert!(matches!(
        key_argument(&latin1, &[0xE9]),
        Err(PkReadError::TypeMismatch { .. })
    ));
}

#[test]
fn test_latin1_key_transcoded() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 20)
        .with_charset(Charset::Latin1);
    assert_eq!(
        key_argument(&column, "café".as_bytes()).unwrap(),
        vec![4, 0x63, 0x61, 0x66, 0xE9]
    );
    assert_eq!(
        encode_native(&column, "café").unwrap(),
        vec![4, 0x63, 0x61, 0x66, 0xE9]
    );

    // nothing above U+00FF has a latin1 byte
    for text in ["€uro", "żółw"] {
        assert!(matches!(
            key_argument(&column, text.as_bytes()),
            Err(PkReadError::TypeMismatch { .. })
        ));
        assert!(matches!(
            encode_native(&column, text),
            Err(PkReadError::TypeMismatch { .. })
        ));
    }
}

#[test]
fn test_latin1_length_checked_after_transcoding() {
    // "ééé" is 6 bytes of UTF-8 but 3 bytes of latin1
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 3)
        .with_charset(Charset::Latin1);
    assert_eq!(
        key_argument(&column, "ééé".as_bytes()).unwrap(),
        vec![3, 0xE9, 0xE9, 0xE9]
    );
    assert!(matches!(
        key_argument(&column, "éééé".as_bytes()),
        Err(PkReadError::KeyTooLarge { len: 4, max: 3, .. })
    ));

    let fixed = ColumnDescriptor::array("code", ColumnType::Char, 4)
        .with_charset(Charset::Latin1);
    assert_eq!(
        key_argument(&fixed, "ñ".as_bytes()).unwrap(),
        vec![0xF1, b' ', b' ', b' ']
    );
}

#[test]
fn test_latin1_round_trips_through_render() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 20)
        .with_charset(Charset::Latin1);
    let native = encode_native(&column, "naïve café").unwrap();
    assert_eq!(render(&column, Some(native)).unwrap(), "\"naïve café\"");
}

#[test]
fn test_utf8mb3_rejects_four_byte_characters() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 20)
        .with_charset(Charset::Utf8mb3);
    assert!(key_argument(&column, "żółw".as_bytes()).is_ok());
    assert!(matches!(
        key_argument(&column, "🦀".as_bytes()),
        Err(PkReadError::TypeMismatch { .. })
    ));
}

// =============================================================================
// Binary keys
// =============================================================================

#[test]
fn test_varbinary_base64_decoded() {
    let column = ColumnDescriptor::array("hash", ColumnType::Varbinary, 8);
    assert_eq!(
        key_argument(&column, b"3q2+7w==").unwrap(),
        vec![4, 0xDE, 0xAD, 0xBE, 0xEF]
    );
}

#[test]
fn test_binary_zero_padded() {
    let column = ColumnDescriptor::array("hash", ColumnType::Binary, 6);
    assert_eq!(
        key_argument(&column, b"3q2+7w==").unwrap(),
        vec![0xDE, 0xAD, 0xBE, 0xEF, 0, 0]
    );
}

#[test]
fn test_binary_length_checked_after_decoding() {
    // 8 base64 characters decode to 4 bytes, which fit
    let column = ColumnDescriptor::array("hash", ColumnType::Varbinary, 4);
    assert!(key_argument(&column, b"3q2+7w==").is_ok());
    assert!(matches!(
        key_argument(&column, b"3q2+7wA="),
        Err(PkReadError::KeyTooLarge { len: 5, .. })
    ));
}

#[test]
fn test_invalid_base64_is_type_mismatch() {
    let column = ColumnDescriptor::array("hash", ColumnType::Varbinary, 8);
    let err = key_argument(&column, b"not base64!").unwrap_err();
    assert!(matches!(err, PkReadError::TypeMismatch { .. }));
}

// =============================================================================
// Unsupported key types
// =============================================================================

#[test]
fn test_unsupported_key_types() {
    for column_type in [
        ColumnType::Float,
        ColumnType::Double,
        ColumnType::Blob,
        ColumnType::Text,
        ColumnType::Bit,
        ColumnType::Date,
        ColumnType::Datetime2,
        ColumnType::Timestamp,
        ColumnType::Year,
        ColumnType::Olddecimal,
        ColumnType::Undefined,
    ] {
        let column = ColumnDescriptor::new("k", column_type);
        match key_argument(&column, b"1") {
            Err(PkReadError::UnsupportedType { usage, .. }) => {
                assert_eq!(usage, TypeUse::PrimaryKey)
            }
            other => panic!("{} as key gave {:?}", column_type, other),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_render_char_trims_padding() {
    let column = ColumnDescriptor::array("code", ColumnType::Char, 6);
    let native = encode_native(&column, "ab").unwrap();
    assert_eq!(render(&column, Some(native)).unwrap(), "\"ab\"");
}

#[test]
fn test_render_varchar_keeps_trailing_spaces() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 10);
    let native = encode_native(&column, "ab  ").unwrap();
    assert_eq!(render(&column, Some(native)).unwrap(), "\"ab  \"");
}

#[test]
fn test_render_binary_as_base64() {
    let column = ColumnDescriptor::array("hash", ColumnType::Varbinary, 8);
    let native = encode_native(&column, "3q2+7w==").unwrap();
    assert_eq!(render(&column, Some(native)).unwrap(), "\"3q2+7w==\"");
}

#[test]
fn test_render_null() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 10);
    assert_eq!(render(&column, None).unwrap(), "null");
}

#[test]
fn test_render_float_and_double() {
    let float = ColumnDescriptor::new("f", ColumnType::Float);
    let double = ColumnDescriptor::new("d", ColumnType::Double);
    assert_eq!(
        render(&float, Some(encode_native(&float, "2.5").unwrap())).unwrap(),
        "2.5"
    );
    assert_eq!(
        render(&double, Some(encode_native(&double, "-0.125").unwrap())).unwrap(),
        "-0.125"
    );
    assert_eq!(
        render(&double, Some(f64::NAN.to_le_bytes().to_vec())).unwrap(),
        "null"
    );
}

#[test]
fn test_render_unsupported_is_server_error() {
    let column = ColumnDescriptor::new("when", ColumnType::Datetime2);
    let err = render(&column, Some(vec![0; 5])).unwrap_err();
    assert!(matches!(
        err,
        PkReadError::UnsupportedType {
            usage: TypeUse::Response,
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::ServerError);
}

#[test]
fn test_corrupt_length_prefix() {
    let column = ColumnDescriptor::array("body", ColumnType::Longvarchar, 100);
    // prefix claims 50 bytes, 3 present
    let native = vec![50, 0, b'a', b'b', b'c'];
    assert!(attribute_payload(&column, &native).is_err());
    assert!(matches!(
        render(&column, Some(native)),
        Err(PkReadError::Internal(_))
    ));
}

#[test]
fn test_explicit_array_type_override() {
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 300)
        .with_array_type(ArrayType::MediumVar);
    assert_eq!(&key_argument(&column, b"hi").unwrap()[..2], &[2, 0]);
}

#[test]
fn test_value_too_long_for_length_prefix() {
    // a one-byte prefix cannot describe 260 bytes
    let column = ColumnDescriptor::array("name", ColumnType::Varchar, 300)
        .with_array_type(ArrayType::ShortVar);
    let value = vec![b'a'; 260];
    assert!(matches!(
        key_argument(&column, &value),
        Err(PkReadError::Internal(_))
    ));
    assert!(matches!(
        encode_native(&column, &"a".repeat(260)),
        Err(PkReadError::Internal(_))
    ));
    assert_eq!(key_argument(&column, &value[..255]).unwrap()[0], 255);

    let column = ColumnDescriptor::array("body", ColumnType::Longvarchar, 70_000)
        .with_array_type(ArrayType::MediumVar);
    assert!(matches!(
        key_argument(&column, &vec![b'a'; 65_536]),
        Err(PkReadError::Internal(_))
    ));
}
