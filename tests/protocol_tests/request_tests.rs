//! Request Tests
//!
//! Tests for the request encoder and the bounds-checked request view.

use pkread::protocol::layout::*;
use pkread::protocol::{LookupRequest, RequestView};
use pkread::{Config, ErrorCategory, PkReadError};

// =============================================================================
// Helpers
// =============================================================================

fn word(buf: &[u8], at: usize) -> usize {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]) as usize
}

fn set_word(buf: &mut [u8], at: usize, value: usize) {
    buf[at..at + 4].copy_from_slice(&(value as u32).to_le_bytes());
}

fn header(buf: &[u8], index: usize) -> usize {
    word(buf, index * ADDRESS_SIZE)
}

fn sample() -> LookupRequest {
    LookupRequest::new("shop", "orders")
        .filter("id", "42")
        .filter("region", "eu-west")
        .read_column("total")
        .read_column("status")
        .with_operation_id("op-1")
}

fn encoded(request: &LookupRequest, capacity: usize) -> Vec<u8> {
    request.encode(capacity).unwrap().to_vec()
}

fn assert_protocol_error(err: PkReadError, fragment: &str) {
    assert!(
        matches!(err, PkReadError::Protocol(_)),
        "expected protocol error, got {:?}",
        err
    );
    assert!(
        err.to_string().contains(fragment),
        "{:?} does not mention {:?}",
        err.to_string(),
        fragment
    );
    assert_eq!(err.category(), ErrorCategory::ClientError);
}

// =============================================================================
// Decoding an encoded request
// =============================================================================

#[test]
fn test_decode_full_request() {
    let buf = encoded(&sample(), 512);
    let view = RequestView::new(&buf).unwrap();

    assert_eq!(view.operation_type(), PK_REQ_ID);
    assert_eq!(view.capacity(), 512);
    assert!(view.length() as usize > HEADER_SIZE);
    assert!(view.length() <= 512);
    assert_eq!(view.db().unwrap(), "shop");
    assert_eq!(view.table().unwrap(), "orders");
    assert_eq!(view.operation_id().unwrap(), Some("op-1"));

    assert_eq!(view.pk_columns_count().unwrap(), 2);
    assert_eq!(view.pk_name(0).unwrap(), "id");
    assert_eq!(view.pk_name(1).unwrap(), "region");

    let value = view.pk_value(1).unwrap();
    assert_eq!(value.declared_len(), 7);
    assert_eq!(value.payload(), b"eu-west");
    assert_eq!(&value.as_bytes()[..2], &[7, 0]);

    assert_eq!(view.read_columns_count().unwrap(), 2);
    assert_eq!(view.read_column_name(0).unwrap(), "total");
    assert_eq!(view.read_column_name(1).unwrap(), "status");
}

#[test]
fn test_optional_sections_absent() {
    let request = LookupRequest::new("db", "t").filter("id", "1");
    let buf = encoded(&request, 128);
    let view = RequestView::new(&buf).unwrap();

    assert_eq!(header(&buf, READ_COLS_IDX), 0);
    assert_eq!(header(&buf, OP_ID_IDX), 0);
    assert_eq!(view.read_columns_count().unwrap(), 0);
    assert_eq!(view.operation_id().unwrap(), None);
}

#[test]
fn test_sections_are_word_aligned() {
    // odd-length names force padding before every section
    let request = LookupRequest::new("d", "tbl")
        .filter("a", "1")
        .filter("bcd", "22")
        .read_column("x");
    let buf = encoded(&request, 256);

    let pk = header(&buf, PK_COLS_IDX);
    assert_eq!(pk % ADDRESS_SIZE, 0);
    for i in 0..2 {
        assert_eq!(word(&buf, pk + ADDRESS_SIZE * (i + 1)) % ADDRESS_SIZE, 0);
    }
    assert_eq!(header(&buf, READ_COLS_IDX) % ADDRESS_SIZE, 0);
}

#[test]
fn test_encoded_buffer_is_zero_filled_to_capacity() {
    let buf = encoded(&sample(), 1024);
    assert_eq!(buf.len(), 1024);
    let length = header(&buf, LENGTH_IDX);
    assert!(buf[length..].iter().all(|&b| b == 0));
}

#[test]
fn test_empty_value() {
    let request = LookupRequest::new("db", "t").filter("code", "");
    let buf = encoded(&request, 128);
    let value = RequestView::new(&buf).unwrap().pk_value(0).unwrap();
    assert_eq!(value.declared_len(), 0);
    assert!(value.payload().is_empty());
}

// =============================================================================
// Encoder errors
// =============================================================================

#[test]
fn test_encode_capacity_too_small() {
    let err = sample().encode(40).unwrap_err();
    assert!(matches!(err, PkReadError::BufferOverflow { .. }));
}

#[test]
fn test_encode_rejects_oversized_value() {
    let request = LookupRequest::new("db", "t").filter("id", vec![b'1'; 70_000]);
    let err = request.encode(100_000).unwrap_err();
    assert!(matches!(err, PkReadError::InvalidRequest(_)));
}

#[test]
fn test_encode_rejects_nul_in_name() {
    let request = LookupRequest::new("d\0b", "t").filter("id", "1");
    assert!(matches!(
        request.encode(128).unwrap_err(),
        PkReadError::InvalidRequest(_)
    ));
}

// =============================================================================
// Client-side validation
// =============================================================================

#[test]
fn test_validate_accepts_sample() {
    sample().validate(&Config::default()).unwrap();
}

#[test]
fn test_validate_requires_filter() {
    let err = LookupRequest::new("db", "t")
        .validate(&Config::default())
        .unwrap_err();
    assert!(matches!(err, PkReadError::InvalidRequest(_)));
}

#[test]
fn test_validate_identifier_rules() {
    let config = Config::default();
    let long = "x".repeat(65);

    for (db, table) in [("", "t"), (long.as_str(), "t"), ("db", "t\u{1F600}")] {
        let err = LookupRequest::new(db, table)
            .filter("id", "1")
            .validate(&config)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ClientError, "{} {}", db, table);
    }

    // U+0080..U+0FFF is allowed
    LookupRequest::new("données", "t")
        .filter("id", "1")
        .validate(&config)
        .unwrap();
}

#[test]
fn test_validate_repeated_columns() {
    let config = Config::default();

    let repeated_filter = LookupRequest::new("db", "t").filter("id", "1").filter("id", "2");
    assert!(repeated_filter.validate(&config).is_err());

    let repeated_read = LookupRequest::new("db", "t")
        .filter("id", "1")
        .read_column("a")
        .read_column("a");
    assert!(repeated_read.validate(&config).is_err());

    let read_is_filter = LookupRequest::new("db", "t").filter("id", "1").read_column("id");
    assert!(read_is_filter.validate(&config).is_err());
}

#[test]
fn test_validate_limits() {
    let config = Config::builder()
        .max_filters(1)
        .max_operation_id_len(4)
        .build();

    let two_filters = LookupRequest::new("db", "t").filter("a", "1").filter("b", "2");
    assert!(two_filters.validate(&config).is_err());

    let long_id = LookupRequest::new("db", "t")
        .filter("a", "1")
        .with_operation_id("12345");
    assert!(long_id.validate(&config).is_err());

    let mut empty_reads = LookupRequest::new("db", "t").filter("a", "1");
    empty_reads.read_columns = Some(Vec::new());
    assert!(empty_reads.validate(&config).is_err());
}

// =============================================================================
// Untrusted buffers
// =============================================================================

#[test]
fn test_buffer_shorter_than_header() {
    let err = RequestView::new(&[0u8; 16]).unwrap_err();
    assert_protocol_error(err, "shorter than");
}

#[test]
fn test_declared_capacity_smaller_than_header() {
    let mut buf = encoded(&sample(), 256);
    set_word(&mut buf, CAPACITY_IDX * ADDRESS_SIZE, 8);
    assert_protocol_error(RequestView::new(&buf).unwrap_err(), "smaller than the header");
}

#[test]
fn test_declared_capacity_bounds_reads() {
    let request = LookupRequest::new("db", "t").filter("id", "1");
    let mut buf = encoded(&request, 256);
    // "db\0" sits at 32..35, "t\0" at 35..37; cut the view off at 36
    set_word(&mut buf, CAPACITY_IDX * ADDRESS_SIZE, 36);

    let view = RequestView::new(&buf).unwrap();
    assert_eq!(view.db().unwrap(), "db");
    assert_protocol_error(view.table().unwrap_err(), "NUL-terminated");
}

#[test]
fn test_slice_shorter_than_declared_capacity() {
    let buf = encoded(&sample(), 512);
    let length = header(&buf, LENGTH_IDX);
    let view = RequestView::new(&buf[..length - 6]).unwrap();

    // the operation id is written last and is now cut off
    assert!(view.operation_id().is_err());
    assert_eq!(view.db().unwrap(), "shop");
}

#[test]
fn test_offset_inside_header_rejected() {
    let mut buf = encoded(&sample(), 256);
    set_word(&mut buf, DB_IDX * ADDRESS_SIZE, 4);
    assert_protocol_error(RequestView::new(&buf).unwrap().db().unwrap_err(), "out of bounds");
}

#[test]
fn test_offset_past_end_rejected() {
    let mut buf = encoded(&sample(), 256);
    set_word(&mut buf, TABLE_IDX * ADDRESS_SIZE, 10_000);
    assert_protocol_error(
        RequestView::new(&buf).unwrap().table().unwrap_err(),
        "out of bounds",
    );
}

#[test]
fn test_misaligned_pk_section_rejected() {
    let mut buf = encoded(&sample(), 256);
    let pk = header(&buf, PK_COLS_IDX);
    set_word(&mut buf, PK_COLS_IDX * ADDRESS_SIZE, pk + 1);
    assert_protocol_error(
        RequestView::new(&buf).unwrap().pk_columns_count().unwrap_err(),
        "aligned",
    );
}

#[test]
fn test_pk_index_out_of_range() {
    let buf = encoded(&sample(), 256);
    let view = RequestView::new(&buf).unwrap();
    assert_protocol_error(view.pk_name(2).unwrap_err(), "out of range");
    assert_protocol_error(view.pk_value(5).unwrap_err(), "out of range");
    assert_protocol_error(view.read_column_name(2).unwrap_err(), "out of range");
}

#[test]
fn test_value_length_past_end_rejected() {
    let mut buf = encoded(&sample(), 256);
    let pk = header(&buf, PK_COLS_IDX);
    let pair = word(&buf, pk + ADDRESS_SIZE);
    let value = word(&buf, pair + ADDRESS_SIZE);
    buf[value..value + 2].copy_from_slice(&u16::MAX.to_le_bytes());

    let view = RequestView::new(&buf).unwrap();
    assert_protocol_error(view.pk_value(0).unwrap_err(), "past the end");
    // the other key is untouched
    assert_eq!(view.pk_value(1).unwrap().payload(), b"eu-west");
}

#[test]
fn test_huge_pk_count_is_bounded() {
    let mut buf = encoded(&sample(), 256);
    let pk = header(&buf, PK_COLS_IDX);
    set_word(&mut buf, pk, u32::MAX as usize);

    let view = RequestView::new(&buf).unwrap();
    assert_eq!(view.pk_columns_count().unwrap(), u32::MAX as usize);
    assert!(view.pk_name(1_000_000).is_err());
}

#[test]
fn test_non_utf8_name_rejected() {
    let mut buf = encoded(&sample(), 256);
    let db = header(&buf, DB_IDX);
    buf[db] = 0xC3;
    buf[db + 1] = 0x28;
    assert_protocol_error(RequestView::new(&buf).unwrap().db().unwrap_err(), "UTF-8");
}
