//! Frame Tests
//!
//! Tests for request/response frame encoding and decoding.

use std::io::Cursor;

use pkread::protocol::{
    decode_batch_response, decode_request, decode_response, encode_request, encode_response,
    read_request, read_response, write_request, write_response, FrameOp, RequestFrame,
    ResponseCode, ResponseFrame, MAX_PAYLOAD_SIZE,
};
use pkread::{ErrorCategory, LookupRequest};

// =============================================================================
// Request Frames
// =============================================================================

#[test]
fn test_encode_decode_pk_read() {
    let request = LookupRequest::new("db", "t")
        .filter("id", "42")
        .encode(256)
        .unwrap()
        .to_vec();
    let frame = RequestFrame::PkRead {
        request: request.clone(),
    };

    let decoded = decode_request(&encode_request(&frame)).unwrap();
    match decoded {
        RequestFrame::PkRead { request: bytes } => assert_eq!(bytes, request),
        _ => panic!("Expected PK_READ frame"),
    }
}

#[test]
fn test_encode_decode_ping() {
    let decoded = decode_request(&encode_request(&RequestFrame::Ping)).unwrap();
    assert_eq!(decoded, RequestFrame::Ping);
}

#[test]
fn test_binary_request_survives_framing() {
    // request buffers are full of NULs and high bytes
    let request: Vec<u8> = (0..=255).collect();
    let frame = RequestFrame::PkRead {
        request: request.clone(),
    };
    assert_eq!(decode_request(&encode_request(&frame)).unwrap(), frame);
}

// =============================================================================
// Response Frames
// =============================================================================

#[test]
fn test_encode_decode_response_ok() {
    let frame = ResponseFrame::ok(br#"{"Data":{}}"#.to_vec());
    let decoded = decode_response(&encode_response(&frame)).unwrap();

    assert_eq!(decoded.code, ResponseCode::Ok);
    assert_eq!(decoded.payload, br#"{"Data":{}}"#.to_vec());
}

#[test]
fn test_encode_decode_response_not_found() {
    let decoded = decode_response(&encode_response(&ResponseFrame::not_found())).unwrap();
    assert_eq!(decoded.code, ResponseCode::NotFound);
    assert!(decoded.payload.is_empty());
}

#[test]
fn test_encode_decode_response_errors() {
    for code in [ResponseCode::ClientError, ResponseCode::ServerError] {
        let frame = ResponseFrame::error(code, "something went wrong");
        let decoded = decode_response(&encode_response(&frame)).unwrap();
        assert_eq!(decoded.code, code);
        assert_eq!(decoded.payload, b"something went wrong".to_vec());
    }
}

#[test]
fn test_response_code_from_category() {
    assert_eq!(ResponseCode::from(ErrorCategory::Success), ResponseCode::Ok);
    assert_eq!(ResponseCode::from(ErrorCategory::NotFound), ResponseCode::NotFound);
    assert_eq!(
        ResponseCode::from(ErrorCategory::ClientError),
        ResponseCode::ClientError
    );
    assert_eq!(
        ResponseCode::from(ErrorCategory::ServerError),
        ResponseCode::ServerError
    );
}

// =============================================================================
// Batch and Stat Frames
// =============================================================================

#[test]
fn test_encode_decode_batch() {
    let requests = vec![
        LookupRequest::new("db", "t").filter("id", "1").encode(256).unwrap().to_vec(),
        Vec::new(),
        LookupRequest::new("db", "t").filter("id", "2").encode(256).unwrap().to_vec(),
    ];
    let frame = RequestFrame::Batch {
        requests: requests.clone(),
    };
    assert_eq!(frame.op(), FrameOp::Batch);

    let decoded = decode_request(&encode_request(&frame)).unwrap();
    assert_eq!(decoded, RequestFrame::Batch { requests });
}

#[test]
fn test_encode_decode_stat() {
    let encoded = encode_request(&RequestFrame::Stat);
    assert_eq!(encoded, vec![0x04, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decode_request(&encoded).unwrap(), RequestFrame::Stat);

    let bytes = [0x04, 0x00, 0x00, 0x00, 0x01, 0x00];
    let result = decode_request(&bytes);
    assert!(result.unwrap_err().to_string().contains("STAT frame"));
}

#[test]
fn test_wire_format_batch() {
    let encoded = encode_request(&RequestFrame::Batch {
        requests: vec![b"ab".to_vec(), b"c".to_vec()],
    });

    // [0x03][len 15][count 2][len 2][a b][len 1][c]
    assert_eq!(
        encoded,
        vec![
            0x03, 0, 0, 0, 15, //
            0, 0, 0, 2, //
            0, 0, 0, 2, b'a', b'b', //
            0, 0, 0, 1, b'c',
        ]
    );
}

#[test]
fn test_batch_without_count() {
    let err = decode_request(&[0x03, 0, 0, 0, 2, 0, 0]).unwrap_err();
    assert!(err.to_string().contains("missing request count"), "{}", err);
}

#[test]
fn test_batch_count_larger_than_payload() {
    // claims a million requests in 4 bytes
    let err = decode_request(&[0x03, 0, 0, 0, 8, 0, 0x0F, 0x42, 0x40, 0, 0, 0, 0]).unwrap_err();
    assert!(err.to_string().contains("cannot fit"), "{}", err);
}

#[test]
fn test_batch_truncated_request() {
    // one request of 9 bytes, 2 present
    let err = decode_request(&[0x03, 0, 0, 0, 10, 0, 0, 0, 1, 0, 0, 0, 9, 1, 2]).unwrap_err();
    assert!(err.to_string().contains("needs 9 bytes"), "{}", err);
}

#[test]
fn test_batch_trailing_bytes() {
    let err = decode_request(&[0x03, 0, 0, 0, 6, 0, 0, 0, 0, 0xAA, 0xBB]).unwrap_err();
    assert!(err.to_string().contains("trailing"), "{}", err);
    assert_eq!(err.category(), ErrorCategory::ClientError);
}

#[test]
fn test_batch_response_round_trip() {
    let responses = vec![
        ResponseFrame::ok(br#"{"Data":{"a":1}}"#.to_vec()),
        ResponseFrame::not_found(),
        ResponseFrame::error(ResponseCode::ClientError, "Invalid column data."),
    ];

    let frame = ResponseFrame::batch(&responses);
    assert_eq!(frame.code, ResponseCode::Ok);
    assert_eq!(&frame.payload[..4], &[0, 0, 0, 3]);

    let decoded = decode_response(&encode_response(&frame)).unwrap();
    assert_eq!(decode_batch_response(&decoded.payload).unwrap(), responses);
}

#[test]
fn test_empty_batch_response() {
    let frame = ResponseFrame::batch(&[]);
    assert_eq!(frame.payload, vec![0, 0, 0, 0]);
    assert!(decode_batch_response(&frame.payload).unwrap().is_empty());
}

#[test]
fn test_malformed_batch_response() {
    assert!(decode_batch_response(&[0, 0]).is_err());
    // two responses announced, one present
    let mut payload = vec![0, 0, 0, 2];
    payload.extend_from_slice(&encode_response(&ResponseFrame::not_found()));
    assert!(decode_batch_response(&payload).is_err());
    // one announced, one and a stray byte present
    payload[3] = 1;
    payload.push(0);
    assert!(decode_batch_response(&payload).unwrap_err().to_string().contains("trailing"));
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let bytes = [0x01, 0x00, 0x00]; // Only 3 bytes, need 5
    let result = decode_request(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete request header"));
}

#[test]
fn test_incomplete_payload() {
    // Header says 10 bytes payload, but only 5 provided
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x05, 0x68];
    let result = decode_request(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete"));
}

#[test]
fn test_payload_too_large() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    let result = decode_request(&bytes);
    assert!(result.unwrap_err().to_string().contains("Payload too large"));
}

#[test]
fn test_unknown_frame_op() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_request(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown frame op"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_response(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown response status"));
}

#[test]
fn test_ping_with_unexpected_payload() {
    let bytes = [0x02, 0x00, 0x00, 0x00, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
    let result = decode_request(&bytes);
    assert!(result.unwrap_err().to_string().contains("unexpected payload"));
}

#[test]
fn test_frame_errors_are_client_errors() {
    let err = decode_request(&[0x01]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ClientError);
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_multiple_requests() {
    let frames = vec![
        RequestFrame::Ping,
        RequestFrame::PkRead {
            request: vec![1, 2, 3],
        },
        RequestFrame::Stat,
        RequestFrame::Batch {
            requests: vec![vec![4, 5], vec![6]],
        },
        RequestFrame::PkRead { request: vec![] },
    ];

    let mut buffer = Vec::new();
    for frame in &frames {
        write_request(&mut buffer, frame).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &frames {
        assert_eq!(&read_request(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_multiple_responses() {
    let frames = vec![
        ResponseFrame::ok(b"{}".to_vec()),
        ResponseFrame::not_found(),
        ResponseFrame::error(ResponseCode::ServerError, "oops"),
    ];

    let mut buffer = Vec::new();
    for frame in &frames {
        write_response(&mut buffer, frame).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &frames {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_truncated_frame_is_io_error() {
    let mut bytes = encode_request(&RequestFrame::PkRead {
        request: vec![0; 16],
    });
    bytes.truncate(10);

    let err = read_request(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, pkread::PkReadError::Io(_)));
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_pk_read() {
    let encoded = encode_request(&RequestFrame::PkRead {
        request: b"test".to_vec(),
    });

    // [0x01][0x00 0x00 0x00 0x04][t e s t]
    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x04]);
    assert_eq!(&encoded[5..9], b"test");
}

#[test]
fn test_wire_format_response_not_found() {
    let encoded = encode_response(&ResponseFrame::not_found());
    assert_eq!(encoded, vec![0x01, 0x00, 0x00, 0x00, 0x00]);
}
