//! Frame codec
//!
//! Length-delimited frames that carry request buffers over a stream and
//! bring documents or error messages back.
//!
//! ### Request Frame
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │  Op (1)  │ Len (4)  │   Request buffer            │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Response Frame
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │   Document or message       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Lengths are big-endian.
//!
//! ### Batch Payloads
//! A BATCH request carries several request buffers; its OK response
//! carries one complete response frame per request, in request order.
//! ```text
//! request:  ┌──────────┬──────────┬───────────┬──────────┬───────────┬───
//!           │Count (4) │ Len (4)  │ Request 1 │ Len (4)  │ Request 2 │ ...
//!           └──────────┴──────────┴───────────┴──────────┴───────────┴───
//! response: ┌──────────┬──────────────────┬──────────────────┬───
//!           │Count (4) │ Response frame 1 │ Response frame 2 │ ...
//!           └──────────┴──────────────────┴──────────────────┴───
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use crate::error::{ErrorCategory, PkReadError, Result};

/// Header size: 1 byte op/status + 4 bytes length
pub const FRAME_HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Request frame op codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameOp {
    PkRead = 0x01,
    Ping = 0x02,
    Batch = 0x03,
    Stat = 0x04,
}

/// A request as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFrame {
    /// Primary-key read; payload is a binary request buffer
    PkRead { request: Vec<u8> },

    /// Health check
    Ping,

    /// Several primary-key reads answered in one response
    Batch { requests: Vec<Vec<u8>> },

    /// Store counters as a JSON document
    Stat,
}

impl RequestFrame {
    pub fn op(&self) -> FrameOp {
        match self {
            RequestFrame::PkRead { .. } => FrameOp::PkRead,
            RequestFrame::Ping => FrameOp::Ping,
            RequestFrame::Batch { .. } => FrameOp::Batch,
            RequestFrame::Stat => FrameOp::Stat,
        }
    }
}

/// Response frame status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    Ok = 0x00,
    NotFound = 0x01,
    ClientError = 0x02,
    ServerError = 0x03,
}

impl From<ErrorCategory> for ResponseCode {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Success => ResponseCode::Ok,
            ErrorCategory::NotFound => ResponseCode::NotFound,
            ErrorCategory::ClientError => ResponseCode::ClientError,
            ErrorCategory::ServerError => ResponseCode::ServerError,
        }
    }
}

/// A response as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub code: ResponseCode,

    /// JSON document for OK, error message otherwise (may be empty)
    pub payload: Vec<u8>,
}

impl ResponseFrame {
    pub fn ok(document: impl Into<Vec<u8>>) -> Self {
        Self {
            code: ResponseCode::Ok,
            payload: document.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            code: ResponseCode::NotFound,
            payload: Vec::new(),
        }
    }

    pub fn error(code: ResponseCode, message: &str) -> Self {
        Self {
            code,
            payload: message.as_bytes().to_vec(),
        }
    }

    /// OK frame wrapping one response per batched request
    pub fn batch(responses: &[ResponseFrame]) -> Self {
        let size = 4 + responses
            .iter()
            .map(|r| FRAME_HEADER_SIZE + r.payload.len())
            .sum::<usize>();
        let mut payload = Vec::with_capacity(size);
        payload.put_u32(responses.len() as u32);
        for response in responses {
            payload.put_slice(&encode_response(response));
        }
        Self::ok(payload)
    }
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

pub fn encode_request(frame: &RequestFrame) -> Vec<u8> {
    let batch;
    let payload: &[u8] = match frame {
        RequestFrame::PkRead { request } => request,
        RequestFrame::Batch { requests } => {
            batch = encode_batch(requests);
            &batch
        }
        RequestFrame::Ping | RequestFrame::Stat => &[],
    };

    let mut message = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    message.put_u8(frame.op() as u8);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message
}

pub fn decode_request(bytes: &[u8]) -> Result<RequestFrame> {
    let (op, payload) = split_frame(bytes, "request")?;

    match op {
        0x01 => Ok(RequestFrame::PkRead {
            request: payload.to_vec(),
        }),
        0x02 if payload.is_empty() => Ok(RequestFrame::Ping),
        0x03 => Ok(RequestFrame::Batch {
            requests: decode_batch(payload)?,
        }),
        0x04 if payload.is_empty() => Ok(RequestFrame::Stat),
        0x02 => Err(unexpected_payload("PING", payload)),
        0x04 => Err(unexpected_payload("STAT", payload)),
        _ => Err(PkReadError::Protocol(format!(
            "Unknown frame op: 0x{:02x}",
            op
        ))),
    }
}

fn unexpected_payload(op: &str, payload: &[u8]) -> PkReadError {
    PkReadError::Protocol(format!(
        "{} frame: unexpected payload of {} bytes",
        op,
        payload.len()
    ))
}

fn encode_batch(requests: &[Vec<u8>]) -> Vec<u8> {
    let size = 4 + requests.iter().map(|r| 4 + r.len()).sum::<usize>();
    let mut payload = Vec::with_capacity(size);
    payload.put_u32(requests.len() as u32);
    for request in requests {
        payload.put_u32(request.len() as u32);
        payload.put_slice(request);
    }
    payload
}

fn decode_batch(mut payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    if payload.remaining() < 4 {
        return Err(PkReadError::Protocol(
            "BATCH frame: missing request count".to_string(),
        ));
    }
    let count = payload.get_u32() as usize;
    // every request needs at least its length word
    if count > payload.remaining() / 4 {
        return Err(PkReadError::Protocol(format!(
            "BATCH frame: {} requests cannot fit in {} bytes",
            count,
            payload.remaining()
        )));
    }

    let mut requests = Vec::with_capacity(count);
    for n in 0..count {
        if payload.remaining() < 4 {
            return Err(PkReadError::Protocol(format!(
                "BATCH frame: request {} has no length",
                n
            )));
        }
        let len = payload.get_u32() as usize;
        if payload.remaining() < len {
            return Err(PkReadError::Protocol(format!(
                "BATCH frame: request {} needs {} bytes, {} remaining",
                n,
                len,
                payload.remaining()
            )));
        }
        requests.push(payload[..len].to_vec());
        payload.advance(len);
    }

    if payload.has_remaining() {
        return Err(PkReadError::Protocol(format!(
            "BATCH frame: {} trailing bytes",
            payload.remaining()
        )));
    }
    Ok(requests)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

pub fn encode_response(frame: &ResponseFrame) -> Vec<u8> {
    let mut message = Vec::with_capacity(FRAME_HEADER_SIZE + frame.payload.len());
    message.put_u8(frame.code as u8);
    message.put_u32(frame.payload.len() as u32);
    message.put_slice(&frame.payload);
    message
}

pub fn decode_response(bytes: &[u8]) -> Result<ResponseFrame> {
    let (status, payload) = split_frame(bytes, "response")?;

    let code = match status {
        0x00 => ResponseCode::Ok,
        0x01 => ResponseCode::NotFound,
        0x02 => ResponseCode::ClientError,
        0x03 => ResponseCode::ServerError,
        _ => {
            return Err(PkReadError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status
            )))
        }
    };

    Ok(ResponseFrame {
        code,
        payload: payload.to_vec(),
    })
}

/// Split the payload of an OK batch response into its responses
pub fn decode_batch_response(mut payload: &[u8]) -> Result<Vec<ResponseFrame>> {
    if payload.remaining() < 4 {
        return Err(PkReadError::Protocol(
            "Batch response: missing response count".to_string(),
        ));
    }
    let count = payload.get_u32() as usize;
    if count > payload.remaining() / FRAME_HEADER_SIZE {
        return Err(PkReadError::Protocol(format!(
            "Batch response: {} responses cannot fit in {} bytes",
            count,
            payload.remaining()
        )));
    }

    let mut responses = Vec::with_capacity(count);
    for _ in 0..count {
        let response = decode_response(payload)?;
        payload.advance(FRAME_HEADER_SIZE + response.payload.len());
        responses.push(response);
    }

    if payload.has_remaining() {
        return Err(PkReadError::Protocol(format!(
            "Batch response: {} trailing bytes",
            payload.remaining()
        )));
    }
    Ok(responses)
}

/// Validate the header and return (type byte, payload)
fn split_frame<'b>(bytes: &'b [u8], what: &str) -> Result<(u8, &'b [u8])> {
    if bytes.len() < FRAME_HEADER_SIZE {
        return Err(PkReadError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            FRAME_HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..FRAME_HEADER_SIZE])?;
    let total_len = FRAME_HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(PkReadError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[FRAME_HEADER_SIZE..total_len]))
}

fn payload_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(PkReadError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let len = payload_len(&header)?;

    let mut message = vec![0u8; FRAME_HEADER_SIZE + len];
    message[..FRAME_HEADER_SIZE].copy_from_slice(&header);
    if len > 0 {
        reader.read_exact(&mut message[FRAME_HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete request frame, blocking until it arrives
pub fn read_request<R: Read>(reader: &mut R) -> Result<RequestFrame> {
    decode_request(&read_frame(reader)?)
}

pub fn write_request<W: Write>(writer: &mut W, frame: &RequestFrame) -> Result<()> {
    writer.write_all(&encode_request(frame))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response frame, blocking until it arrives
pub fn read_response<R: Read>(reader: &mut R) -> Result<ResponseFrame> {
    decode_response(&read_frame(reader)?)
}

pub fn write_response<W: Write>(writer: &mut W, frame: &ResponseFrame) -> Result<()> {
    writer.write_all(&encode_response(frame))?;
    writer.flush()?;
    Ok(())
}
