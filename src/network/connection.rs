//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorCategory, PkReadError, Result};
use crate::protocol::{read_request, write_response, RequestFrame, ResponseCode, ResponseFrame};
use crate::session::Session;
use crate::status::Status;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Session every lookup on this connection runs in
    session: Arc<Session>,

    /// Response buffer, reused across requests
    response: Vec<u8>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and allocates the response buffer
    pub fn new(stream: TcpStream, session: Arc<Session>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;
        let response = vec![0u8; session.config().response_buffer_size];

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            session,
            response,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads frames in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let frame = match read_request(&mut self.reader) {
                Ok(frame) => frame,
                Err(PkReadError::Io(ref e)) => match e.kind() {
                    std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted => {
                        tracing::debug!("Client {} disconnected", self.peer_addr);
                        return Ok(());
                    }
                    // Windows reports TimedOut instead of WouldBlock
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                        tracing::debug!("Read timeout for client {}", self.peer_addr);
                        return Ok(());
                    }
                    _ => {
                        tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                        return Ok(());
                    }
                },
                Err(e) => {
                    tracing::warn!("Bad frame from {}: {}", self.peer_addr, e);
                    let reply = ResponseFrame::error(ResponseCode::ClientError, &e.to_string());
                    let _ = self.send(&reply);
                    return Err(e);
                }
            };

            let response = self.execute(frame);

            if let Err(e) = self.send(&response) {
                if let PkReadError::Io(ref io_err) = e {
                    match io_err.kind() {
                        std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::BrokenPipe => {
                            tracing::debug!(
                                "Client {} disconnected before response could be sent: {}",
                                self.peer_addr,
                                e
                            );
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a frame and build the response frame
    fn execute(&mut self, frame: RequestFrame) -> ResponseFrame {
        match frame {
            RequestFrame::Ping => ResponseFrame::ok(Vec::new()),
            RequestFrame::Stat => match self.session.stats_document() {
                Ok(document) => ResponseFrame::ok(document),
                Err(e) => ResponseFrame::error(e.category().into(), &e.to_string()),
            },
            RequestFrame::PkRead { request } => {
                let status = self.session.pk_read(&request, &mut self.response);
                tracing::trace!("Lookup from {}: {}", self.peer_addr, status);
                reply(&status, document(&self.response))
            }
            RequestFrame::Batch { requests } => {
                match self.session.batch_pk_read(&requests, &mut self.response) {
                    Ok(reads) => {
                        tracing::trace!("Batch of {} from {}", reads.len(), self.peer_addr);
                        let responses = reads
                            .iter()
                            .map(|read| reply(&read.status, &read.document))
                            .collect::<Vec<_>>();
                        ResponseFrame::batch(&responses)
                    }
                    Err(e) => ResponseFrame::error(e.category().into(), &e.to_string()),
                }
            }
        }
    }

    fn send(&mut self, frame: &ResponseFrame) -> Result<()> {
        write_response(&mut self.writer, frame)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// The NUL-terminated document at the start of `response`
fn document(response: &[u8]) -> &[u8] {
    let end = response.iter().position(|&b| b == 0).unwrap_or(response.len());
    &response[..end]
}

fn reply(status: &Status, document: &[u8]) -> ResponseFrame {
    match status.category {
        ErrorCategory::Success => ResponseFrame::ok(document),
        ErrorCategory::NotFound => ResponseFrame::not_found(),
        category => ResponseFrame::error(category.into(), &status.message),
    }
}
