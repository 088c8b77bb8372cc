//! Configuration for pkread
//!
//! Centralized configuration with sensible defaults. Can be built in code or
//! loaded from a JSON file; fields missing from the file keep their defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PkReadError, Result};

/// Main configuration for a pkread instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Buffer Configuration
    // -------------------------------------------------------------------------
    /// Size of a request buffer (in bytes)
    pub request_buffer_size: usize,

    /// Size of a response buffer (in bytes); bounds the response document
    pub response_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Request Limits
    // -------------------------------------------------------------------------
    /// Max length of database, table and column names (characters)
    pub max_identifier_len: usize,

    /// Max length of an operation id (characters)
    pub max_operation_id_len: usize,

    /// Max primary-key filters per request
    pub max_filters: usize,

    /// Max read columns per request
    pub max_read_columns: usize,

    /// Max primary-key reads in one batch frame
    pub max_batch_size: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Accepted connections that may wait for a free worker
    ///
    /// Connections beyond `worker_threads` queue here; once the queue is
    /// full new connections are refused with a server error frame.
    pub accept_queue_len: usize,

    /// Threads serving connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Logging
    // -------------------------------------------------------------------------
    /// Default tracing filter when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_buffer_size: 320 * 1024,  // 320 KB
            response_buffer_size: 320 * 1024, // 320 KB
            max_identifier_len: 64,
            max_operation_id_len: 64,
            max_filters: 4096,
            max_read_columns: 4096,
            max_batch_size: 4096,
            listen_addr: "127.0.0.1:4406".to_string(),
            accept_queue_len: 1024,
            worker_threads: 4,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            log_level: "info,pkread=debug".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parse a JSON config document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| PkReadError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no request could work under
    pub fn validate(&self) -> Result<()> {
        if self.request_buffer_size < crate::protocol::layout::HEADER_SIZE {
            return Err(PkReadError::Config(format!(
                "request_buffer_size {} cannot hold the request header",
                self.request_buffer_size
            )));
        }
        if self.request_buffer_size > u32::MAX as usize {
            return Err(PkReadError::Config(format!(
                "request_buffer_size {} does not fit in 32 bits",
                self.request_buffer_size
            )));
        }
        if self.response_buffer_size == 0 {
            return Err(PkReadError::Config(
                "response_buffer_size must be positive".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(PkReadError::Config(
                "worker_threads must be positive".to_string(),
            ));
        }
        if self.accept_queue_len == 0 {
            return Err(PkReadError::Config(
                "accept_queue_len must be positive".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(PkReadError::Config(
                "max_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the request buffer size (in bytes)
    pub fn request_buffer_size(mut self, size: usize) -> Self {
        self.config.request_buffer_size = size;
        self
    }

    /// Set the response buffer size (in bytes)
    pub fn response_buffer_size(mut self, size: usize) -> Self {
        self.config.response_buffer_size = size;
        self
    }

    pub fn max_identifier_len(mut self, len: usize) -> Self {
        self.config.max_identifier_len = len;
        self
    }

    pub fn max_operation_id_len(mut self, len: usize) -> Self {
        self.config.max_operation_id_len = len;
        self
    }

    pub fn max_filters(mut self, count: usize) -> Self {
        self.config.max_filters = count;
        self
    }

    pub fn max_read_columns(mut self, count: usize) -> Self {
        self.config.max_read_columns = count;
        self
    }

    /// Set the maximum number of reads in one batch
    pub fn max_batch_size(mut self, count: usize) -> Self {
        self.config.max_batch_size = count;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set how many accepted connections may wait for a worker
    pub fn accept_queue_len(mut self, len: usize) -> Self {
        self.config.accept_queue_len = len;
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
