//! Logical lookup requests
//!
//! The producer side of the request format: a `LookupRequest` is validated
//! against the configured limits and encoded into a binary request buffer
//! that `RequestView` can decode.
//!
//! ## Encoded Layout
//! ```text
//! ┌──────────────┬──────┬───────┬──────────────────────┬──────────────┬───────┐
//! │ header (32)  │ db\0 │ tbl\0 │ pk section + pairs   │ read columns │ opid\0│
//! └──────────────┴──────┴───────┴──────────────────────┴──────────────┴───────┘
//! ```
//! Word-addressed sections start on 4-byte boundaries; the remainder of the
//! buffer up to `capacity` is zero-filled.

use std::collections::HashSet;

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::Config;
use crate::error::{PkReadError, Result};

use super::layout::*;

/// One primary-key equality filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    /// Wire value (numerals, text, or base64 for binary columns)
    pub value: Vec<u8>,
}

/// A primary-key read as a client describes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub db: String,
    pub table: String,
    pub filters: Vec<Filter>,
    /// `None` projects every non-key column
    pub read_columns: Option<Vec<String>>,
    pub operation_id: Option<String>,
}

impl LookupRequest {
    pub fn new(db: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
            filters: Vec::new(),
            read_columns: None,
            operation_id: None,
        }
    }

    /// Add a primary-key filter
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Add a column to the projection
    pub fn read_column(mut self, column: impl Into<String>) -> Self {
        self.read_columns
            .get_or_insert_with(Vec::new)
            .push(column.into());
        self
    }

    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check names and counts against the configured limits
    pub fn validate(&self, config: &Config) -> Result<()> {
        validate_identifier("database", &self.db, config.max_identifier_len)?;
        validate_identifier("table", &self.table, config.max_identifier_len)?;

        if self.filters.is_empty() {
            return Err(invalid("at least one primary-key filter is required"));
        }
        if self.filters.len() > config.max_filters {
            return Err(invalid(format!(
                "too many filters: {} (max {})",
                self.filters.len(),
                config.max_filters
            )));
        }

        let mut filter_columns = HashSet::new();
        for filter in &self.filters {
            validate_identifier("column", &filter.column, config.max_identifier_len)?;
            if !filter_columns.insert(filter.column.as_str()) {
                return Err(invalid(format!(
                    "field validation failed: filter column {} is repeated",
                    filter.column
                )));
            }
        }

        if let Some(columns) = &self.read_columns {
            if columns.is_empty() {
                return Err(invalid("read columns, when given, must not be empty"));
            }
            if columns.len() > config.max_read_columns {
                return Err(invalid(format!(
                    "too many read columns: {} (max {})",
                    columns.len(),
                    config.max_read_columns
                )));
            }
            let mut seen = HashSet::new();
            for column in columns {
                validate_identifier("column", column, config.max_identifier_len)?;
                if !seen.insert(column.as_str()) {
                    return Err(invalid(format!(
                        "field validation failed: read column {} is repeated",
                        column
                    )));
                }
                if filter_columns.contains(column.as_str()) {
                    return Err(invalid(format!(
                        "field validation failed: column {} is both a filter and a read column",
                        column
                    )));
                }
            }
        }

        if let Some(id) = &self.operation_id {
            let len = id.chars().count();
            if len == 0 || len > config.max_operation_id_len {
                return Err(invalid(format!(
                    "operation id must be 1 to {} characters",
                    config.max_operation_id_len
                )));
            }
        }

        Ok(())
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode into a request buffer of exactly `capacity` bytes
    pub fn encode(&self, capacity: usize) -> Result<Bytes> {
        if capacity > u32::MAX as usize {
            return Err(invalid(format!("capacity {} does not fit in 32 bits", capacity)));
        }

        let mut buf = BytesMut::with_capacity(capacity.max(HEADER_SIZE));
        buf.put_bytes(0, HEADER_SIZE);

        let db = put_c_str(&mut buf, &self.db)?;
        let table = put_c_str(&mut buf, &self.table)?;

        align(&mut buf);
        let pk_section = buf.len();
        buf.put_u32_le(self.filters.len() as u32);
        let pairs_table = buf.len();
        buf.put_bytes(0, ADDRESS_SIZE * self.filters.len());

        for (i, filter) in self.filters.iter().enumerate() {
            if filter.value.len() > u16::MAX as usize {
                return Err(invalid(format!(
                    "value for column {} is {} bytes (max {})",
                    filter.column,
                    filter.value.len(),
                    u16::MAX
                )));
            }

            align(&mut buf);
            let pair = buf.len();
            buf.put_bytes(0, 2 * ADDRESS_SIZE);

            let name = put_c_str(&mut buf, &filter.column)?;
            let value = buf.len();
            buf.put_u16_le(filter.value.len() as u16);
            buf.put_slice(&filter.value);

            patch(&mut buf, pairs_table + ADDRESS_SIZE * i, pair);
            patch(&mut buf, pair, name);
            patch(&mut buf, pair + ADDRESS_SIZE, value);
        }

        let read_section = match &self.read_columns {
            Some(columns) if !columns.is_empty() => {
                align(&mut buf);
                let section = buf.len();
                buf.put_u32_le(columns.len() as u32);
                let names_table = buf.len();
                buf.put_bytes(0, ADDRESS_SIZE * columns.len());
                for (i, column) in columns.iter().enumerate() {
                    let name = put_c_str(&mut buf, column)?;
                    patch(&mut buf, names_table + ADDRESS_SIZE * i, name);
                }
                section
            }
            _ => 0,
        };

        let operation_id = match &self.operation_id {
            Some(id) => put_c_str(&mut buf, id)?,
            None => 0,
        };

        let length = buf.len();
        if length > capacity {
            return Err(PkReadError::BufferOverflow {
                needed: length,
                remaining: capacity,
            });
        }

        let header = [
            (OP_TYPE_IDX, PK_REQ_ID as usize),
            (CAPACITY_IDX, capacity),
            (LENGTH_IDX, length),
            (DB_IDX, db),
            (TABLE_IDX, table),
            (PK_COLS_IDX, pk_section),
            (READ_COLS_IDX, read_section),
            (OP_ID_IDX, operation_id),
        ];
        for (index, value) in header {
            patch(&mut buf, index * ADDRESS_SIZE, value);
        }

        buf.resize(capacity, 0);
        Ok(buf.freeze())
    }
}

fn invalid(message: impl Into<String>) -> PkReadError {
    PkReadError::InvalidRequest(message.into())
}

/// 1..=max characters, each in U+0001..U+007F or U+0080..U+0FFF
fn validate_identifier(kind: &str, name: &str, max_len: usize) -> Result<()> {
    let len = name.chars().count();
    if len == 0 || len > max_len {
        return Err(invalid(format!(
            "{} name must be 1 to {} characters, got {}",
            kind, max_len, len
        )));
    }
    if let Some(c) = name.chars().find(|&c| !('\u{0001}'..='\u{0FFF}').contains(&c)) {
        return Err(invalid(format!(
            "{} name {:?} contains invalid character U+{:04X}",
            kind, name, c as u32
        )));
    }
    Ok(())
}

fn put_c_str(buf: &mut BytesMut, text: &str) -> Result<usize> {
    if text.as_bytes().contains(&0) {
        return Err(invalid(format!("{:?} contains a NUL byte", text)));
    }
    let offset = buf.len();
    buf.put_slice(text.as_bytes());
    buf.put_u8(0);
    Ok(offset)
}

fn align(buf: &mut BytesMut) {
    let rem = buf.len() % ADDRESS_SIZE;
    if rem != 0 {
        buf.put_bytes(0, ADDRESS_SIZE - rem);
    }
}

fn patch(buf: &mut BytesMut, at: usize, value: usize) {
    buf[at..at + ADDRESS_SIZE].copy_from_slice(&(value as u32).to_le_bytes());
}
