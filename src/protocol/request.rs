//! Request decoding
//!
//! `RequestView` is a read-only view over a caller-owned request buffer.
//! Nothing is parsed up front beyond the header; every accessor follows
//! offsets on demand and checks them against the buffer bounds.
//!
//! The bound is the smaller of the capacity recorded in the header and the
//! length of the slice actually handed in, so a lying header can never make
//! the view read past the caller's memory.

use crate::error::{PkReadError, Result};

use super::layout::*;

/// One length-prefixed wire value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkValue<'a> {
    region: &'a [u8],
}

impl<'a> PkValue<'a> {
    /// Length recorded in the two-byte prefix
    pub fn declared_len(&self) -> usize {
        u16::from_le_bytes([self.region[0], self.region[1]]) as usize
    }

    /// Value bytes after the prefix
    pub fn payload(&self) -> &'a [u8] {
        &self.region[VALUE_PREFIX_SIZE..]
    }

    /// Prefix and payload together
    pub fn as_bytes(&self) -> &'a [u8] {
        self.region
    }
}

/// Bounds-checked view over a binary request
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    buf: &'a [u8],
}

impl<'a> RequestView<'a> {
    /// Wrap a request buffer
    ///
    /// Fails if the buffer (or the capacity it declares) cannot hold the
    /// fixed header.
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(PkReadError::Protocol(format!(
                "Request is {} bytes, shorter than the {} byte header",
                buf.len(),
                HEADER_SIZE
            )));
        }

        let declared = read_u32(buf, CAPACITY_IDX * ADDRESS_SIZE) as usize;
        if declared < HEADER_SIZE {
            return Err(PkReadError::Protocol(format!(
                "Request capacity {} is smaller than the header",
                declared
            )));
        }

        let bound = declared.min(buf.len());
        Ok(Self { buf: &buf[..bound] })
    }

    // -------------------------------------------------------------------------
    // Header
    // -------------------------------------------------------------------------

    pub fn operation_type(&self) -> u32 {
        self.header(OP_TYPE_IDX)
    }

    /// Capacity as recorded in the header
    pub fn capacity(&self) -> u32 {
        self.header(CAPACITY_IDX)
    }

    /// Bytes in use as recorded in the header
    pub fn length(&self) -> u32 {
        self.header(LENGTH_IDX)
    }

    pub fn db(&self) -> Result<&'a str> {
        self.c_str(self.header(DB_IDX) as usize, "database name")
    }

    pub fn table(&self) -> Result<&'a str> {
        self.c_str(self.header(TABLE_IDX) as usize, "table name")
    }

    /// Operation id, `None` when the slot is zero
    pub fn operation_id(&self) -> Result<Option<&'a str>> {
        match self.header(OP_ID_IDX) as usize {
            0 => Ok(None),
            offset => self.c_str(offset, "operation id").map(Some),
        }
    }

    // -------------------------------------------------------------------------
    // Primary-key section
    // -------------------------------------------------------------------------

    pub fn pk_columns_count(&self) -> Result<usize> {
        let section = self.section(self.header(PK_COLS_IDX) as usize, "primary-key section")?;
        Ok(self.word(section)? as usize)
    }

    pub fn pk_name(&self, index: usize) -> Result<&'a str> {
        let kv = self.pk_pair(index)?;
        let name = self.word(kv)? as usize;
        self.c_str(name, "primary-key column name")
    }

    pub fn pk_value(&self, index: usize) -> Result<PkValue<'a>> {
        let kv = self.pk_pair(index)?;
        let offset = self.word(kv + ADDRESS_SIZE)? as usize;
        self.check_offset(offset, "primary-key value")?;

        let prefix = self
            .buf
            .get(offset..offset + VALUE_PREFIX_SIZE)
            .ok_or_else(|| out_of_bounds("primary-key value length", offset))?;
        let declared = u16::from_le_bytes([prefix[0], prefix[1]]) as usize;

        let end = offset + VALUE_PREFIX_SIZE + declared;
        let region = self.buf.get(offset..end).ok_or_else(|| {
            PkReadError::Protocol(format!(
                "Primary-key value {} declares {} bytes, past the end of the request",
                index, declared
            ))
        })?;
        Ok(PkValue { region })
    }

    /// Offset of the [name-offset][value-offset] pair for key `index`
    fn pk_pair(&self, index: usize) -> Result<usize> {
        let section = self.section(self.header(PK_COLS_IDX) as usize, "primary-key section")?;
        let count = self.word(section)? as usize;
        if index >= count {
            return Err(PkReadError::Protocol(format!(
                "Primary-key index {} out of range ({} columns)",
                index, count
            )));
        }
        let kv = self.word(section + ADDRESS_SIZE * (index + 1))? as usize;
        self.section(kv, "primary-key pair")
    }

    // -------------------------------------------------------------------------
    // Read-columns section
    // -------------------------------------------------------------------------

    /// Number of projected columns, 0 when the section is absent
    pub fn read_columns_count(&self) -> Result<usize> {
        match self.header(READ_COLS_IDX) as usize {
            0 => Ok(0),
            offset => {
                let section = self.section(offset, "read-columns section")?;
                Ok(self.word(section)? as usize)
            }
        }
    }

    pub fn read_column_name(&self, index: usize) -> Result<&'a str> {
        let count = self.read_columns_count()?;
        if index >= count {
            return Err(PkReadError::Protocol(format!(
                "Read-column index {} out of range ({} columns)",
                index, count
            )));
        }
        let section = self.header(READ_COLS_IDX) as usize;
        let name = self.word(section + ADDRESS_SIZE * (index + 1))? as usize;
        self.c_str(name, "read-column name")
    }

    // -------------------------------------------------------------------------
    // Bounds-checked primitives
    // -------------------------------------------------------------------------

    fn header(&self, index: usize) -> u32 {
        read_u32(self.buf, index * ADDRESS_SIZE)
    }

    fn word(&self, offset: usize) -> Result<u32> {
        if offset + ADDRESS_SIZE > self.buf.len() {
            return Err(out_of_bounds("word", offset));
        }
        Ok(read_u32(self.buf, offset))
    }

    fn check_offset(&self, offset: usize, what: &str) -> Result<()> {
        if offset < HEADER_SIZE || offset >= self.buf.len() {
            return Err(out_of_bounds(what, offset));
        }
        Ok(())
    }

    /// A word-addressed section: inside the body and 4-byte aligned
    fn section(&self, offset: usize, what: &str) -> Result<usize> {
        self.check_offset(offset, what)?;
        if offset % ADDRESS_SIZE != 0 {
            return Err(PkReadError::Protocol(format!(
                "{} at offset {} is not {}-byte aligned",
                what, offset, ADDRESS_SIZE
            )));
        }
        Ok(offset)
    }

    fn c_str(&self, offset: usize, what: &str) -> Result<&'a str> {
        self.check_offset(offset, what)?;
        let rest = &self.buf[offset..];
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            PkReadError::Protocol(format!("{} at offset {} is not NUL-terminated", what, offset))
        })?;
        std::str::from_utf8(&rest[..nul]).map_err(|e| {
            PkReadError::Protocol(format!("{} at offset {} is not UTF-8: {}", what, offset, e))
        })
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn out_of_bounds(what: &str, offset: usize) -> PkReadError {
    PkReadError::Protocol(format!("{} offset {} is out of bounds", what, offset))
}
