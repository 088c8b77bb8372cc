//! Request buffer layout constants

/// Size of one header word / section offset
pub const ADDRESS_SIZE: usize = 4;

/// Operation type: primary-key read
pub const PK_REQ_ID: u32 = 1;

/// Operation type: batch (reserved)
pub const BATCH_REQ_ID: u32 = 2;

// Header word indexes
pub const OP_TYPE_IDX: usize = 0;
pub const CAPACITY_IDX: usize = 1;
pub const LENGTH_IDX: usize = 2;
pub const DB_IDX: usize = 3;
pub const TABLE_IDX: usize = 4;
pub const PK_COLS_IDX: usize = 5;
pub const READ_COLS_IDX: usize = 6;
pub const OP_ID_IDX: usize = 7;

/// Number of header words
pub const HEADER_WORDS: usize = 8;

/// Header size in bytes
pub const HEADER_SIZE: usize = HEADER_WORDS * ADDRESS_SIZE;

/// Size of the little-endian length prefix of a wire value
pub const VALUE_PREFIX_SIZE: usize = 2;
