//! Store Module
//!
//! The storage engine's transaction API, as consumed by a primary-key read.
//!
//! ## Responsibilities
//! - Begin a transaction against a table
//! - Register equality predicates and read-back columns
//! - Execute (commit) or roll back, and report native errors
//! - Hand back read attributes in native form
//!
//! The engine itself is an external collaborator. `memory` provides an
//! in-process implementation used by the server binary and the tests.
//!
//! ## Native Attribute Layout
//! ```text
//! Fixed     ┌──────────────────────────────┐
//!           │ data (padded to length)      │
//!           └──────────────────────────────┘
//! ShortVar  ┌────────┬─────────────────────┐
//!           │ Len(1) │ data                │
//!           └────────┴─────────────────────┘
//! MediumVar ┌────────┬─────────────────────┐
//!           │ Len(2) │ data                │  (little-endian length)
//!           └────────┴─────────────────────┘
//! ```

pub mod memory;

use serde::Serialize;
use thiserror::Error;

use crate::schema::{ColumnDescriptor, TableSchema};

pub use memory::{Fault, MemoryStore};

/// Native error classification reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    NoError,
    ApplicationError,
    NoDataFound,
    ConstraintViolation,
    SchemaError,
    TemporaryResourceError,
    NodeRecoveryError,
    InternalError,
    TimeoutExpired,
    UnknownResultError,
}

/// Native error status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeStatus {
    Success,
    TemporaryError,
    PermanentError,
    UnknownResult,
}

/// An error as reported by the storage engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error: code: {code} MySQL Code: {mysql_code} Message: {message}")]
pub struct NativeError {
    pub code: i32,
    pub mysql_code: i32,
    pub status: NativeStatus,
    pub classification: Classification,
    pub message: String,
}

impl NativeError {
    pub fn new(code: i32, classification: Classification, message: impl Into<String>) -> Self {
        let status = match classification {
            Classification::NoError => NativeStatus::Success,
            Classification::TemporaryResourceError
            | Classification::NodeRecoveryError
            | Classification::TimeoutExpired => NativeStatus::TemporaryError,
            Classification::UnknownResultError => NativeStatus::UnknownResult,
            _ => NativeStatus::PermanentError,
        };
        Self {
            code,
            mysql_code: -1,
            status,
            classification,
            message: message.into(),
        }
    }

    /// "Tuple did not exist"
    pub fn no_data_found() -> Self {
        Self {
            mysql_code: 120,
            ..Self::new(626, Classification::NoDataFound, "Tuple did not exist")
        }
    }

    pub fn is_no_data_found(&self) -> bool {
        self.classification == Classification::NoDataFound
    }
}

/// Native result type for collaborator calls
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Commit state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    NotStarted,
    Started,
    Committed,
    Aborted,
    NeedAbort,
}

/// What `execute` should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecType {
    NoCommit,
    Commit,
    Rollback,
}

/// Handle to a registered read-back column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrHandle(pub usize);

/// A read-back attribute in native form
#[derive(Debug, Clone, PartialEq)]
pub struct RecAttr {
    /// Native bytes, `None` for SQL NULL
    value: Option<Vec<u8>>,
}

impl RecAttr {
    pub fn new(value: Option<Vec<u8>>) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self { value: None }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Native bytes (empty for NULL)
    pub fn bytes(&self) -> &[u8] {
        self.value.as_deref().unwrap_or(&[])
    }
}

/// Transaction lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub started: u64,
    pub closed: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

/// A storage engine that can open transactions
pub trait Store: Send + Sync {
    /// Begin a transaction hinted at `table`
    fn start_transaction(&self, table: &TableSchema) -> NativeResult<Box<dyn Transaction>>;

    /// Transaction counters since the store was created
    fn stats(&self) -> StoreStats;
}

/// One open transaction carrying a single primary-key read operation
pub trait Transaction: Send {
    /// Register an equality predicate in native form
    fn equal(&mut self, column: &ColumnDescriptor, value: &[u8]) -> NativeResult<()>;

    /// Register a column for read-back
    fn get_value(&mut self, column: &ColumnDescriptor) -> NativeResult<AttrHandle>;

    /// Execute the staged operation
    fn execute(&mut self, exec: ExecType) -> NativeResult<()>;

    /// Most recent error, if any
    fn last_error(&self) -> Option<&NativeError>;

    fn commit_status(&self) -> CommitStatus;

    /// Value read back for a handle (available after a successful execute)
    fn attribute(&self, handle: AttrHandle) -> Option<&RecAttr>;

    /// Release the transaction
    fn close(self: Box<Self>);
}
