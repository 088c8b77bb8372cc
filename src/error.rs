//! Error types for pkread
//!
//! Provides a unified error type for all operations, plus the coarse
//! category each error is reported under.

use thiserror::Error;

use crate::schema::ColumnType;
use crate::store::NativeError;

/// Result type alias using PkReadError
pub type Result<T> = std::result::Result<T, PkReadError>;

/// Where an unsupported column type was encountered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeUse {
    /// Used as primary-key material
    PrimaryKey,
    /// Named in the projection list
    Projection,
    /// Read back and being written into the response
    Response,
}

/// Coarse outcome category, mapped 1:1 onto HTTP-like codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Success,
    ClientError,
    NotFound,
    ServerError,
}

impl ErrorCategory {
    /// HTTP-equivalent status code
    pub fn http_code(self) -> u16 {
        match self {
            ErrorCategory::Success => 200,
            ErrorCategory::ClientError => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::ServerError => 500,
        }
    }
}

/// Unified error type for pkread operations
#[derive(Debug, Error)]
pub enum PkReadError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Malformed request: {0}")]
    Protocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database/Table does not exist. Database: {db} Table: {table}")]
    SchemaNotFound { db: String, table: String },

    #[error("Wrong primary-key columns: {0}")]
    KeyMismatch(String),

    #[error("Column does not exist. Column: {0}")]
    ColumnNotFound(String),

    #[error("Invalid column data. {expected} Column: {column}")]
    TypeMismatch { column: String, expected: String },

    #[error("Key for column {column} is {len} bytes, longer than the column maximum of {max}")]
    KeyTooLarge { column: String, len: usize, max: usize },

    #[error("Column type {column_type} is not supported here. Column: {column}")]
    UnsupportedType {
        column: String,
        column_type: ColumnType,
        usage: TypeUse,
    },

    // -------------------------------------------------------------------------
    // Response Errors
    // -------------------------------------------------------------------------
    #[error("Unable to copy data to the response buffer: need {needed} bytes, {remaining} remaining")]
    BufferOverflow { needed: usize, remaining: usize },

    #[error("Invalid string: {0}")]
    InvalidEncoding(String),

    // -------------------------------------------------------------------------
    // Storage Engine Errors
    // -------------------------------------------------------------------------
    #[error("{context}. {source}")]
    Engine {
        context: String,
        #[source]
        source: NativeError,
    },

    // -------------------------------------------------------------------------
    // Internal / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PkReadError {
    /// Helper for engine failures
    pub fn engine(context: impl Into<String>, source: NativeError) -> Self {
        PkReadError::Engine {
            context: context.into(),
            source,
        }
    }

    /// Helper for value validation failures
    pub fn type_mismatch(column: &str, expected: impl Into<String>) -> Self {
        PkReadError::TypeMismatch {
            column: column.to_string(),
            expected: expected.into(),
        }
    }

    /// The category this error is reported under
    pub fn category(&self) -> ErrorCategory {
        match self {
            PkReadError::Protocol(_)
            | PkReadError::InvalidRequest(_)
            | PkReadError::SchemaNotFound { .. }
            | PkReadError::KeyMismatch(_)
            | PkReadError::ColumnNotFound(_)
            | PkReadError::TypeMismatch { .. } => ErrorCategory::ClientError,

            PkReadError::UnsupportedType { usage, .. } => match usage {
                TypeUse::PrimaryKey | TypeUse::Projection => ErrorCategory::ClientError,
                TypeUse::Response => ErrorCategory::ServerError,
            },

            PkReadError::KeyTooLarge { .. } => ErrorCategory::NotFound,

            PkReadError::Io(_)
            | PkReadError::BufferOverflow { .. }
            | PkReadError::InvalidEncoding(_)
            | PkReadError::Engine { .. }
            | PkReadError::Internal(_)
            | PkReadError::Config(_) => ErrorCategory::ServerError,
        }
    }

    /// Native engine error, when the failure originated in the storage engine
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            PkReadError::Engine { source, .. } => Some(source),
            _ => None,
        }
    }
}
