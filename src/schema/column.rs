//! Column descriptors
//!
//! Storage types, array-storage kinds and the per-column metadata that the
//! codec dispatches on.

use std::fmt;

use serde::Deserialize;

use crate::codec::decimal;

/// Storage column types known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Undefined,
    Tinyint,
    Tinyunsigned,
    Smallint,
    Smallunsigned,
    Mediumint,
    Mediumunsigned,
    Int,
    Unsigned,
    Bigint,
    Bigunsigned,
    Float,
    Double,
    Olddecimal,
    Olddecimalunsigned,
    Decimal,
    Decimalunsigned,
    Char,
    Varchar,
    Binary,
    Varbinary,
    Datetime,
    Date,
    Blob,
    Text,
    Bit,
    Longvarchar,
    Longvarbinary,
    Time,
    Year,
    Timestamp,
    Time2,
    Datetime2,
    Timestamp2,
}

impl ColumnType {
    /// Large-object columns, which this codec never reads back
    pub fn is_blob(self) -> bool {
        matches!(self, ColumnType::Blob | ColumnType::Text)
    }

    /// Character columns (rendered as quoted text)
    pub fn is_character(self) -> bool {
        matches!(
            self,
            ColumnType::Char | ColumnType::Varchar | ColumnType::Longvarchar
        )
    }

    /// Binary columns (rendered as base64)
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            ColumnType::Binary | ColumnType::Varbinary | ColumnType::Longvarbinary
        )
    }

    /// Native width in bytes of fixed-size numeric types
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ColumnType::Tinyint | ColumnType::Tinyunsigned => Some(1),
            ColumnType::Smallint | ColumnType::Smallunsigned => Some(2),
            ColumnType::Mediumint | ColumnType::Mediumunsigned => Some(3),
            ColumnType::Int | ColumnType::Unsigned | ColumnType::Float => Some(4),
            ColumnType::Bigint | ColumnType::Bigunsigned | ColumnType::Double => Some(8),
            _ => None,
        }
    }

    /// Default array-storage kind for the type
    pub fn default_array_type(self) -> ArrayType {
        match self {
            ColumnType::Varchar | ColumnType::Varbinary => ArrayType::ShortVar,
            ColumnType::Longvarchar | ColumnType::Longvarbinary => ArrayType::MediumVar,
            _ => ArrayType::Fixed,
        }
    }

    /// Lowercase type name
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Undefined => "undefined",
            ColumnType::Tinyint => "tinyint",
            ColumnType::Tinyunsigned => "tinyunsigned",
            ColumnType::Smallint => "smallint",
            ColumnType::Smallunsigned => "smallunsigned",
            ColumnType::Mediumint => "mediumint",
            ColumnType::Mediumunsigned => "mediumunsigned",
            ColumnType::Int => "int",
            ColumnType::Unsigned => "unsigned",
            ColumnType::Bigint => "bigint",
            ColumnType::Bigunsigned => "bigunsigned",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Olddecimal => "olddecimal",
            ColumnType::Olddecimalunsigned => "olddecimalunsigned",
            ColumnType::Decimal => "decimal",
            ColumnType::Decimalunsigned => "decimalunsigned",
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::Binary => "binary",
            ColumnType::Varbinary => "varbinary",
            ColumnType::Datetime => "datetime",
            ColumnType::Date => "date",
            ColumnType::Blob => "blob",
            ColumnType::Text => "text",
            ColumnType::Bit => "bit",
            ColumnType::Longvarchar => "longvarchar",
            ColumnType::Longvarbinary => "longvarbinary",
            ColumnType::Time => "time",
            ColumnType::Year => "year",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Time2 => "time2",
            ColumnType::Datetime2 => "datetime2",
            ColumnType::Timestamp2 => "timestamp2",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How array columns are laid out in native form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayType {
    /// No length prefix; value padded to the declared length
    Fixed,
    /// 1-byte length prefix, max 255 bytes
    ShortVar,
    /// 2-byte little-endian length prefix
    MediumVar,
}

impl ArrayType {
    /// Size of the length prefix in bytes
    pub fn prefix_len(self) -> usize {
        match self {
            ArrayType::Fixed => 0,
            ArrayType::ShortVar => 1,
            ArrayType::MediumVar => 2,
        }
    }
}

/// Character set of a character column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    #[default]
    Utf8mb4,
    Utf8mb3,
    Latin1,
    Ascii,
    Binary,
}

/// Metadata for a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Storage type
    pub column_type: ColumnType,

    /// Maximum payload length in bytes (array columns) or native width
    pub length: usize,

    /// Array-storage kind
    pub array_type: ArrayType,

    /// Decimal precision (total digits)
    pub precision: u32,

    /// Decimal scale (fractional digits)
    pub scale: u32,

    /// Character set for character columns
    pub charset: Charset,

    /// Whether the column may hold NULL
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Create a descriptor with the type's defaults
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: column_type.fixed_width().unwrap_or(0),
            array_type: column_type.default_array_type(),
            precision: 0,
            scale: 0,
            charset: if column_type.is_binary() {
                Charset::Binary
            } else {
                Charset::default()
            },
            nullable: true,
        }
    }

    /// Character or binary column with a maximum payload length in bytes
    pub fn array(name: impl Into<String>, column_type: ColumnType, length: usize) -> Self {
        Self::new(name, column_type).with_length(length)
    }

    /// Decimal column with the given precision and scale
    pub fn decimal(name: impl Into<String>, precision: u32, scale: u32) -> Self {
        Self::new(name, ColumnType::Decimal).with_precision(precision, scale)
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_array_type(mut self, array_type: ArrayType) -> Self {
        self.array_type = array_type;
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self.length = decimal::binary_size(precision, scale);
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Bytes the column occupies in native form, including any length prefix
    pub fn size_in_bytes(&self) -> usize {
        self.length + self.array_type.prefix_len()
    }
}
