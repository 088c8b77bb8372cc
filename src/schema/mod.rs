//! Schema Module
//!
//! Column and table metadata as handed out by the storage engine's catalog.
//!
//! ## Responsibilities
//! - Describe every storage column type the engine knows about
//! - Record how variable-length columns are laid out (array-storage kind)
//! - Group columns into tables with an ordered primary key
//!
//! Descriptors are immutable once built and shared through `Arc`, so a
//! lookup can hold on to them for the duration of a call.

mod catalog;
mod column;

pub use catalog::{Catalog, TableSchema, TableSchemaBuilder};
pub use column::{ArrayType, Charset, ColumnDescriptor, ColumnType};
