//! Table metadata and the catalog collaborator

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{PkReadError, Result};

use super::{ArrayType, ColumnDescriptor};

/// Resolves tables by (database, table) name
///
/// Implementations must be safe to share across threads; the lookup path
/// only ever reads from them.
pub trait Catalog: Send + Sync {
    /// Look up a table, `None` if the database or table is unknown
    fn table(&self, db: &str, table: &str) -> Option<Arc<TableSchema>>;
}

/// Metadata for one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    db: String,
    name: String,
    /// Columns in declaration order
    columns: Vec<ColumnDescriptor>,
    /// Indexes into `columns` for the primary key, in key order
    primary_key: Vec<usize>,
}

impl TableSchema {
    /// Start building a table
    pub fn builder(db: impl Into<String>, name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            db: db.into(),
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All columns in declaration order
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column in declaration order
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.iter().any(|&i| self.columns[i].name == name)
    }

    /// Primary-key columns in key order
    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.primary_key.iter().map(move |&i| &self.columns[i])
    }

    pub fn primary_key_count(&self) -> usize {
        self.primary_key.len()
    }

    /// Non-key columns in declaration order
    pub fn non_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.primary_key.contains(i))
            .map(|(_, c)| c)
    }
}

/// Builder for TableSchema
pub struct TableSchemaBuilder {
    db: String,
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Vec<String>,
}

impl TableSchemaBuilder {
    /// Add a non-key column
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a primary-key column (key order = call order)
    pub fn key_column(mut self, column: ColumnDescriptor) -> Self {
        self.primary_key.push(column.name.clone());
        self.columns.push(column.not_null());
        self
    }

    /// Validate and build the table
    pub fn build(self) -> Result<TableSchema> {
        if self.primary_key.is_empty() {
            return Err(PkReadError::Config(format!(
                "Table {}.{} has no primary key",
                self.db, self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(PkReadError::Config(format!(
                    "Table {}.{} declares column {} twice",
                    self.db, self.name, column.name
                )));
            }
            if column.array_type == ArrayType::ShortVar && column.length > u8::MAX as usize {
                return Err(PkReadError::Config(format!(
                    "Column {} is too long ({}) for a 1-byte length prefix",
                    column.name, column.length
                )));
            }
            if column.array_type == ArrayType::MediumVar && column.length > u16::MAX as usize {
                return Err(PkReadError::Config(format!(
                    "Column {} is too long ({}) for a 2-byte length prefix",
                    column.name, column.length
                )));
            }
        }

        let primary_key = self
            .primary_key
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .position(|c| &c.name == name)
                    .ok_or_else(|| PkReadError::Internal(format!("missing key column {}", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TableSchema {
            db: self.db,
            name: self.name,
            columns: self.columns,
            primary_key,
        })
    }
}
