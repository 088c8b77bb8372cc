//! In-memory store
//!
//! A process-local implementation of `Catalog` and `Store`. Rows are kept in
//! native form, keyed by the concatenated native primary-key values, so the
//! lookup path exercises the same marshalling it would against a cluster.
//!
//! ## Concurrency Model
//! - Table map behind a `parking_lot::RwLock`
//! - Transactions take a read lock only for the duration of `execute`
//! - Lifecycle counters are atomics, readable via `stats()`

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::codec;
use crate::error::{PkReadError, Result};
use crate::schema::{ArrayType, Catalog, Charset, ColumnDescriptor, ColumnType, TableSchema};

use super::{
    AttrHandle, Classification, CommitStatus, ExecType, NativeError, NativeResult, RecAttr, Store,
    StoreStats, Transaction,
};

/// Engine failures the store can be told to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    StartTransaction,
    GetValue,
    Execute,
}

type Row = Vec<Option<Vec<u8>>>;

struct MemoryTable {
    schema: Arc<TableSchema>,
    rows: BTreeMap<Vec<u8>, Row>,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<HashMap<(String, String), MemoryTable>>,
    fault: Mutex<Option<Fault>>,
    started: AtomicU64,
    closed: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl Inner {
    fn fault(&self, fault: Fault) -> bool {
        *self.fault.lock() == Some(fault)
    }
}

/// In-memory catalog and store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        let key = (schema.db().to_string(), schema.name().to_string());
        let mut tables = self.inner.tables.write();
        if tables.contains_key(&key) {
            return Err(PkReadError::Config(format!(
                "Table {}.{} already exists",
                key.0, key.1
            )));
        }
        tracing::debug!("Created table {}.{}", key.0, key.1);
        tables.insert(
            key,
            MemoryTable {
                schema: Arc::new(schema),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Insert (or replace) a row given as textual values
    ///
    /// Columns not named are NULL. Values use the wire conventions: numerals,
    /// decimal literals, plain text, base64 for binary columns.
    pub fn insert(&self, db: &str, table: &str, values: &[(&str, Option<&str>)]) -> Result<()> {
        let mut tables = self.inner.tables.write();
        let entry = tables
            .get_mut(&(db.to_string(), table.to_string()))
            .ok_or_else(|| PkReadError::SchemaNotFound {
                db: db.to_string(),
                table: table.to_string(),
            })?;
        let schema = Arc::clone(&entry.schema);

        for (name, _) in values {
            if schema.column(name).is_none() {
                return Err(PkReadError::ColumnNotFound(name.to_string()));
            }
        }

        let mut row: Row = Vec::with_capacity(schema.columns().len());
        for column in schema.columns() {
            let text = values
                .iter()
                .find(|(name, _)| *name == column.name)
                .and_then(|(_, value)| *value);
            match text {
                Some(text) => row.push(Some(codec::encode_native(column, text)?)),
                None if column.nullable => row.push(None),
                None => {
                    return Err(PkReadError::InvalidRequest(format!(
                        "Column {} may not be NULL",
                        column.name
                    )))
                }
            }
        }

        let mut key = Vec::new();
        for column in schema.primary_key() {
            let index = schema
                .column_index(&column.name)
                .ok_or_else(|| PkReadError::ColumnNotFound(column.name.clone()))?;
            if let Some(native) = &row[index] {
                key.extend_from_slice(native);
            }
        }

        entry.rows.insert(key, row);
        Ok(())
    }

    pub fn row_count(&self, db: &str, table: &str) -> Option<usize> {
        self.inner
            .tables
            .read()
            .get(&(db.to_string(), table.to_string()))
            .map(|t| t.rows.len())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            started: self.inner.started.load(Ordering::Relaxed),
            closed: self.inner.closed.load(Ordering::Relaxed),
            committed: self.inner.committed.load(Ordering::Relaxed),
            rolled_back: self.inner.rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Make every later call of the given kind fail
    pub fn inject_fault(&self, fault: Fault) {
        *self.inner.fault.lock() = Some(fault);
    }

    pub fn clear_fault(&self) {
        *self.inner.fault.lock() = None;
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    /// Build a store from a JSON fixture file
    pub fn load_fixture(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_fixture_str(&text)
    }

    /// Build a store from a JSON fixture document
    ///
    /// ```text
    /// {"tables": [{"db": "test", "table": "t",
    ///              "columns": [{"name": "id", "type": "int", "primaryKey": true}, ...],
    ///              "rows": [{"id": 1, "name": "alice"}, ...]}]}
    /// ```
    pub fn from_fixture_str(text: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(text)
            .map_err(|e| PkReadError::Config(format!("Invalid fixture: {}", e)))?;

        let store = Self::new();
        for table in fixture.tables {
            let mut builder = TableSchema::builder(&table.db, &table.table);
            for fixture_column in table.columns {
                let primary_key = fixture_column.primary_key;
                let column = fixture_column.into_descriptor();
                builder = if primary_key {
                    builder.key_column(column)
                } else {
                    builder.column(column)
                };
            }
            store.create_table(builder.build()?)?;

            for row in &table.rows {
                let texts = row
                    .iter()
                    .map(|(name, value)| fixture_text(name, value).map(|t| (name.as_str(), t)))
                    .collect::<Result<Vec<_>>>()?;
                let values: Vec<(&str, Option<&str>)> = texts
                    .iter()
                    .map(|(name, text)| (*name, text.as_deref()))
                    .collect();
                store.insert(&table.db, &table.table, &values)?;
            }
        }
        Ok(store)
    }
}

#[derive(Deserialize)]
struct Fixture {
    tables: Vec<TableFixture>,
}

#[derive(Deserialize)]
struct TableFixture {
    db: String,
    table: String,
    columns: Vec<ColumnFixture>,
    #[serde(default)]
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnFixture {
    name: String,
    #[serde(rename = "type")]
    column_type: ColumnType,
    length: Option<usize>,
    array_type: Option<ArrayType>,
    precision: Option<u32>,
    scale: Option<u32>,
    charset: Option<Charset>,
    #[serde(default)]
    primary_key: bool,
    #[serde(default = "default_nullable")]
    nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnFixture {
    fn into_descriptor(self) -> ColumnDescriptor {
        let mut column = ColumnDescriptor::new(self.name, self.column_type);
        if let Some(length) = self.length {
            column = column.with_length(length);
        }
        if let Some(array_type) = self.array_type {
            column = column.with_array_type(array_type);
        }
        if let Some(precision) = self.precision {
            column = column.with_precision(precision, self.scale.unwrap_or(0));
        }
        if let Some(charset) = self.charset {
            column = column.with_charset(charset);
        }
        if !self.nullable {
            column = column.not_null();
        }
        column
    }
}

fn fixture_text(column: &str, value: &serde_json::Value) -> Result<Option<String>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s.clone())),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::Bool(b) => Ok(Some(if *b { "1" } else { "0" }.to_string())),
        _ => Err(PkReadError::Config(format!(
            "Fixture value for column {} must be a string, number, bool or null",
            column
        ))),
    }
}

// =============================================================================
// Collaborator implementations
// =============================================================================

impl Catalog for MemoryStore {
    fn table(&self, db: &str, table: &str) -> Option<Arc<TableSchema>> {
        self.inner
            .tables
            .read()
            .get(&(db.to_string(), table.to_string()))
            .map(|t| Arc::clone(&t.schema))
    }
}

impl Store for MemoryStore {
    fn start_transaction(&self, table: &TableSchema) -> NativeResult<Box<dyn Transaction>> {
        if self.inner.fault(Fault::StartTransaction) {
            return Err(NativeError::new(
                4009,
                Classification::UnknownResultError,
                "Cluster Failure",
            ));
        }

        let schema = Catalog::table(self, table.db(), table.name()).ok_or_else(|| {
            NativeError::new(723, Classification::SchemaError, "No such table existed")
        })?;

        self.inner.started.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            schema,
            equalities: Vec::new(),
            reads: Vec::new(),
            values: Vec::new(),
            status: CommitStatus::NotStarted,
            last_error: None,
        }))
    }

    fn stats(&self) -> StoreStats {
        MemoryStore::stats(self)
    }
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    schema: Arc<TableSchema>,
    /// (column name, native value)
    equalities: Vec<(String, Vec<u8>)>,
    /// Column indexes registered for read-back
    reads: Vec<usize>,
    values: Vec<RecAttr>,
    status: CommitStatus,
    last_error: Option<NativeError>,
}

impl MemoryTransaction {
    fn record(&mut self, err: NativeError) -> NativeError {
        self.status = CommitStatus::Aborted;
        self.last_error = Some(err.clone());
        err
    }

    fn start(&mut self) {
        if self.status == CommitStatus::NotStarted {
            self.status = CommitStatus::Started;
        }
    }

    fn key(&self) -> NativeResult<Vec<u8>> {
        let mut key = Vec::new();
        for column in self.schema.primary_key() {
            let (_, value) = self
                .equalities
                .iter()
                .find(|(name, _)| *name == column.name)
                .ok_or_else(|| {
                    NativeError::new(
                        4259,
                        Classification::ApplicationError,
                        format!("Primary-key column {} has no equality bound", column.name),
                    )
                })?;
            key.extend_from_slice(value);
        }
        Ok(key)
    }

    fn read_row(&mut self) -> NativeResult<()> {
        let key = self.key()?;
        let tables = self.inner.tables.read();
        let table = tables
            .get(&(self.schema.db().to_string(), self.schema.name().to_string()))
            .ok_or_else(|| {
                NativeError::new(
                    284,
                    Classification::SchemaError,
                    "Table not defined in transaction coordinator",
                )
            })?;

        match table.rows.get(&key) {
            Some(row) => {
                self.values = self
                    .reads
                    .iter()
                    .map(|&index| RecAttr::new(row.get(index).cloned().flatten()))
                    .collect();
                Ok(())
            }
            None => Err(NativeError::no_data_found()),
        }
    }
}

impl Transaction for MemoryTransaction {
    fn equal(&mut self, column: &ColumnDescriptor, value: &[u8]) -> NativeResult<()> {
        self.start();
        self.equalities.push((column.name.clone(), value.to_vec()));
        Ok(())
    }

    fn get_value(&mut self, column: &ColumnDescriptor) -> NativeResult<AttrHandle> {
        self.start();
        if self.inner.fault(Fault::GetValue) {
            return Err(self.record(NativeError::new(
                4004,
                Classification::SchemaError,
                "Attribute name or id not found in the table",
            )));
        }
        let index = self.schema.column_index(&column.name).ok_or_else(|| {
            NativeError::new(
                4004,
                Classification::SchemaError,
                "Attribute name or id not found in the table",
            )
        })?;
        self.reads.push(index);
        Ok(AttrHandle(self.reads.len() - 1))
    }

    fn execute(&mut self, exec: ExecType) -> NativeResult<()> {
        match exec {
            ExecType::Rollback => {
                self.status = CommitStatus::Aborted;
                self.inner.rolled_back.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            ExecType::NoCommit | ExecType::Commit => {
                self.start();
                if self.inner.fault(Fault::Execute) {
                    // the engine leaves the transaction open for an explicit rollback
                    let err = NativeError::new(
                        4010,
                        Classification::NodeRecoveryError,
                        "Node failure caused abort of transaction",
                    );
                    self.last_error = Some(err.clone());
                    return Err(err);
                }
                if let Err(err) = self.read_row() {
                    return Err(self.record(err));
                }
                if exec == ExecType::Commit {
                    self.status = CommitStatus::Committed;
                    self.inner.committed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }
        }
    }

    fn last_error(&self) -> Option<&NativeError> {
        self.last_error.as_ref()
    }

    fn commit_status(&self) -> CommitStatus {
        self.status
    }

    fn attribute(&self, handle: AttrHandle) -> Option<&RecAttr> {
        self.values.get(handle.0)
    }

    fn close(self: Box<Self>) {
        self.inner.closed.fetch_add(1, Ordering::Relaxed);
    }
}
