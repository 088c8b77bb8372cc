//! Primary-key read operation
//!
//! Drives a single point lookup from a decoded request to a finished
//! response document.
//!
//! ## State Machine
//! ```text
//! Init ─▶ Validated ─▶ TransactionOpen ─▶ OperationStaged ─▶ Executed ─▶ ResponseBuilt ─▶ Closed
//!   │          │               │                  │               │              │
//!   └──────────┴───────────────┴──────────────────┴───────────────┴──────────────┴──▶ Aborted
//! ```
//!
//! ## Invariants
//! - No transaction is opened before the request passes validation
//! - The transaction is closed exactly once, on every path
//! - Rollback is issued only while the commit status is `Started`
//! - An aborted lookup leaves an empty response document

use std::collections::HashSet;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::codec;
use crate::error::{PkReadError, Result, TypeUse};
use crate::protocol::layout::{BATCH_REQ_ID, PK_REQ_ID};
use crate::protocol::{RequestView, ResponseBuilder};
use crate::schema::{Catalog, TableSchema};
use crate::store::{AttrHandle, CommitStatus, ExecType, Store, Transaction};

/// Lifecycle states of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupState {
    Init,
    Validated,
    TransactionOpen,
    OperationStaged,
    Executed,
    ResponseBuilt,
    Closed,
    Aborted,
}

impl fmt::Display for LookupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupState::Init => "init",
            LookupState::Validated => "validated",
            LookupState::TransactionOpen => "transaction-open",
            LookupState::OperationStaged => "operation-staged",
            LookupState::Executed => "executed",
            LookupState::ResponseBuilt => "response-built",
            LookupState::Closed => "closed",
            LookupState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Where a lookup failed: the last state reached and the failing transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureSite {
    pub state: LookupState,
    pub location: &'static Location<'static>,
}

/// Result of a lookup that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Row found; the document (without its NUL) is `bytes_written` long
    Found { bytes_written: usize },
    /// No row matched; nothing was written
    NotFound,
}

/// One primary-key read over caller-owned buffers
pub struct PkReadOperation<'a> {
    request: RequestView<'a>,
    response: ResponseBuilder<'a>,
    catalog: &'a dyn Catalog,
    store: &'a dyn Store,

    state: LookupState,
    table: Option<Arc<TableSchema>>,
    /// Projected columns, as indexes into the table's columns
    projection: Vec<usize>,
    transaction: Option<Box<dyn Transaction>>,
    reads: Vec<(usize, AttrHandle)>,
    failure: Option<FailureSite>,
}

impl<'a> PkReadOperation<'a> {
    pub fn new(
        request: RequestView<'a>,
        response: ResponseBuilder<'a>,
        catalog: &'a dyn Catalog,
        store: &'a dyn Store,
    ) -> Self {
        Self {
            request,
            response,
            catalog,
            store,
            state: LookupState::Init,
            table: None,
            projection: Vec::new(),
            transaction: None,
            reads: Vec::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> LookupState {
        self.state
    }

    /// Where the last `perform` failed, if it did
    pub fn failure(&self) -> Option<FailureSite> {
        self.failure
    }

    pub fn response(&self) -> &ResponseBuilder<'a> {
        &self.response
    }

    /// Run the lookup to completion
    ///
    /// On error the transaction (if any) has been rolled back and closed and
    /// the response document is empty.
    pub fn perform(&mut self) -> Result<LookupOutcome> {
        match self.run() {
            Ok(outcome) => {
                self.release();
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("Primary-key read aborted in state {}: {}", self.state, e);
                self.abort();
                Err(e)
            }
        }
    }

    fn run(&mut self) -> Result<LookupOutcome> {
        self.init().map_err(|e| self.fail(e))?;
        self.validate().map_err(|e| self.fail(e))?;
        self.begin().map_err(|e| self.fail(e))?;

        match self.stage() {
            Ok(()) => {}
            Err(PkReadError::KeyTooLarge { column, len, max }) => {
                tracing::debug!(
                    "Key for {} is {} bytes (max {}), no row can match",
                    column,
                    len,
                    max
                );
                // nothing staged or executed; `perform` closes the transaction
                return Ok(LookupOutcome::NotFound);
            }
            Err(e) => return Err(self.fail(e)),
        }

        if !self.execute().map_err(|e| self.fail(e))? {
            return Ok(LookupOutcome::NotFound);
        }

        let bytes_written = self.build_response().map_err(|e| self.fail(e))?;
        Ok(LookupOutcome::Found { bytes_written })
    }

    #[track_caller]
    fn fail(&mut self, err: PkReadError) -> PkReadError {
        self.failure = Some(FailureSite {
            state: self.state,
            location: Location::caller(),
        });
        err
    }

    fn table(&self) -> Result<Arc<TableSchema>> {
        self.table
            .clone()
            .ok_or_else(|| PkReadError::Internal("table metadata not resolved".to_string()))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Check the operation type and resolve the table
    fn init(&mut self) -> Result<()> {
        match self.request.operation_type() {
            PK_REQ_ID => {}
            BATCH_REQ_ID => {
                return Err(PkReadError::Protocol(
                    "Batch operations are not supported".to_string(),
                ))
            }
            other => {
                return Err(PkReadError::Protocol(format!(
                    "Wrong operation type. Expecting: {} Got: {}",
                    PK_REQ_ID, other
                )))
            }
        }

        let db = self.request.db()?;
        let table = self.request.table()?;
        let schema = self
            .catalog
            .table(db, table)
            .ok_or_else(|| PkReadError::SchemaNotFound {
                db: db.to_string(),
                table: table.to_string(),
            })?;

        tracing::debug!("Resolved table {}.{}", db, table);
        self.table = Some(schema);
        Ok(())
    }

    /// Check key columns and projection against the table
    fn validate(&mut self) -> Result<()> {
        let table = self.table()?;

        let count = self.request.pk_columns_count()?;
        if count != table.primary_key_count() {
            return Err(PkReadError::KeyMismatch(format!(
                "Wrong number of primary-key columns. Expecting: {} Got: {}",
                table.primary_key_count(),
                count
            )));
        }

        let mut seen = HashSet::with_capacity(count);
        for i in 0..count {
            let name = self.request.pk_name(i)?;
            if !table.is_primary_key(name) {
                return Err(PkReadError::KeyMismatch(format!(
                    "Column {} is not part of the primary key",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(PkReadError::KeyMismatch(format!(
                    "Primary-key column {} is given more than once",
                    name
                )));
            }
        }

        let read_count = self.request.read_columns_count()?;
        let mut projection = Vec::with_capacity(read_count.max(table.columns().len()));

        if read_count == 0 {
            for (index, column) in table.columns().iter().enumerate() {
                if table.is_primary_key(&column.name) {
                    continue;
                }
                if column.column_type.is_blob() {
                    return Err(unsupported_projection(&column.name, column.column_type));
                }
                projection.push(index);
            }
        } else {
            let mut seen = HashSet::with_capacity(read_count);
            for i in 0..read_count {
                let name = self.request.read_column_name(i)?;
                let index = table
                    .column_index(name)
                    .filter(|_| !table.is_primary_key(name))
                    .ok_or_else(|| PkReadError::ColumnNotFound(name.to_string()))?;
                let column = &table.columns()[index];
                if column.column_type.is_blob() {
                    return Err(unsupported_projection(name, column.column_type));
                }
                if !seen.insert(index) {
                    return Err(PkReadError::InvalidRequest(format!(
                        "Read column {} is given more than once",
                        name
                    )));
                }
                projection.push(index);
            }
        }

        self.projection = projection;
        self.state = LookupState::Validated;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        let table = self.table()?;
        let transaction = self
            .store
            .start_transaction(&table)
            .map_err(|e| PkReadError::engine("Failed to start transaction", e))?;

        self.transaction = Some(transaction);
        self.state = LookupState::TransactionOpen;
        tracing::debug!("Transaction open on {}.{}", table.db(), table.name());
        Ok(())
    }

    /// Register the equality predicates and the projection
    fn stage(&mut self) -> Result<()> {
        let table = self.table()?;
        let transaction = self
            .transaction
            .as_mut()
            .ok_or_else(|| PkReadError::Internal("no open transaction".to_string()))?;

        for i in 0..self.request.pk_columns_count()? {
            let name = self.request.pk_name(i)?;
            let value = self.request.pk_value(i)?;
            let column = table
                .column(name)
                .ok_or_else(|| PkReadError::ColumnNotFound(name.to_string()))?;

            let argument = codec::key_argument(column, value.payload())?;
            tracing::trace!("Equality on {} ({} native bytes)", name, argument.len());
            transaction
                .equal(column, &argument)
                .map_err(|e| PkReadError::engine("Failed to set equality predicate", e))?;
        }

        for &index in &self.projection {
            let column = &table.columns()[index];
            let handle = transaction
                .get_value(column)
                .map_err(|e| PkReadError::engine("Failed to register read column", e))?;
            tracing::trace!("Reading {}", column.name);
            self.reads.push((index, handle));
        }

        self.state = LookupState::OperationStaged;
        Ok(())
    }

    /// Commit; `false` means no row matched
    fn execute(&mut self) -> Result<bool> {
        let transaction = self
            .transaction
            .as_mut()
            .ok_or_else(|| PkReadError::Internal("no open transaction".to_string()))?;

        let found = match transaction.execute(ExecType::Commit) {
            Ok(()) => !transaction
                .last_error()
                .map_or(false, |e| e.is_no_data_found()),
            Err(e) if e.is_no_data_found() => false,
            Err(e) => return Err(PkReadError::engine("Failed to execute transaction", e)),
        };

        self.state = LookupState::Executed;
        if !found {
            tracing::debug!("No row matched");
        }
        Ok(found)
    }

    /// Write the document; returns its length without the NUL
    fn build_response(&mut self) -> Result<usize> {
        let table = self.table()?;
        let operation_id = self.request.operation_id()?;
        let transaction = self
            .transaction
            .as_ref()
            .ok_or_else(|| PkReadError::Internal("no open transaction".to_string()))?;
        let response = &mut self.response;

        response.append_raw("{", false)?;
        if let Some(id) = operation_id {
            response.append_raw("\"operationId\":", false)?;
            response.append_string(id, true)?;
        }
        response.append_raw("\"Data\":{", false)?;

        let last = self.reads.len();
        for (n, &(index, handle)) in self.reads.iter().enumerate() {
            let column = &table.columns()[index];
            let attr = transaction.attribute(handle).ok_or_else(|| {
                PkReadError::Internal(format!("no value read back for column {}", column.name))
            })?;
            response.append_string(&column.name, false)?;
            response.append_raw(":", false)?;
            codec::write_attribute(column, attr, response, n + 1 < last)?;
        }

        response.append_raw("}}", false)?;
        response.append_null()?;

        self.state = LookupState::ResponseBuilt;
        Ok(response.written())
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    fn release(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            transaction.close();
        }
        if self.state != LookupState::Aborted {
            self.state = LookupState::Closed;
        }
    }

    fn abort(&mut self) {
        if let Some(mut transaction) = self.transaction.take() {
            if transaction.commit_status() == CommitStatus::Started {
                if let Err(e) = transaction.execute(ExecType::Rollback) {
                    tracing::warn!("Rollback failed: {}", e);
                }
            }
            transaction.close();
        }
        if self.response.written() > 0 {
            self.response.discard();
        }
        self.state = LookupState::Aborted;
    }
}

fn unsupported_projection(column: &str, column_type: crate::schema::ColumnType) -> PkReadError {
    PkReadError::UnsupportedType {
        column: column.to_string(),
        column_type,
        usage: TypeUse::Projection,
    }
}
