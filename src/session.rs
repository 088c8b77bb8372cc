//! Session
//!
//! The explicit context a primary-key read runs in: the configuration plus
//! the catalog and store collaborators. A session is shared across threads
//! by reference (or `Arc`); each `pk_read` call is independent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{PkReadError, Result};
use crate::operation::{LookupOutcome, PkReadOperation};
use crate::protocol::{RequestView, ResponseBuilder};
use crate::schema::Catalog;
use crate::status::Status;
use crate::store::{Store, StoreStats};

/// One read of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRead {
    pub status: Status,

    /// The document without its NUL; empty unless the row was found
    pub document: Vec<u8>,
}

/// Collaborator context for primary-key reads
pub struct Session {
    config: Config,
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn Store>,
    open: AtomicBool,
}

impl Session {
    /// Open a session over the given collaborators
    pub fn open(config: Config, catalog: Arc<dyn Catalog>, store: Arc<dyn Store>) -> Self {
        tracing::info!(
            "Session opened (request buffer {} bytes, response buffer {} bytes)",
            config.request_buffer_size,
            config.response_buffer_size
        );
        Self {
            config,
            catalog,
            store,
            open: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Reject further reads; calls already running finish normally
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::info!("Session closed");
        }
    }

    /// Execute one primary-key read
    ///
    /// `request` holds a binary request; the JSON document (NUL-terminated)
    /// is written to `response`. On not-found and on failure the document is
    /// empty.
    pub fn pk_read(&self, request: &[u8], response: &mut [u8]) -> Status {
        if !self.is_open() {
            return Status::from_error(&PkReadError::Internal(
                "session is closed".to_string(),
            ));
        }

        let limit = self.config.request_buffer_size;
        if request.len() > limit {
            return Status::from_error(&PkReadError::InvalidRequest(format!(
                "Request of {} bytes exceeds the {} byte limit",
                request.len(),
                limit
            )));
        }

        let view = match RequestView::new(request) {
            Ok(view) => view,
            Err(e) => return Status::from_error(&e),
        };

        let mut operation = PkReadOperation::new(
            view,
            ResponseBuilder::new(response),
            self.catalog.as_ref(),
            self.store.as_ref(),
        );

        match operation.perform() {
            Ok(LookupOutcome::Found { bytes_written }) => {
                tracing::debug!("Row found, {} byte document", bytes_written);
                Status::ok()
            }
            Ok(LookupOutcome::NotFound) => Status::not_found(),
            Err(e) => match operation.failure() {
                Some(site) => Status::at(&e, site),
                None => Status::from_error(&e),
            },
        }
    }

    /// Execute several primary-key reads, in order
    ///
    /// Each read is independent: one failing does not stop the rest.
    /// `response` is scratch space reused by every read, so it bounds each
    /// document separately.
    pub fn batch_pk_read<R: AsRef<[u8]>>(
        &self,
        requests: &[R],
        response: &mut [u8],
    ) -> Result<Vec<BatchRead>> {
        let max = self.config.max_batch_size;
        if requests.is_empty() || requests.len() > max {
            return Err(PkReadError::InvalidRequest(format!(
                "Batch of {} reads, expected between 1 and {}",
                requests.len(),
                max
            )));
        }

        let reads = requests
            .iter()
            .map(|request| {
                let status = self.pk_read(request.as_ref(), response);
                let document = if status.is_ok() {
                    let end = response.iter().position(|&b| b == 0).unwrap_or(response.len());
                    response[..end].to_vec()
                } else {
                    Vec::new()
                };
                BatchRead { status, document }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Batch of {} reads, {} found",
            reads.len(),
            reads.iter().filter(|r| r.status.is_ok()).count()
        );
        Ok(reads)
    }

    /// Transaction counters of the underlying store
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// `stats` as a JSON document
    pub fn stats_document(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.stats())
            .map_err(|e| PkReadError::Internal(format!("Unable to encode stats: {}", e)))
    }
}
