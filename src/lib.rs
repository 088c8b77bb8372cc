//! # pkread
//!
//! The primary-key read layer between a network-facing service and a
//! clustered key-value storage engine:
//! - Bounds-checked decoding of an offset-addressed binary request
//! - Per-column-type marshalling to and from the engine's native values
//! - A bounded, NUL-terminated JSON response document
//! - A lookup state machine with rollback and cleanup on every failure
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              TCP Server / Frame codec (network)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ request buffer
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Session::pk_read → Status                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   PkReadOperation                            │
//! │   RequestView ──▶ ColumnCodec ──▶ Store ──▶ ResponseBuilder  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Catalog   │          │    Store    │
//!   │ (metadata)  │          │(transaction)│
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod status;

pub mod schema;
pub mod codec;
pub mod protocol;
pub mod store;
pub mod operation;
pub mod session;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorCategory, PkReadError, Result};
pub use config::Config;
pub use operation::{LookupOutcome, LookupState, PkReadOperation};
pub use protocol::{LookupRequest, RequestView, ResponseBuilder};
pub use session::Session;
pub use status::Status;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pkread
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
