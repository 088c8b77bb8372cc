//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool fed by a bounded crossbeam channel
//! - Every lookup runs through a shared `Session`

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
