//! pkread Server Binary
//!
//! Serves primary-key reads over TCP from an in-memory store loaded from a
//! JSON fixture.

use std::sync::Arc;

use clap::Parser;
use pkread::network::Server;
use pkread::store::MemoryStore;
use pkread::{Config, Session};
use tracing_subscriber::{fmt, EnvFilter};

/// pkread Server
#[derive(Parser, Debug)]
#[command(name = "pkread-server")]
#[command(about = "Primary-key read server over an in-memory store")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<String>,

    /// JSON fixture with tables and rows to serve
    #[arg(short, long)]
    fixture: Option<String>,

    /// Listen address (host:port), overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Worker threads, overrides the config file
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(workers) = args.workers {
        config.worker_threads = workers;
    }

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("pkread Server v{}", pkread::VERSION);
    tracing::info!("Listen address: {}", config.listen_addr);

    let store = match &args.fixture {
        Some(path) => match MemoryStore::load_fixture(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Failed to load fixture {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No fixture given; every lookup will miss the catalog");
            MemoryStore::new()
        }
    };

    let store = Arc::new(store);
    let session = Arc::new(Session::open(config.clone(), store.clone(), store));

    let mut server = Server::new(config, session);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
