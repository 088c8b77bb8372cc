//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker threads
//! over a bounded channel.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{write_response, ResponseCode, ResponseFrame};
use crate::session::Session;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for primary-key reads
pub struct Server {
    config: Config,
    session: Arc<Session>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Create a new server with the given config and session
    pub fn new(config: Config, session: Arc<Session>) -> Self {
        Self {
            config,
            session,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listen address; returns the bound address (useful with port 0)
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        tracing::info!("Listening on {}", addr);
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Flag that stops `run` from another thread
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Ok(()),
        };

        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.accept_queue_len);
        let workers: Vec<JoinHandle<()>> = (0..self.config.worker_threads)
            .map(|id| self.spawn_worker(id, receiver.clone()))
            .collect::<std::io::Result<_>>()?;
        drop(receiver);

        while !self.shutdown.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    match sender.try_send(stream) {
                        Ok(()) => tracing::trace!("Queued connection from {}", peer),
                        Err(TrySendError::Full(mut stream)) => {
                            tracing::warn!("Accept queue full, rejecting {}", peer);
                            let frame = ResponseFrame::error(
                                ResponseCode::ServerError,
                                "Too many connections",
                            );
                            let _ = write_response(&mut stream, &frame);
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            tracing::error!("All workers exited; stopping");
                            break;
                        }
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Shutting down, waiting for {} workers", workers.len());
        drop(sender);
        for worker in workers {
            let _ = worker.join();
        }
        self.session.close();
        Ok(())
    }

    fn spawn_worker(
        &self,
        id: usize,
        receiver: Receiver<TcpStream>,
    ) -> std::io::Result<JoinHandle<()>> {
        let session = Arc::clone(&self.session);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        thread::Builder::new()
            .name(format!("pkread-worker-{}", id))
            .spawn(move || {
                for stream in receiver.iter() {
                    let mut connection = match Connection::new(stream, Arc::clone(&session)) {
                        Ok(connection) => connection,
                        Err(e) => {
                            tracing::warn!("Failed to set up connection: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                        tracing::warn!("Failed to set timeouts: {}", e);
                        continue;
                    }
                    if let Err(e) = connection.handle() {
                        tracing::debug!(
                            "Connection {} closed with error: {}",
                            connection.peer_addr(),
                            e
                        );
                    }
                }
            })
    }
}
