//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.
//!
//! The listener makes three promises to the session layer: exactly one
//! session per accepted stream, the session is dropped before its stream,
//! and no state is shared between sessions beyond the configuration
//! snapshot cloned into each one. Session accounting lives entirely in the
//! accept loop: workers report each finished session over a channel, and
//! the loop keeps the only copy of the count.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TrySendError};

use crate::config::Config;
use crate::error::{QooilError, Result};

use super::Session;

/// Message sent to worker threads
enum WorkerMessage {
    /// New client connection to handle
    NewConnection(TcpStream),
    /// Signal to shutdown
    Shutdown,
}

/// Signals a running server to stop accepting and drain its workers
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Flip the shutdown flag; the accept loop notices on its next poll
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// TCP server for Qooil
///
/// ## Architecture
/// - Main thread accepts connections
/// - Worker thread pool runs one session per stream
/// - Sessions share nothing; each gets its own config snapshot
pub struct Server {
    /// Server configuration
    config: Config,

    /// TCP listener (created on bind)
    listener: Option<TcpListener>,

    /// Channel to send work to workers
    work_sender: Option<Sender<WorkerMessage>>,

    /// Worker thread handles
    workers: Vec<JoinHandle<()>>,

    /// Shutdown flag
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Create a new server with the given config
    pub fn new(config: Config) -> Self {
        Self {
            config,
            listener: None,
            work_sender: None,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listener without entering the accept loop
    ///
    /// Separated from [`run`](Self::run) so callers binding port 0 can learn
    /// the assigned address first.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .map_err(|e| QooilError::Config(format!("Failed to bind to {addr}: {e}")))?;

        // Non-blocking so the accept loop can poll the shutdown flag
        listener.set_nonblocking(true)?;

        let local = listener.local_addr()?;
        tracing::info!("Server listening on {local}");
        self.listener = Some(listener);
        Ok(local)
    }

    /// Start the server (blocking)
    ///
    /// This method:
    /// 1. Binds the configured address (unless already bound)
    /// 2. Spawns worker threads
    /// 3. Accepts connections in a loop
    /// 4. Returns once shutdown is signaled
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            let _ = self.bind()?;
        }

        let num_workers = self.config.workers.max(1);
        let (sender, receiver) = bounded::<WorkerMessage>(num_workers);
        self.work_sender = Some(sender);

        // Workers report each finished session here; only the accept loop
        // reads it.
        let (done_sender, done_receiver) = unbounded::<()>();

        tracing::info!("Starting {num_workers} worker threads");

        for worker_id in 0..num_workers {
            let worker = Worker::new(
                worker_id,
                receiver.clone(),
                self.config.clone(),
                done_sender.clone(),
            );
            let handle = thread::Builder::new()
                .name(format!("qooil-worker-{worker_id}"))
                .spawn(move || worker.run())
                .map_err(|e| QooilError::Config(format!("Failed to spawn worker: {e}")))?;

            self.workers.push(handle);
        }

        self.accept_loop(&done_receiver)?;
        self.cleanup();

        Ok(())
    }

    /// A handle other threads can use to stop the server
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Get the bound address (if bound)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Main accept loop
    ///
    /// `done` carries one unit per finished session; the count derived from
    /// it is owned by this loop alone.
    fn accept_loop(&mut self, done: &Receiver<()>) -> Result<()> {
        let listener = self.listener.as_ref().expect("bound before accept loop");
        let sender = self.work_sender.as_ref().expect("workers before accept loop");

        // Sessions dispatched and not yet reported finished
        let mut active: usize = 0;

        while !self.shutdown.load(Ordering::Relaxed) {
            while done.try_recv().is_ok() {
                active = active.saturating_sub(1);
                tracing::debug!("Session finished ({active} active)");
            }

            match listener.accept() {
                Ok((stream, addr)) => {
                    // The bounded channel is the connection limit: a full
                    // queue means every worker is busy and a session is
                    // already waiting for each.
                    match sender.try_send(WorkerMessage::NewConnection(stream)) {
                        Ok(()) => {
                            active += 1;
                            tracing::debug!("Accepted connection from {addr} ({active} active)");
                        }
                        Err(TrySendError::Full(message)) => {
                            tracing::warn!(
                                "Connection limit reached ({active} active), rejecting {addr}"
                            );
                            drop(message);
                        }
                        Err(TrySendError::Disconnected(message)) => {
                            tracing::error!("Failed to dispatch connection: workers gone");
                            drop(message);
                        }
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No pending connections, sleep briefly
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        tracing::error!("Accept error: {e}");
                    }
                }
            }
        }

        Ok(())
    }

    /// Cleanup workers and resources
    fn cleanup(&mut self) {
        tracing::info!("Shutting down server...");

        if let Some(sender) = &self.work_sender {
            for _ in 0..self.workers.len() {
                let _ = sender.send(WorkerMessage::Shutdown);
            }
        }

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                tracing::error!("Worker thread panicked: {e:?}");
            }
        }

        tracing::info!("Server shutdown complete");
    }
}

/// Worker thread that runs client sessions
struct Worker {
    /// Worker ID for logging
    id: usize,

    /// Channel to receive work
    receiver: Receiver<WorkerMessage>,

    /// Configuration snapshot cloned into each session
    config: Config,

    /// Reports one unit per finished session back to the accept loop
    done: Sender<()>,
}

impl Worker {
    fn new(id: usize, receiver: Receiver<WorkerMessage>, config: Config, done: Sender<()>) -> Self {
        Self {
            id,
            receiver,
            config,
            done,
        }
    }

    fn run(self) {
        tracing::debug!("Worker {} started", self.id);

        loop {
            match self.receiver.recv() {
                Ok(WorkerMessage::NewConnection(stream)) => {
                    self.handle_connection(stream);
                    let _ = self.done.send(());
                }
                Ok(WorkerMessage::Shutdown) => {
                    tracing::debug!("Worker {} received shutdown signal", self.id);
                    break;
                }
                Err(_) => {
                    // Channel closed
                    tracing::debug!("Worker {} channel closed", self.id);
                    break;
                }
            }
        }

        tracing::debug!("Worker {} stopped", self.id);
    }

    fn handle_connection(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());

        let mut session = match Session::new(stream, self.config.clone()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to create session for {peer}: {e}");
                return;
            }
        };

        if let Err(e) = session.run() {
            tracing::debug!("Session {peer} ended with error: {e}");
        } else {
            tracing::debug!("Session {peer} closed");
        }
    }
}
