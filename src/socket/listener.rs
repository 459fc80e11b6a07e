//! TCP listener and connection roster.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::commands::ActionRegistry;
use crate::config::ServerConfig;
use crate::engine::EngineHandle;
use crate::error::{ControlError, ControlResult};

use super::connection::{handle_connection, RosterGuard};

/// Set of currently connected peer addresses.
///
/// Membership invariant: an address is present exactly while a handler task
/// for it is alive. Inserted by the accept loop, removed by the handler's
/// drop guard on every exit path.
pub type Roster = Arc<StdMutex<HashSet<SocketAddr>>>;

/// Connection metrics for monitoring.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Total commands processed.
    pub requests_total: AtomicU64,
    /// Total failed commands.
    pub requests_failed: AtomicU64,
    /// Currently active connections.
    pub active_connections: AtomicUsize,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed command.
    pub fn record_request(&self, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

struct RunningState {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    accept_task: JoinHandle<()>,
    handlers: Arc<Mutex<JoinSet<()>>>,
}

/// Remote control server.
///
/// State machine: stopped → running (on successful bind) → stopped (on
/// [`stop`](Self::stop)). While running, each accepted connection gets its
/// own handler task and a roster entry.
pub struct ControlListener {
    engine: EngineHandle,
    registry: Arc<ActionRegistry>,
    config: ServerConfig,
    roster: Roster,
    metrics: Arc<ConnectionMetrics>,
    state: Mutex<Option<RunningState>>,
}

impl ControlListener {
    pub fn new(engine: EngineHandle, registry: ActionRegistry, config: ServerConfig) -> Self {
        Self {
            engine,
            registry: Arc::new(registry),
            config,
            roster: Arc::new(StdMutex::new(HashSet::new())),
            metrics: Arc::new(ConnectionMetrics::new()),
            state: Mutex::new(None),
        }
    }

    /// Bind the port and begin accepting connections.
    ///
    /// Fails with a bind error when the port is unavailable or the listener
    /// is already running; a second `start` is reported, never a crash.
    pub async fn start(&self, port: u16) -> ControlResult<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(ControlError::Bind {
                message: "listener is already running".to_string(),
            });
        }

        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| ControlError::Bind {
                message: format!("Failed to bind port {}: {}", port, e),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ControlError::Bind {
            message: format!("Failed to read local address: {}", e),
        })?;

        let shutdown = Arc::new(Notify::new());
        let handlers: Arc<Mutex<JoinSet<()>>> = Arc::new(Mutex::new(JoinSet::new()));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            self.engine.clone(),
            Arc::clone(&self.registry),
            self.config.clone(),
            Arc::clone(&self.roster),
            Arc::clone(&self.metrics),
            Arc::clone(&shutdown),
            Arc::clone(&handlers),
        ));

        info!(addr = %local_addr, "Remote mining control server started");

        *state = Some(RunningState {
            local_addr,
            shutdown,
            accept_task,
            handlers,
        });
        Ok(())
    }

    /// Stop accepting, cancel every handler, and clear the roster.
    ///
    /// Safe to call when not running.
    pub async fn stop(&self) {
        let Some(running) = self.state.lock().await.take() else {
            return;
        };

        info!("Stopping remote mining control server");

        running.shutdown.notify_waiters();
        running.accept_task.abort();
        let _ = running.accept_task.await;

        // Abort outstanding handlers; roster entries fall out via drop guards.
        running.handlers.lock().await.shutdown().await;

        self.roster
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        info!("Remote mining control server stopped");
    }

    /// Local address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().await.as_ref().map(|s| s.local_addr)
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Addresses of currently connected controllers.
    pub fn connected_peers(&self) -> Vec<SocketAddr> {
        self.roster
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect()
    }

    pub fn metrics(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    engine: EngineHandle,
    registry: Arc<ActionRegistry>,
    config: ServerConfig,
    roster: Roster,
    metrics: Arc<ConnectionMetrics>,
    shutdown: Arc<Notify>,
    handlers: Arc<Mutex<JoinSet<()>>>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let at_capacity = {
                            let roster = roster.lock().unwrap_or_else(|e| e.into_inner());
                            roster.len() >= config.max_connections
                        };
                        if at_capacity {
                            warn!(
                                peer = %peer,
                                max = config.max_connections,
                                "Connection limit reached, rejecting connection"
                            );
                            drop(stream);
                            continue;
                        }

                        roster
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .insert(peer);
                        metrics.active_connections.fetch_add(1, Ordering::Relaxed);
                        info!(peer = %peer, active = metrics.active(), "Client connected");

                        // The guard travels into the handler task so roster
                        // removal happens on every exit path, abort included.
                        let guard = RosterGuard::new(Arc::clone(&roster), Arc::clone(&metrics), peer);

                        let engine = engine.clone();
                        let registry = Arc::clone(&registry);
                        let config = config.clone();
                        let metrics = Arc::clone(&metrics);

                        let mut set = handlers.lock().await;
                        set.spawn(async move {
                            let _guard = guard;
                            if let Err(e) = handle_connection(stream, peer, engine, registry, config, metrics).await {
                                warn!(peer = %peer, error = %e, "Connection handler error");
                            }
                        });
                        // Reap any handlers that have already finished.
                        while set.try_join_next().is_some() {}
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                    }
                }
            }
            _ = shutdown.notified() => {
                debug!("Shutdown signal received, stopping accept loop");
                break;
            }
        }
    }
}
