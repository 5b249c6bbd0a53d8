//! Server lifecycle state machine.
//!
//! # States
//! ```text
//! Idle ──start──▶ Serving ──stop──▶ Draining ──▶ Stopped
//! ```
//!
//! - `start` spawns the accept loop and returns once the socket is listening
//! - `stop` stops accepting, lets in-flight requests finish until the drain
//!   timeout, then closes what is left
//! - Background tasks (memory telemetry) are told to stop once the drain
//!   completes and are awaited before `Stopped` is reported
//! - Errors while stopping are logged; `Stopped` is always reached

use std::fmt;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Extra time granted to the serve task after the drain deadline before it
/// is aborted outright.
const ABORT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Serving,
    Draining,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Idle => "idle",
            ServerState::Serving => "serving",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ServerState,
    },

    #[error("server failed to start listening: {0}")]
    Listen(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Owns the listening socket, the serve task and the tasks that live as
/// long as the server does.
pub struct ServerLifecycle {
    handle: Handle,
    drain_timeout: Duration,
    state: watch::Sender<ServerState>,
    task: Option<JoinHandle<std::io::Result<()>>>,
    background_stop: broadcast::Sender<()>,
    background: Vec<(&'static str, JoinHandle<()>)>,
}

impl ServerLifecycle {
    pub fn new(drain_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ServerState::Idle);
        let (background_stop, _) = broadcast::channel(1);
        Self {
            handle: Handle::new(),
            drain_timeout,
            state,
            task: None,
            background_stop,
            background: Vec::new(),
        }
    }

    /// Spawn a task that runs until the server stops.
    ///
    /// `task` receives a channel that fires once draining is over; `stop`
    /// waits for the task to return.
    pub fn spawn_background<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task(self.background_stop.subscribe()));
        self.background.push((name, handle));
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Number of connections currently open.
    pub fn connection_count(&self) -> usize {
        self.handle.connection_count()
    }

    /// Start serving `router` on `listener` in the background.
    ///
    /// Returns the bound address once the server accepts connections.
    pub async fn start(
        &mut self,
        listener: TcpListener,
        router: Router,
    ) -> Result<SocketAddr, LifecycleError> {
        let state = self.state();
        if state != ServerState::Idle {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state,
            });
        }

        listener.set_nonblocking(true)?;
        let server = axum_server::from_tcp(listener).handle(self.handle.clone());
        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        let task = tokio::spawn(async move { server.serve(app).await });

        match self.handle.listening().await {
            Some(addr) => {
                self.task = Some(task);
                self.state.send_replace(ServerState::Serving);
                tracing::info!(address = %addr, "Server listening");
                Ok(addr)
            }
            None => {
                self.state.send_replace(ServerState::Stopped);
                let reason = match task.await {
                    Ok(Err(e)) => e.to_string(),
                    Ok(Ok(())) => "server exited before listening".to_string(),
                    Err(e) => e.to_string(),
                };
                tracing::error!(error = %reason, "Server failed to start");
                Err(LifecycleError::Listen(reason))
            }
        }
    }

    /// Drain and stop. Always ends in `Stopped`.
    pub async fn stop(&mut self) -> ServerState {
        match self.state() {
            ServerState::Serving => {}
            ServerState::Idle => {
                self.stop_background().await;
                self.state.send_replace(ServerState::Stopped);
                return ServerState::Stopped;
            }
            state => return state,
        }

        self.state.send_replace(ServerState::Draining);
        tracing::info!(
            timeout = ?self.drain_timeout,
            connections = self.handle.connection_count(),
            "Draining connections"
        );
        self.handle.graceful_shutdown(Some(self.drain_timeout));

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.drain_timeout + ABORT_GRACE, &mut task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    tracing::error!(error = %e, "server shutdown returned an error");
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "server task failed");
                }
                Err(_) => {
                    tracing::warn!("server did not stop after drain deadline, aborting");
                    task.abort();
                }
            }
        }

        self.stop_background().await;
        self.state.send_replace(ServerState::Stopped);
        tracing::info!("Server stopped");
        ServerState::Stopped
    }

    async fn stop_background(&mut self) {
        let _ = self.background_stop.send(());
        for (name, task) in self.background.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(task = name, error = %e, "background task failed");
            }
        }
    }
}
