//! OS signal handling.
//!
//! Only SIGINT (Ctrl-C) and, on Unix, SIGTERM start a graceful shutdown.
//! SIGKILL cannot be intercepted by a process, so it is not registered: a
//! forced kill ends the process without draining.

use std::fmt;

/// Which signal asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Interrupt,
    Terminate,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Interrupt => f.write_str("SIGINT"),
            Interruption::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Wait until the process is asked to stop.
#[cfg(unix)]
pub async fn interruption() -> std::io::Result<Interruption> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok(Interruption::Interrupt)
        }
        _ = terminate.recv() => Ok(Interruption::Terminate),
    }
}

/// Wait until the process is asked to stop.
#[cfg(not(unix))]
pub async fn interruption() -> std::io::Result<Interruption> {
    tokio::signal::ctrl_c().await?;
    Ok(Interruption::Interrupt)
}
