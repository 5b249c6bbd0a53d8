//! Startup helpers.
//!
//! # Design Decisions
//! - Fail fast: a bind error is fatal
//! - The listener is bound before serving starts so the address is known

use std::net::TcpListener;

use crate::lifecycle::server::LifecycleError;

/// Bind the listening socket for `address` (`ip:port`).
pub fn bind(address: &str) -> Result<TcpListener, LifecycleError> {
    let listener = TcpListener::bind(address).map_err(|source| LifecycleError::Bind {
        address: address.to_string(),
        source,
    })?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}
