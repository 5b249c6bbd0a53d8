//! cloudshell: network gateway for a browser-based terminal.
//!
//! Terminates HTTP/WebSocket connections, serves the embedded web UI,
//! exposes health and metrics endpoints, and hands terminal sessions to a
//! pluggable session bridge.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::Config;
pub use http::Gateway;
pub use lifecycle::ServerLifecycle;
