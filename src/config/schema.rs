//! Configuration schema definitions.
//!
//! All types derive `Deserialize` for loading from config files.
//! Keys are camelCase in the file (`allowedHostnames`, `keepalivePingTimeout`, ...).

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Drain deadline used when `shutdownTimeout` is absent.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Root configuration for the gateway.
///
/// Every key is optional in the file and falls back to its zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// `Host` header values allowed to open a terminal session.
    pub allowed_hostnames: Vec<String>,

    /// Arguments passed to `command`.
    pub arguments: Vec<String>,

    /// Interface to bind, as an IP address or a resolvable host name; empty
    /// binds every interface.
    pub server_address: String,

    /// Command spawned by the session bridge for each terminal.
    pub command: String,

    /// Maximum buffer size in bytes for a terminal session.
    pub max_buffer_size_bytes: usize,

    /// Port to bind.
    pub port: u16,

    /// Consecutive I/O errors tolerated on a session before it is torn down.
    pub connection_error_limit: u16,

    /// Keepalive ping timeout in seconds.
    pub keepalive_ping_timeout: u64,

    pub log_format: LogFormat,

    pub log_level: LogLevel,

    /// Drain deadline in seconds for graceful shutdown.
    pub shutdown_timeout: Option<u64>,
}

impl Config {
    pub fn keepalive_ping_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_ping_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// `address:port` string the listener binds to.
    pub fn listen_address(&self) -> String {
        let host = if self.server_address.is_empty() {
            "0.0.0.0"
        } else {
            self.server_address.as_str()
        };
        if host.contains(':') && !host.starts_with('[') {
            // Bare IPv6 literal.
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Minimum level of emitted log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_defaults_to_all_interfaces() {
        let config = Config {
            port: 8376,
            ..Config::default()
        };
        assert_eq!(config.listen_address(), "0.0.0.0:8376");
    }

    #[test]
    fn listen_address_brackets_ipv6() {
        let config = Config {
            server_address: "::1".into(),
            port: 80,
            ..Config::default()
        };
        assert_eq!(config.listen_address(), "[::1]:80");
    }

    #[test]
    fn shutdown_timeout_falls_back_to_default() {
        let mut config = Config::default();
        assert_eq!(config.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
        config.shutdown_timeout = Some(3);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
    }
}
