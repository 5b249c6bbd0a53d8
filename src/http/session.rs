//! Terminal session hand-off.
//!
//! The gateway does not run terminals itself. A session bridge receives
//! every request on the terminal endpoint together with [`SessionOptions`]
//! and owns everything after that: the WebSocket upgrade, spawning the
//! command on a pseudo-terminal, buffering and keepalive pings.
//!
//! ```text
//! GET /xterm.js ──▶ Gateway ──▶ SessionBridge::serve(options, request)
//!                                   │
//!                                   └─▶ options.create_logger(id, &request)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use tracing::Span;
use uuid::Uuid;

use crate::config::Config;
use crate::http::request::RequestLogEntry;

/// Identifier of one terminal session connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// Produces a logger scoped to one connection, given the request that opened it.
pub type LoggerFactory = Arc<dyn Fn(&ConnectionId, &Request<Body>) -> Span + Send + Sync>;

/// Everything a session bridge needs to run terminals.
#[derive(Clone)]
pub struct SessionOptions {
    pub allowed_hostnames: Vec<String>,
    pub command: String,
    pub arguments: Vec<String>,
    pub connection_error_limit: u16,
    pub keepalive_ping_timeout: Duration,
    pub max_buffer_size_bytes: usize,
    create_logger: LoggerFactory,
}

impl SessionOptions {
    pub fn from_config(config: &Config, create_logger: LoggerFactory) -> Self {
        Self {
            allowed_hostnames: config.allowed_hostnames.clone(),
            command: config.command.clone(),
            arguments: config.arguments.clone(),
            connection_error_limit: config.connection_error_limit,
            keepalive_ping_timeout: config.keepalive_ping_timeout(),
            max_buffer_size_bytes: config.max_buffer_size_bytes,
            create_logger,
        }
    }

    /// Logger for the connection `id` opened by `request`.
    pub fn create_logger(&self, id: &ConnectionId, request: &Request<Body>) -> Span {
        (self.create_logger)(id, request)
    }

    /// Whether a `Host` header value may open a session.
    ///
    /// The port is ignored and names compare case-insensitively. An empty
    /// allow-list admits nothing.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        let host = hostname(host);
        self.allowed_hostnames
            .iter()
            .any(|allowed| hostname(allowed).eq_ignore_ascii_case(host))
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("allowed_hostnames", &self.allowed_hostnames)
            .field("command", &self.command)
            .field("arguments", &self.arguments)
            .field("connection_error_limit", &self.connection_error_limit)
            .field("keepalive_ping_timeout", &self.keepalive_ping_timeout)
            .field("max_buffer_size_bytes", &self.max_buffer_size_bytes)
            .finish_non_exhaustive()
    }
}

/// Strip a port suffix and IPv6 brackets from a host value.
fn hostname(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 literal.
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// The default logger factory.
///
/// Announces the new connection with the full request fields, then hands
/// back a span carrying only the connection id.
pub fn connection_logger_factory() -> LoggerFactory {
    Arc::new(|id: &ConnectionId, request: &Request<Body>| {
        let request_span = RequestLogEntry::from_request(Some(request))
            .with_connection_id(id)
            .span();
        tracing::info!(parent: &request_span, "created logger for connection '{}'", id);

        RequestLogEntry::default().with_connection_id(id).span()
    })
}

/// External collaborator that turns a terminal endpoint request into a
/// live session.
pub trait SessionBridge: Send + Sync + 'static {
    fn serve(&self, options: Arc<SessionOptions>, request: Request<Body>) -> BoxFuture<'static, Response>;
}

/// Bridge used when no terminal backend is linked in: every session is
/// refused with `503 Service Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattached;

impl SessionBridge for Unattached {
    fn serve(&self, options: Arc<SessionOptions>, request: Request<Body>) -> BoxFuture<'static, Response> {
        let id = ConnectionId::new();
        let logger = options.create_logger(&id, &request);
        Box::pin(async move {
            tracing::warn!(parent: &logger, "no session bridge attached, refusing terminal session");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn options(allowed: &[&str]) -> SessionOptions {
        let config = Config {
            allowed_hostnames: allowed.iter().map(|h| h.to_string()).collect(),
            command: "/bin/bash".into(),
            arguments: vec!["-l".into()],
            connection_error_limit: 10,
            keepalive_ping_timeout: 20,
            max_buffer_size_bytes: 512,
            ..Config::default()
        };
        SessionOptions::from_config(&config, connection_logger_factory())
    }

    #[test]
    fn copies_config_values() {
        let options = options(&["localhost"]);
        assert_eq!(options.command, "/bin/bash");
        assert_eq!(options.arguments, vec!["-l"]);
        assert_eq!(options.connection_error_limit, 10);
        assert_eq!(options.keepalive_ping_timeout, Duration::from_secs(20));
        assert_eq!(options.max_buffer_size_bytes, 512);
    }

    #[test]
    fn host_allow_list_ignores_port_and_case() {
        let options = options(&["localhost", "Shell.Example.com", "[::1]"]);
        assert!(options.is_host_allowed("localhost"));
        assert!(options.is_host_allowed("localhost:8376"));
        assert!(options.is_host_allowed("shell.example.com:443"));
        assert!(options.is_host_allowed("[::1]:8376"));
        assert!(options.is_host_allowed("::1"));
        assert!(!options.is_host_allowed("evil.com"));
        assert!(!options.is_host_allowed("localhost.evil.com"));
    }

    #[test]
    fn empty_allow_list_admits_nothing() {
        assert!(!options(&[]).is_host_allowed("localhost"));
    }

    #[test]
    fn factory_receives_connection_and_request() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let factory: LoggerFactory = Arc::new(move |id: &ConnectionId, request: &Request<Body>| {
            recorder
                .lock()
                .unwrap()
                .push((id.to_string(), request.uri().path().to_string()));
            Span::none()
        });
        let options = SessionOptions::from_config(&Config::default(), factory);

        let id = ConnectionId::new();
        let request = Request::builder().uri("/xterm.js").body(Body::empty()).unwrap();
        options.create_logger(&id, &request);

        assert_eq!(*seen.lock().unwrap(), vec![(id.to_string(), "/xterm.js".to_string())]);
    }

    #[test]
    fn connection_ids_are_unique_uuids() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
        assert_eq!(Uuid::parse_str(&a.to_string()).unwrap(), *a.as_uuid());
    }

    #[tokio::test]
    async fn unattached_bridge_refuses_sessions() {
        let request = Request::builder().uri("/xterm.js").body(Body::empty()).unwrap();
        let response = Unattached.serve(Arc::new(options(&["localhost"])), request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
