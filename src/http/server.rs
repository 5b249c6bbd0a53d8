//! Route composition.
//!
//! # Responsibilities
//! - Build the `SessionOptions` handed to the session bridge
//! - Create the Axum Router with every endpoint
//! - Wrap the router in the request logging boundary
//!
//! # Routes
//! ```text
//! /xterm.js        → session bridge (any method)
//! /readyz          → 200 "ok"
//! /healthz         → 200 "ok"
//! /metric          → Prometheus exposition
//! /assets, /assets/{*path} → terminal asset root
//! fallback         → public site root
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::http::assets::{self, ASSET_PREFIX};
use crate::http::request;
use crate::http::session::{connection_logger_factory, SessionBridge, SessionOptions};
use crate::observability::metrics;

pub const LIVENESS_PATH: &str = "/healthz";
pub const READINESS_PATH: &str = "/readyz";
pub const METRICS_PATH: &str = "/metric";
pub const XTERM_PATH: &str = "/xterm.js";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionOptions>,
    pub bridge: Arc<dyn SessionBridge>,
    pub metrics: PrometheusHandle,
}

/// The gateway's HTTP surface.
pub struct Gateway {
    state: AppState,
}

impl Gateway {
    pub fn new(config: &Config, bridge: Arc<dyn SessionBridge>, metrics: PrometheusHandle) -> Self {
        let session = Arc::new(SessionOptions::from_config(config, connection_logger_factory()));
        Self {
            state: AppState {
                session,
                bridge,
                metrics,
            },
        }
    }

    pub fn session_options(&self) -> &Arc<SessionOptions> {
        &self.state.session
    }

    /// The complete, instrumented router.
    pub fn router(&self) -> Router {
        request::instrument(Self::routes(self.state.clone()))
    }

    fn routes(state: AppState) -> Router {
        Router::new()
            .route(XTERM_PATH, any(session_handler))
            .route(READINESS_PATH, get(ok_handler))
            .route(LIVENESS_PATH, get(ok_handler))
            .route(METRICS_PATH, get(metrics_handler))
            .route(ASSET_PREFIX, get(assets::serve_asset))
            .route(&format!("{ASSET_PREFIX}/"), get(assets::serve_asset))
            .route(&format!("{ASSET_PREFIX}/{{*path}}"), get(assets::serve_asset))
            .fallback(get(assets::serve_public))
            .with_state(state)
    }

    /// Log the effective configuration and the endpoint paths.
    pub fn log_summary(config: &Config) {
        tracing::info!("command               : '{}'", config.command);
        tracing::info!("arguments             : ['{}']", config.arguments.join("', '"));
        tracing::info!("allowed hosts         : ['{}']", config.allowed_hostnames.join("', '"));
        tracing::info!("connection error limit: {}", config.connection_error_limit);
        tracing::info!("keepalive ping timeout: {:?}", config.keepalive_ping_timeout());
        tracing::info!("max buffer size       : {} bytes", config.max_buffer_size_bytes);
        tracing::info!("server address        : '{}'", config.server_address);
        tracing::info!("server port           : {}", config.port);
        tracing::info!("shutdown timeout      : {:?}", config.shutdown_timeout());

        tracing::info!("liveness checks path  : '{}'", LIVENESS_PATH);
        tracing::info!("readiness checks path : '{}'", READINESS_PATH);
        tracing::info!("metrics endpoint path : '{}'", METRICS_PATH);
        tracing::info!("xtermjs endpoint path : '{}'", XTERM_PATH);
    }
}

async fn ok_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, metrics::CONTENT_TYPE)],
        state.metrics.render(),
    )
        .into_response()
}

async fn session_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.bridge.serve(Arc::clone(&state.session), request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::session::Unattached;

    #[test]
    fn session_options_follow_config() {
        let config = Config {
            allowed_hostnames: vec!["localhost".into()],
            command: "/bin/zsh".into(),
            max_buffer_size_bytes: 1024,
            ..Config::default()
        };
        let gateway = Gateway::new(&config, Arc::new(Unattached), metrics::detached_handle());
        let options = gateway.session_options();
        assert_eq!(options.command, "/bin/zsh");
        assert_eq!(options.max_buffer_size_bytes, 1024);
        assert!(options.is_host_allowed("localhost:8376"));
    }
}
