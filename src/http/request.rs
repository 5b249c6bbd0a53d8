//! Request instrumentation.
//!
//! # Responsibilities
//! - Assign every request an `x-request-id` (UUID v4) unless the client sent one
//! - Capture request-derived log fields (host, peer, method, path, ...)
//! - Emit exactly one completion or failure event per request
//! - Contain handler panics so one failing request never takes the server down
//!
//! # Design Decisions
//! - The logger is the outermost boundary; everything below may panic upward
//! - A contained panic becomes an empty `500 Internal Server Error`
//! - Field capture works without a request so other components can build
//!   connection-scoped loggers

use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderName, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::FutureExt;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{field::Empty, Instrument, Span};

use crate::observability::metrics;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request-derived fields attached to log events.
///
/// Every field is optional; absent fields are left out of the span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLogEntry {
    pub host: Option<String>,
    pub remote_addr: Option<SocketAddr>,
    pub method: Option<String>,
    pub protocol: Option<String>,
    pub path: Option<String>,
    pub request_url: Option<String>,
    pub user_agent: Option<String>,
    pub cookies: Option<String>,
    pub request_id: Option<String>,
    pub connection_id: Option<String>,
}

impl RequestLogEntry {
    /// Capture fields from `request`, or nothing when there is none.
    pub fn from_request<B>(request: Option<&Request<B>>) -> Self {
        let Some(request) = request else {
            return Self::default();
        };

        let headers = request.headers();
        let header_str = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let cookies: Vec<&str> = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        Self {
            host: request
                .uri()
                .authority()
                .map(|a| a.to_string())
                .or_else(|| header_str(&header::HOST)),
            remote_addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            method: Some(request.method().to_string()),
            protocol: Some(format!("{:?}", request.version())),
            path: Some(request.uri().path().to_string()),
            request_url: Some(request.uri().to_string()),
            user_agent: header_str(&header::USER_AGENT),
            cookies: (!cookies.is_empty()).then(|| cookies.join("; ")),
            request_id: header_str(&X_REQUEST_ID),
            connection_id: None,
        }
    }

    pub fn with_connection_id(mut self, connection_id: impl ToString) -> Self {
        self.connection_id = Some(connection_id.to_string());
        self
    }

    /// Build a span carrying every present field.
    ///
    /// The span is created at ERROR level so that no configured level can
    /// filter it out from under the events it contextualizes.
    pub fn span(&self) -> Span {
        let span = tracing::error_span!(
            "request",
            host = Empty,
            remote_addr = Empty,
            method = Empty,
            protocol = Empty,
            path = Empty,
            request_url = Empty,
            user_agent = Empty,
            cookies = Empty,
            request_id = Empty,
            connection_id = Empty,
        );

        let text_fields = [
            ("host", &self.host),
            ("method", &self.method),
            ("protocol", &self.protocol),
            ("path", &self.path),
            ("request_url", &self.request_url),
            ("user_agent", &self.user_agent),
            ("cookies", &self.cookies),
            ("request_id", &self.request_id),
            ("connection_id", &self.connection_id),
        ];
        for (name, value) in text_fields {
            if let Some(value) = value {
                span.record(name, value.as_str());
            }
        }
        if let Some(addr) = self.remote_addr {
            span.record("remote_addr", tracing::field::display(addr));
        }

        span
    }
}

/// Wrap `router` with request ids and the logging/panic boundary.
pub fn instrument(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(middleware::from_fn(log_requests)),
    )
}

/// Logging middleware: one "request completed" or "request errored out"
/// event per request.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();
    let span = RequestLogEntry::from_request(Some(&request)).span();
    let method = request.method().to_string();

    let outcome = AssertUnwindSafe(next.run(request))
        .catch_unwind()
        .instrument(span.clone())
        .await;

    match outcome {
        Ok(response) => {
            let status = response.status().as_u16();
            tracing::info!(
                parent: &span,
                status,
                elapsed_ms = elapsed_ms(start_time),
                "request completed"
            );
            metrics::record_request(&method, status, start_time);
            response
        }
        Err(panic) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            tracing::error!(
                parent: &span,
                status = status.as_u16(),
                elapsed_ms = elapsed_ms(start_time),
                panic = %panic_message(panic.as_ref()),
                "request errored out"
            );
            metrics::record_panic(&method);
            metrics::record_request(&method, status.as_u16(), start_time);
            status.into_response()
        }
    }
}

fn elapsed_ms(start_time: Instant) -> f64 {
    start_time.elapsed().as_secs_f64() * 1000.0
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
