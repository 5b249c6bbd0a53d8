//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

use cloudshell::config::Config;
use cloudshell::http::{Gateway, SessionBridge, SessionOptions};
use cloudshell::observability::metrics;

/// One captured log event, with the fields of its enclosing spans merged in.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct Fields(BTreeMap<String, String>);

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

/// Layer that records every event for later assertions.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedEvents {
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync {
        tracing_subscriber::registry().with(self.clone())
    }

    /// Like [`subscriber`](Self::subscriber), but only spans and events at
    /// `level` or above reach the capture.
    pub fn subscriber_at(&self, level: LevelFilter) -> impl Subscriber + Send + Sync {
        tracing_subscriber::registry().with(self.clone().with_filter(level))
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message == message)
            .collect()
    }

    pub fn count(&self, message: &str) -> usize {
        self.with_message(message).len()
    }
}

impl<S> Layer<S> for CapturedEvents
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            if let Some(fields) = extensions.get_mut::<Fields>() {
                values.record(fields);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(span_fields) = span.extensions().get::<Fields>() {
                    fields.0.extend(span_fields.0.clone());
                }
            }
        }
        event.record(&mut fields);

        let message = fields.0.remove("message").unwrap_or_default();
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields: fields.0,
        });
    }
}

pub fn test_config() -> Config {
    Config {
        allowed_hostnames: vec!["localhost".into()],
        arguments: vec!["-l".into()],
        server_address: "127.0.0.1".into(),
        command: "/bin/bash".into(),
        max_buffer_size_bytes: 512,
        port: 0,
        connection_error_limit: 10,
        keepalive_ping_timeout: 20,
        ..Config::default()
    }
}

pub fn gateway_with(bridge: Arc<dyn SessionBridge>) -> Gateway {
    Gateway::new(&test_config(), bridge, metrics::detached_handle())
}

/// Bridge that answers `200 bridged` and remembers what it was given.
#[derive(Clone, Default)]
pub struct RecordingBridge {
    pub calls: Arc<Mutex<Vec<(SessionOptions, String)>>>,
}

impl SessionBridge for RecordingBridge {
    fn serve(&self, options: Arc<SessionOptions>, request: Request<Body>) -> BoxFuture<'static, Response> {
        self.calls
            .lock()
            .unwrap()
            .push(((*options).clone(), request.uri().to_string()));
        Box::pin(async { Response::new(Body::from("bridged")) })
    }
}

/// Bridge whose every session panics.
pub struct PanickingBridge;

impl SessionBridge for PanickingBridge {
    fn serve(&self, _options: Arc<SessionOptions>, _request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin(async { explode() })
    }
}

fn explode() -> Response {
    panic!("terminal backend exploded")
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
