//! Server lifecycle against real sockets.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;

use cloudshell::http::{request, Unattached};
use cloudshell::lifecycle::{startup, ServerLifecycle, ServerState};

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn start(router: Router, drain_timeout: Duration) -> (ServerLifecycle, String) {
    let mut lifecycle = ServerLifecycle::new(drain_timeout);
    let listener = startup::bind("127.0.0.1:0").unwrap();
    let addr = lifecycle.start(listener, router).await.unwrap();
    (lifecycle, format!("http://{}", addr))
}

#[tokio::test]
async fn serves_the_gateway_until_stopped() {
    let router = common::gateway_with(Arc::new(Unattached)).router();
    let (mut lifecycle, base) = start(router, Duration::from_secs(2)).await;
    assert_eq!(lifecycle.state(), ServerState::Serving);

    let res = client().get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    assert_eq!(lifecycle.stop().await, ServerState::Stopped);

    let after = client().get(format!("{base}/healthz")).send().await;
    assert!(after.is_err(), "server still answering after stop");
}

#[tokio::test]
async fn drain_lets_in_flight_requests_finish() {
    let router = request::instrument(Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "done"
        }),
    ));
    let (mut lifecycle, base) = start(router, Duration::from_secs(5)).await;
    let mut states = lifecycle.subscribe();

    let slow_url = format!("{base}/slow");
    let in_flight = tokio::spawn(async move {
        let res = client().get(slow_url).send().await?;
        let status = res.status();
        res.text().await.map(|body| (status, body))
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopping = tokio::spawn(async move { lifecycle.stop().await });
    states
        .wait_for(|state| *state == ServerState::Draining)
        .await
        .unwrap();

    // Nothing new is served once draining has begun.
    let late = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap()
        .get(format!("{base}/slow"))
        .send()
        .await;
    assert!(late.is_err(), "new request served while draining");

    let (status, body) = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .expect("in-flight request hung")
        .unwrap()
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, "done");

    let final_state = tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .expect("stop hung")
        .unwrap();
    assert_eq!(final_state, ServerState::Stopped);
}

#[tokio::test]
async fn drain_timeout_bounds_hung_requests() {
    let router = request::instrument(Router::new().route(
        "/hang",
        get(std::future::pending::<&'static str>),
    ));
    let drain_timeout = Duration::from_millis(300);
    let (mut lifecycle, base) = start(router, drain_timeout).await;

    let hang_url = format!("{base}/hang");
    let hung = tokio::spawn(async move { client().get(hang_url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(lifecycle.connection_count(), 1);

    let started = Instant::now();
    let final_state = tokio::time::timeout(Duration::from_secs(5), lifecycle.stop())
        .await
        .expect("stop blocked past the drain timeout");
    assert_eq!(final_state, ServerState::Stopped);
    assert!(started.elapsed() >= drain_timeout);

    let outcome = tokio::time::timeout(Duration::from_secs(5), hung)
        .await
        .expect("client never released")
        .unwrap();
    assert!(outcome.is_err(), "hung request unexpectedly completed");
}
