//! Outbound call and error sink behaviour of `/api/joke`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mine_backend::config::AppConfig;
use serde_json::{json, Value};

mod common;

const JOKE: &str = r#"{"type":"general","setup":"Why did the crab never share?","punchline":"Because he's shellfish.","id":7}"#;

fn config_for(upstream: String) -> AppConfig {
    let mut config = AppConfig::default();
    config.upstream.joke_url = upstream;
    config
}

#[tokio::test]
async fn test_joke_wraps_upstream_payload() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let upstream = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (200, JOKE.to_string())
        }
    })
    .await;

    let server = common::start_server(config_for(format!("http://{upstream}/jokes/random"))).await;
    let res = common::client()
        .get(server.url("/api/joke"))
        .send()
        .await
        .expect("backend unreachable");

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let expected: Value = serde_json::from_str(JOKE).unwrap();
    assert_eq!(body, json!({ "joke": expected }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_network_failure_is_opaque_500() {
    let dead = common::closed_port().await;
    let server = common::start_server(config_for(format!("http://{dead}/jokes/random"))).await;

    let res = common::client()
        .get(server.url("/api/joke"))
        .send()
        .await
        .expect("backend unreachable");

    assert_eq!(res.status(), 500);
    let text = res.text().await.unwrap();
    assert_eq!(text, r#"{"error":"Something went wrong on the server."}"#);
    assert!(!text.contains(&dead.to_string()));
}

#[tokio::test]
async fn test_upstream_error_status_is_opaque_500() {
    let upstream =
        common::start_programmable_backend(|| async { (503, r#"{"detail":"maintenance"}"#.to_string()) })
            .await;
    let server = common::start_server(config_for(format!("http://{upstream}/jokes/random"))).await;

    let res = common::client().get(server.url("/api/joke")).send().await.unwrap();

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Something went wrong on the server." }));
}

#[tokio::test]
async fn test_unparseable_upstream_body_is_opaque_500() {
    let upstream = common::start_programmable_backend(|| async { (200, "not json".to_string()) }).await;
    let server = common::start_server(config_for(format!("http://{upstream}/jokes/random"))).await;

    let res = common::client().get(server.url("/api/joke")).send().await.unwrap();

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Something went wrong on the server.");
}

#[tokio::test]
async fn test_slow_upstream_does_not_block_other_routes() {
    let upstream = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, JOKE.to_string())
    })
    .await;
    let server = common::start_server(config_for(format!("http://{upstream}/jokes/random"))).await;
    let client = common::client();

    let slow_url = server.url("/api/joke");
    let slow_client = client.clone();
    let slow = tokio::spawn(async move { slow_client.get(slow_url).send().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let health = tokio::time::timeout(
        Duration::from_millis(300),
        client.get(server.url("/health")).send(),
    )
    .await
    .expect("health must not wait for the joke call")
    .unwrap();
    assert_eq!(health.status(), 200);

    let joke = slow.await.unwrap().unwrap();
    assert_eq!(joke.status(), 200);
}
