//! HTTP transport integration tests.
//!
//! Starts an axum server and exercises it with reqwest.

use std::sync::Arc;

use kvmodel::remote;
use kvmodel::KvStore;
use serde_json::{json, Value};

use crate::support::{host, Host};

/// Bind to port 0 and return the actual address.
async fn start_server(host: Arc<Host>) -> String {
    let app = remote::router(host);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn methods_lists_the_table() {
    let base = start_server(host(&kvmodel::MemoryStore::new())).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/methods")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["put"], json!({ "type": "async" }));
    assert_eq!(body["createReadStream"], json!({ "type": "readable" }));
}

#[tokio::test]
async fn put_then_get() {
    let store = kvmodel::MemoryStore::new();
    let base = start_server(host(&store)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/put"))
        .json(&json!({ "key": "t1", "value": { "title": "over http" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["id"], "t1");
    assert_eq!(store.get("t1").await.unwrap()["title"], "over http");

    let resp = client
        .post(format!("{base}/get"))
        .json(&json!({ "key": "t1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "over http");
}

#[tokio::test]
async fn invalid_writes_are_unprocessable() {
    let store = kvmodel::MemoryStore::new();
    let base = start_server(host(&store)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/put"))
        .json(&json!({ "key": "t1", "value": { "title": "" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalidModel");
    assert!(store.is_empty());
}

#[tokio::test]
async fn missing_records_and_unknown_methods_are_404() {
    let base = start_server(host(&kvmodel::MemoryStore::new())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/get"))
        .json(&json!({ "key": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{base}/drop"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unknownMethod");
}

#[tokio::test]
async fn readable_methods_stream_ndjson() {
    let store = kvmodel::MemoryStore::new();
    let host = host(&store);
    for (id, title) in [("t1", "a"), ("t2", "b")] {
        host.attachment()
            .put_record(Some(id), json!({ "title": title }))
            .await
            .unwrap();
    }
    let base = start_server(host).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/createReadStream"))
        .json(&json!({ "options": { "values": false } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"],
        "application/x-ndjson"
    );

    let text = resp.text().await.unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines, vec![json!("t1"), json!("t2")]);
}
