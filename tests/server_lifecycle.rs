//! The server on a real socket: serving, store timeouts and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::net::TcpListener;

use quotable::config::AppConfig;
use quotable::data::Database;
use quotable::http::{AppState, HttpServer};
use quotable::lifecycle::{Shutdown, TaskPool};
use quotable::security::ClientRegistry;

mod common;
use common::TestApp;

#[tokio::test]
async fn test_serves_until_shutdown() {
    let mut config = AppConfig::default();
    config.limiter.enabled = false;

    let db = Database::open_in_memory().await.unwrap();
    let shutdown = Shutdown::new();
    let limiter = Arc::new(ClientRegistry::new(config.limiter.clone()));
    let sweeper = limiter.clone().spawn_sweeper(shutdown.subscribe());
    let (tasks, pool) = TaskPool::start(&config.workers, shutdown.subscribe());
    let server = HttpServer::new(AppState::new(Arc::new(config), db, limiter, tasks));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/v1/version");

    let mut requests = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let url = url.clone();
        requests.push(tokio::spawn(async move {
            client.get(&url).send().await.map(|r| r.status().as_u16())
        }));
    }
    for request in requests {
        assert_eq!(request.await.unwrap().unwrap(), 200);
    }

    let res = client.get(format!("http://{addr}/v1/quotes")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["metadata"]["total_records"], 0);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server drained in time")
        .unwrap()
        .unwrap();
    assert!(pool.drain(Duration::from_secs(5)).await);
    sweeper.await.unwrap();

    let fresh = reqwest::Client::new();
    assert!(fresh.get(&url).send().await.is_err());
}

#[tokio::test]
async fn test_store_deadline_maps_to_unavailable() {
    let mut config = AppConfig::default();
    config.limiter.enabled = false;
    let db = Database::open_in_memory()
        .await
        .unwrap()
        .with_query_timeout(Duration::ZERO);
    let app = TestApp::with_parts(config, db);

    let res = app.get("/v1/quotes", None).await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.headers["retry-after"], "1");
    assert_eq!(
        res.body["error"],
        "the server is temporarily unable to handle this request, please try again later"
    );
}
