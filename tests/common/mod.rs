//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use quotable::config::AppConfig;
use quotable::data::Database;
use quotable::http::{AppState, HttpServer};
use quotable::lifecycle::{Shutdown, TaskPool};
use quotable::security::ClientRegistry;

pub const DEFAULT_PEER: &str = "203.0.113.7:50000";
pub const PASSWORD: &str = "pa55word-long";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// The full router over an in-memory database, driven without a socket.
pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub shutdown: Shutdown,
}

impl TestApp {
    /// Default configuration with the rate limiter switched off.
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.limiter.enabled = false;
        Self::with_config(config).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let db = Database::open_in_memory().await.unwrap();
        Self::with_parts(config, db)
    }

    pub fn with_parts(config: AppConfig, db: Database) -> Self {
        let shutdown = Shutdown::new();
        let limiter = Arc::new(ClientRegistry::new(config.limiter.clone()));
        let (tasks, _pool) = TaskPool::start(&config.workers, shutdown.subscribe());
        let state = AppState::new(Arc::new(config), db.clone(), limiter, tasks);
        let router = HttpServer::new(state).router();
        Self {
            router,
            db,
            shutdown,
        }
    }

    pub async fn send(
        &self,
        peer: &str,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let mut request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();
        let peer: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, token, None).await
    }

    /// `body` is sent as JSON when present.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let auth = token.map(|t| format!("Bearer {t}"));
        let headers: Vec<(&str, &str)> = auth
            .as_deref()
            .map(|a| vec![("authorization", a)])
            .unwrap_or_default();
        self.send(DEFAULT_PEER, method, uri, &headers, body.map(|b| b.to_string()))
            .await
    }

    /// Register a user and return its id.
    pub async fn register(&self, name: &str, email: &str) -> i64 {
        let res = self
            .call(
                Method::POST,
                "/v1/user/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(res.status, StatusCode::ACCEPTED, "{}", res.body);
        res.body["user"]["id"].as_i64().unwrap()
    }

    pub async fn login(&self, email: &str) -> String {
        let res = self
            .call(
                Method::POST,
                "/v1/tokens/auth",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["authentication_token"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Register and log in. Returns the user id and a bearer token.
    pub async fn signup(&self, name: &str, email: &str) -> (i64, String) {
        let id = self.register(name, email).await;
        (id, self.login(email).await)
    }

    pub async fn create_quote(&self, token: &str, content: &str, tags: &[&str]) -> Value {
        let res = self
            .call(
                Method::POST,
                "/v1/quotes",
                Some(token),
                Some(json!({ "content": content, "author": "Anonymous", "tags": tags })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["quote"].clone()
    }
}
