//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with every API route
//! - Wire up middleware (request id, tracing, panic recovery, timeout,
//!   metrics, rate limiting, authentication)
//! - Serve on a listener until the shutdown signal, then drain
//!
//! # Design Decisions
//! - Rate limiting runs before authentication so rejected clients never reach the store
//! - A panicking handler produces a 500 and closes its connection; other requests are unaffected

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::{health, quotes, reactions, response::json_response, tokens, users};
use crate::auth::{authenticate, AuthGate};
use crate::config::AppConfig;
use crate::consistency::ConcurrencyGuard;
use crate::data::Database;
use crate::error::{ApiError, SERVER_ERROR_MESSAGE};
use crate::lifecycle::TaskPool;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::security::rate_limit::{rate_limit_middleware, ClientRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub limiter: Arc<ClientRegistry>,
    pub auth: AuthGate,
    pub guard: ConcurrencyGuard,
    pub tasks: TaskPool,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        db: Database,
        limiter: Arc<ClientRegistry>,
        tasks: TaskPool,
    ) -> Self {
        let token_ttl = Duration::from_secs(config.auth.token_ttl_hours.saturating_mul(3600));
        Self {
            auth: AuthGate::new(db.clone(), token_ttl),
            guard: ConcurrencyGuard::new(db.clone()),
            config,
            db,
            limiter,
            tasks,
        }
    }
}

/// HTTP server for the quote API.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

        Router::new()
            .route("/v1/version", get(health::version))
            .route("/v1/quotes", get(quotes::list_quotes).post(quotes::create_quote))
            .route("/v1/quotes/{id}", get(quotes::show_quote).patch(quotes::update_quote))
            .route(
                "/v1/quotes/{id}/reactions",
                get(reactions::reaction_summary).post(reactions::react),
            )
            .route("/v1/users/{id}/quotes", get(quotes::list_user_quotes))
            .route("/v1/user/register", post(users::register_user))
            .route(
                "/v1/tokens/auth",
                post(tokens::create_auth_token).delete(tokens::revoke_auth_tokens),
            )
            .fallback(health::not_found)
            .method_not_allowed_fallback(health::method_not_allowed)
            .layer(middleware::from_fn_with_state(state.auth.clone(), authenticate))
            .layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(request_timeout, enforce_deadline))
            .layer(middleware::from_fn(record_metrics))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(handle_panic)),
            )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then finish in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.config.server.environment,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Fail a request that runs past `limit` with the usual 503 envelope.
async fn enforce_deadline(
    State(limit): State<Duration>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match with_deadline("request", limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::Unavailable.into_response(),
    }
}

async fn record_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let mut response = json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({ "error": SERVER_ERROR_MESSAGE }),
    );
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
