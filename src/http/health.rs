use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use serde_json::json;

use super::response::json_response;
use super::server::AppState;
use crate::error::ApiError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn version(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        &json!({
            "info": {
                "status": "available",
                "system_info": {
                    "environment": state.config.server.environment,
                    "version": VERSION,
                },
            },
        }),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}
