use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::json::JsonBody;
use super::response::json_response;
use super::server::AppState;
use crate::auth::{password, CurrentUser};
use crate::data::StoreError;
use crate::error::ApiError;
use crate::validator::{validate_email, validate_password, Validator};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn create_auth_token(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CredentialsInput>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();
    validate_email(&mut v, &input.email);
    validate_password(&mut v, &input.password);
    v.finish()?;

    let user = match state.db.get_user_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    if !password::verify_password(input.password, user.password_hash.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.auth.issue(user.id).await?;
    Ok(json_response(
        StatusCode::CREATED,
        &json!({ "authentication_token": token }),
    ))
}

pub async fn revoke_auth_tokens(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    let removed = state.auth.revoke_all(user.id).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "message": "authentication tokens revoked", "revoked": removed }),
    ))
}
