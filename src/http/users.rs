use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::json::JsonBody;
use super::response::json_response;
use super::server::AppState;
use crate::auth::password;
use crate::data::permissions::{QUOTES_READ, QUOTES_WRITE};
use crate::data::StoreError;
use crate::error::ApiError;
use crate::validator::{validate_email, validate_password, ValidationErrors, Validator};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterInput {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();
    v.check(!input.name.is_empty(), "name", "must be provided");
    v.check(input.name.len() <= 500, "name", "must not be more than 500 bytes long");
    validate_email(&mut v, &input.email);
    validate_password(&mut v, &input.password);
    v.finish()?;

    let hash = password::hash_password(input.password).await?;

    let registered = state
        .db
        .register_user(&input.name, &input.email, &hash, &[QUOTES_READ, QUOTES_WRITE])
        .await;
    let user = match registered {
        Ok(user) => user,
        Err(StoreError::Duplicate(_)) => {
            let mut errors = ValidationErrors::new();
            errors.insert("email".into(), "a user with this email address already exists".into());
            return Err(ApiError::Validation(errors));
        }
        Err(e) => return Err(e.into()),
    };

    let (user_id, email) = (user.id, user.email.clone());
    let queued = state.tasks.submit("welcome_notification", async move {
        tracing::info!(user_id, email = %email, "Welcome notification delivered");
        Ok(())
    });
    if let Err(e) = queued {
        tracing::warn!(user_id, error = %e, "Welcome notification not queued");
    }

    tracing::info!(user_id, "User registered");
    Ok(json_response(StatusCode::ACCEPTED, &json!({ "user": user })))
}
