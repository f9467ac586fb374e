use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::gate::{AuthGate, AuthenticatedUser, Identity};
use crate::error::ApiError;

/// Resolve the `Authorization` header and attach the [`Identity`] to the request.
///
/// No header means anonymous. Anything other than `Bearer <token>` is rejected.
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = match request.headers().get(header::AUTHORIZATION) {
        None => Identity::Anonymous,
        Some(value) => {
            let credential = value
                .to_str()
                .ok()
                .and_then(|v| v.split_once(' '))
                .filter(|(scheme, token)| *scheme == "Bearer" && !token.is_empty())
                .map(|(_, token)| token.to_string());

            let Some(credential) = credential else {
                return with_vary(ApiError::InvalidToken.into_response());
            };
            match gate.resolve(&credential).await {
                Ok(identity) => identity,
                Err(e) => return with_vary(e.into_response()),
            }
        }
    };

    request.extensions_mut().insert(identity);
    with_vary(next.run(request).await)
}

fn with_vary(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Extractor for handlers that need a signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl CurrentUser {
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if self.0.permissions.include(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::User(user)) => Ok(Self(user.clone())),
            _ => Err(ApiError::AuthenticationRequired),
        }
    }
}
