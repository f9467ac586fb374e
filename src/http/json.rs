//! Strict JSON request bodies.

use axum::body::Body;
use axum::extract::{FromRequest, Request};
use axum::http::header;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::ApiError;

pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Like `axum::Json`, but with a size cap, exactly one JSON value per body,
/// and client-readable error messages.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let too_large = || ApiError::BadRequest(format!("body must not be larger than {MAX_BODY_BYTES} bytes"));

        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > MAX_BODY_BYTES) {
            return Err(too_large());
        }

        let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| too_large())?;

        decode(&bytes).map(JsonBody)
    }
}

/// Decode exactly one JSON value from `bytes`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let mut values = serde_json::Deserializer::from_slice(bytes).into_iter::<T>();

    let value = match values.next() {
        None => return Err(ApiError::BadRequest("body must not be empty".into())),
        Some(Err(e)) => return Err(describe(e)),
        Some(Ok(value)) => value,
    };

    if values.next().is_some() {
        return Err(ApiError::BadRequest("body must contain exactly one JSON value".into()));
    }
    Ok(value)
}

fn describe(e: serde_json::Error) -> ApiError {
    let message = match e.classify() {
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Syntax => format!("body contains badly-formed JSON (at character {})", e.column()),
        Category::Data => {
            let detail = e.to_string();
            match detail
                .strip_prefix("unknown field `")
                .and_then(|rest| rest.split_once('`'))
            {
                Some((field, _)) => format!("body contains unknown key \"{field}\""),
                None => format!("body contains incorrect JSON type (at character {})", e.column()),
            }
        }
        Category::Io => "body could not be read".to_string(),
    };
    ApiError::BadRequest(message)
}
