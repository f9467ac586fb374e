//! Quote handlers.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::json::JsonBody;
use super::params::RecordId;
use super::response::json_response;
use super::server::AppState;
use crate::auth::CurrentUser;
use crate::data::permissions::QUOTES_WRITE;
use crate::data::{NewQuote, Source};
use crate::error::ApiError;
use crate::query::QueryPlanner;
use crate::validator::{unique, Validator};

pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateQuoteInput {
    #[serde(default)]
    content: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    tags: Vec<String>,
}

/// Absent fields are left as they are.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateQuoteInput {
    content: Option<String>,
    author: Option<String>,
    source: Option<Source>,
    tags: Option<Vec<String>>,
}

fn validate_quote(v: &mut Validator, content: &str, author: &str, source: &Source, tags: &[String]) {
    v.check(!content.is_empty(), "content", "must be provided");
    v.check(content.len() <= 1000, "content", "must not be more than 1000 bytes long");

    v.check(!author.is_empty(), "author", "must be provided");
    v.check(author.len() <= 100, "author", "must not be more than 100 bytes long");

    v.check(
        !source.is_partial(),
        "source",
        "must provide both title and type, or neither",
    );

    v.check(!tags.is_empty(), "tags", "must contain at least 1 tag");
    v.check(tags.len() <= 5, "tags", "must not contain more than 5 tags");
    v.check(tags.iter().all(|t| !t.is_empty()), "tags", "must not contain empty tags");
    v.check(unique(tags), "tags", "must not contain duplicate values");
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let plan = QueryPlanner::quotes().plan(&params)?;
    let (quotes, metadata) = state.db.list_quotes(&plan, None).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "quotes": quotes, "metadata": metadata }),
    ))
}

pub async fn list_user_quotes(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(user_id): RecordId,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let plan = QueryPlanner::quotes().plan(&params)?;
    let (quotes, metadata) = state.db.list_quotes(&plan, Some(user_id)).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "quotes": quotes, "metadata": metadata }),
    ))
}

pub async fn create_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<CreateQuoteInput>,
) -> Result<Response, ApiError> {
    current.require(QUOTES_WRITE)?;
    let user = current.0;

    let mut v = Validator::new();
    validate_quote(&mut v, &input.content, &input.author, &input.source, &input.tags);
    v.finish()?;

    let quote = state
        .guard
        .create(&NewQuote {
            user_id: user.id,
            content: input.content,
            author: input.author,
            source: input.source,
            tags: input.tags,
        })
        .await?;

    tracing::info!(quote_id = quote.id, user_id = user.id, "Quote created");

    let mut response = json_response(StatusCode::CREATED, &json!({ "quote": quote }));
    if let Ok(location) = HeaderValue::from_str(&format!("/v1/quotes/{}", quote.id)) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

pub async fn show_quote(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Response, ApiError> {
    let quote = state.db.get_quote(id).await?;
    Ok(json_response(StatusCode::OK, &json!({ "quote": quote })))
}

pub async fn update_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    RecordId(id): RecordId,
    headers: HeaderMap,
    JsonBody(input): JsonBody<UpdateQuoteInput>,
) -> Result<Response, ApiError> {
    current.require(QUOTES_WRITE)?;

    // always read the current row; versions are never cached between requests
    let mut quote = state.db.get_quote(id).await?;
    if quote.user_id != current.0.id {
        return Err(ApiError::Forbidden);
    }

    let expected_version = match headers.get(EXPECTED_VERSION_HEADER) {
        None => quote.version,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::BadRequest("X-Expected-Version must be an integer".into()))?,
    };

    if let Some(content) = input.content {
        quote.content = content;
    }
    if let Some(author) = input.author {
        quote.author = author;
    }
    if let Some(source) = input.source {
        quote.source = source;
    }
    if let Some(tags) = input.tags {
        quote.tags = tags;
    }

    let mut v = Validator::new();
    validate_quote(&mut v, &quote.content, &quote.author, &quote.source, &quote.tags);
    v.finish()?;

    state.guard.apply(&mut quote, expected_version).await?;

    tracing::info!(quote_id = quote.id, version = quote.version, "Quote updated");
    Ok(json_response(StatusCode::OK, &json!({ "quote": quote })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_validate_quote() {
        let mut v = Validator::new();
        validate_quote(&mut v, "text", "author", &Source::default(), &tags(&["a"]));
        assert!(v.is_valid());

        let mut v = Validator::new();
        let partial = Source {
            title: "Meditations".into(),
            kind: String::new(),
        };
        validate_quote(&mut v, "", &"x".repeat(101), &partial, &tags(&["a", "a"]));
        let errors = v.errors();
        assert_eq!(errors["content"], "must be provided");
        assert_eq!(errors["author"], "must not be more than 100 bytes long");
        assert_eq!(errors["source"], "must provide both title and type, or neither");
        assert_eq!(errors["tags"], "must not contain duplicate values");
    }

    #[test]
    fn test_tag_bounds() {
        let mut v = Validator::new();
        validate_quote(&mut v, "c", "a", &Source::default(), &[]);
        assert_eq!(v.errors()["tags"], "must contain at least 1 tag");

        let mut v = Validator::new();
        validate_quote(&mut v, "c", "a", &Source::default(), &tags(&["1", "2", "3", "4", "5", "6"]));
        assert_eq!(v.errors()["tags"], "must not contain more than 5 tags");
    }
}
