use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::json::JsonBody;
use super::params::RecordId;
use super::response::json_response;
use super::server::AppState;
use crate::auth::CurrentUser;
use crate::data::permissions::QUOTES_WRITE;
use crate::data::Reaction;
use crate::error::ApiError;
use crate::validator::Validator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactInput {
    #[serde(default)]
    reaction: String,
}

fn parse_reaction(raw: &str) -> Option<Reaction> {
    match raw {
        "like" => Some(Reaction::Like),
        "dislike" => Some(Reaction::Dislike),
        _ => None,
    }
}

/// Toggle the caller's reaction to a quote.
pub async fn react(
    State(state): State<AppState>,
    current: CurrentUser,
    RecordId(quote_id): RecordId,
    JsonBody(input): JsonBody<ReactInput>,
) -> Result<Response, ApiError> {
    current.require(QUOTES_WRITE)?;

    let reaction = parse_reaction(&input.reaction);
    let mut v = Validator::new();
    v.check(!input.reaction.is_empty(), "reaction", "must be provided");
    v.check(reaction.is_some(), "reaction", "must be either like or dislike");
    v.finish()?;
    let reaction = reaction.ok_or_else(|| ApiError::internal("reaction vanished after validation"))?;

    let now = state.db.toggle_reaction(current.0.id, quote_id, reaction).await?;
    let counts = state.db.reaction_counts(quote_id).await?;

    Ok(json_response(
        StatusCode::OK,
        &json!({ "reaction": now, "counts": counts }),
    ))
}

pub async fn reaction_summary(
    State(state): State<AppState>,
    RecordId(quote_id): RecordId,
) -> Result<Response, ApiError> {
    if !state.db.quote_exists(quote_id).await? {
        return Err(ApiError::NotFound);
    }
    let counts = state.db.reaction_counts(quote_id).await?;
    Ok(json_response(StatusCode::OK, &json!({ "counts": counts })))
}
