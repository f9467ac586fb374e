//! Turns untrusted query-string parameters into a bounded listing request.

use std::collections::HashMap;

use super::filters::{
    Filters, SortKey, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE, QUOTE_SORT_SAFELIST,
};
use crate::error::ApiError;
use crate::validator::Validator;

const DEFAULT_SORT: &str = "id";

/// A validated quote listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePlan {
    /// Case-insensitive substring of the quote text. Empty matches everything.
    pub content: String,
    /// Every tag here must be on a quote for it to match. Empty matches everything.
    pub tags: Vec<String>,
    pub filters: Filters,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner {
    safelist: &'static [&'static str],
}

impl QueryPlanner {
    pub fn quotes() -> Self {
        Self {
            safelist: QUOTE_SORT_SAFELIST,
        }
    }

    /// Validate `params`, collecting every problem before failing.
    pub fn plan(&self, params: &HashMap<String, String>) -> Result<QuotePlan, ApiError> {
        let mut v = Validator::new();

        let page = read_int(params, "page", DEFAULT_PAGE, &mut v);
        let page_size = read_int(params, "page_size", DEFAULT_PAGE_SIZE, &mut v);
        let sort_raw = read_string(params, "sort", DEFAULT_SORT);
        let content = read_string(params, "content", "").to_string();
        let tags = read_csv(params, "tags");

        v.check(page > 0, "page", "must be greater than zero");
        v.check(page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(page_size > 0, "page_size", "must be greater than zero");
        v.check(page_size <= MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");

        let sort = SortKey::parse(sort_raw, self.safelist);
        v.check(sort.is_some(), "sort", "invalid sort value");

        v.finish()?;

        let sort = sort.ok_or_else(|| ApiError::internal("sort key vanished after validation"))?;
        Ok(QuotePlan {
            content,
            tags,
            filters: Filters {
                page,
                page_size,
                sort,
            },
        })
    }
}

/// A parameter that is present but empty counts as absent.
fn read_string<'a>(params: &'a HashMap<String, String>, key: &str, default: &'a str) -> &'a str {
    match params.get(key) {
        Some(value) if !value.is_empty() => value,
        _ => default,
    }
}

fn read_int(params: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    let raw = read_string(params, key, "");
    if raw.is_empty() {
        return default;
    }
    match raw.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            v.add_error(key, "must be an integer value");
            default
        }
    }
}

fn read_csv(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    read_string(params, key, "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
