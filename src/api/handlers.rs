// Cache management handlers

use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

use super::response::{bad_request, json_response};
use super::types::{CacheSnapshot, InvalidationResponse, InvalidationScope};
use crate::config::AppState;

/// Report store statistics and whether the served dish is cached
pub fn handle_cache_get(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let dish_key = state.dish.key().to_string();
    let snapshot = CacheSnapshot {
        dish_cached: state.store.get(&dish_key).is_some(),
        dish_key,
        stats: state.store.stats(),
    };
    json_response(StatusCode::OK, &snapshot)
}

/// Work out the invalidation target from the query string
///
/// No query means everything. `key` and `prefix` are mutually exclusive and
/// must not be empty.
pub fn parse_scope(query: Option<&str>) -> Result<InvalidationScope, String> {
    let mut key = None;
    let mut prefix = None;
    for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match name.as_ref() {
            "key" => key = Some(value.into_owned()),
            "prefix" => prefix = Some(value.into_owned()),
            other => return Err(format!("unknown query parameter '{other}'")),
        }
    }

    match (key, prefix) {
        (None, None) => Ok(InvalidationScope::All),
        (Some(_), Some(_)) => Err("'key' and 'prefix' cannot be combined".to_string()),
        (Some(k), None) if k.is_empty() => Err("'key' must not be empty".to_string()),
        (None, Some(p)) if p.is_empty() => Err("'prefix' must not be empty".to_string()),
        (Some(k), None) => Ok(InvalidationScope::Key(k)),
        (None, Some(p)) => Ok(InvalidationScope::Prefix(p)),
    }
}

/// Drop cached representations; the next request for them repopulates
pub fn handle_cache_delete(state: &Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let scope = match parse_scope(query) {
        Ok(scope) => scope,
        Err(message) => return bad_request(&message),
    };

    let removed = match &scope {
        InvalidationScope::All => {
            let before = state.store.len();
            state.store.reset();
            before
        }
        InvalidationScope::Key(key) => usize::from(state.store.delete(key)),
        InvalidationScope::Prefix(prefix) => state.store.delete_by_prefix(prefix),
    };

    tracing::info!(scope = ?scope, removed, "cache invalidated");
    json_response(
        StatusCode::OK,
        &InvalidationResponse {
            status: "ACK",
            scope,
            removed,
        },
    )
}
