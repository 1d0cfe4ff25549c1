//! RSS feed proxy handler.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::services::rss::FeedError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub url: String,
}

/// `GET /api/feed?url=...`
///
/// Returns the parsed feed as JSON, never the raw XML.
///
/// # Errors
///
/// Returns 400 for a malformed URL, 403 for a host outside the
/// allowlist, 422 for a body that is not a feed, 502 for upstream
/// failures.
pub async fn proxy(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let feed = state.feed().fetch(&query.url).await.map_err(|e| match e {
        FeedError::InvalidUrl(msg) => ApiError::Validation(msg),
        FeedError::HostNotAllowed(host) => {
            ApiError::Forbidden(format!("host {host} is not on the feed allowlist"))
        }
        FeedError::NotAFeed | FeedError::TooLarge => ApiError::Unavailable(e.to_string()),
        FeedError::Http(_) | FeedError::UpstreamStatus(_) => ApiError::Upstream(e.to_string()),
    })?;

    Ok(Json(json!({ "feed": feed })))
}
