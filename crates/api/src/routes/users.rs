//! Account marketing profile handlers.
//!
//! Preferences arrive one prompt step at a time; each submission merges
//! into the account and advances the prompt. Engagement tracking is
//! consent-gated on `tracking_opt_in`.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::db::UserRepository;
use crate::db::users::{MAX_PROFILE_STEP, TrackedEvent};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::models::MarketingProfile;
use crate::state::AppState;

/// `GET /api/users/me/preferences`
pub async fn preferences(RequireAuth(current): RequireAuth) -> Json<serde_json::Value> {
    let user = &current.0;
    Json(json!({
        "preferences": {
            "email_opt_in": user.email_opt_in,
            "sms_opt_in": user.sms_opt_in,
            "tracking_opt_in": user.tracking_opt_in,
            "email_frequency": user.email_frequency,
            "birthday": user.birthday,
            "location": user.location,
            "experience_level": user.experience_level,
            "traditions": user.traditions,
            "interests": user.interests,
            "favorite_product_types": user.favorite_product_types,
            "blog_subscription": user.blog_subscription,
            "workshop_interest": user.workshop_interest,
            "profile_completion_step": user.profile_completion_step,
        }
    }))
}

/// `PUT /api/users/me/preferences`
///
/// # Errors
///
/// Returns 401 without a valid token.
pub async fn update_preferences(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<MarketingProfile>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = UserRepository::new(state.pool())
        .update_preferences(current.id(), &payload)
        .await?;
    Ok(Json(json!({ "user": user })))
}

/// `GET /api/users/me/profile-prompt`
///
/// Returns the next prompt step for the account, or `null` when the
/// profile is complete.
pub async fn profile_prompt(RequireAuth(current): RequireAuth) -> Json<serde_json::Value> {
    let step = current.0.profile_completion_step;
    Json(json!({
        "complete": step >= MAX_PROFILE_STEP,
        "prompt": prompt_for_step(step),
    }))
}

/// `POST /api/users/me/track`
///
/// # Errors
///
/// Returns 403 when the account has not opted in to tracking.
pub async fn track(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(event): Json<TrackedEvent>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !current.0.tracking_opt_in {
        return Err(ApiError::Forbidden(
            "Account has not opted in to tracking".to_string(),
        ));
    }

    UserRepository::new(state.pool())
        .track_event(current.id(), &event)
        .await?;
    Ok(Json(json!({ "tracked": true })))
}

/// How a tag submission modifies the account's tag set.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
pub struct ModifyTagsRequest {
    pub tags: Vec<String>,
    pub action: TagAction,
}

/// `POST /api/users/me/tags`
///
/// Set-union or set-difference on the caller's own tags; repeating a
/// submission is a no-op.
///
/// # Errors
///
/// Returns 400 for an empty tag list, 401 without a valid token.
pub async fn modify_tags(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<ModifyTagsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.tags.is_empty() {
        return Err(ApiError::Validation("tags must not be empty".to_string()));
    }

    let repo = UserRepository::new(state.pool());
    let user = match payload.action {
        TagAction::Add => repo.add_tags(current.id(), &payload.tags).await?,
        TagAction::Remove => repo.remove_tags(current.id(), &payload.tags).await?,
    };
    Ok(Json(json!({ "user": user })))
}

/// The prompt content for a completion step. `None` once every step has
/// been answered.
fn prompt_for_step(step: i32) -> Option<serde_json::Value> {
    let prompt = match step {
        0 => json!({
            "step": 1,
            "title": "Tell us where you are on your path",
            "fields": ["experience_level", "interests"],
        }),
        1 => json!({
            "step": 2,
            "title": "Your traditions and favorites",
            "fields": ["traditions", "favorite_product_types"],
        }),
        2 => json!({
            "step": 3,
            "title": "How should we reach you?",
            "fields": ["email_opt_in", "sms_opt_in", "email_frequency"],
        }),
        3 => json!({
            "step": 4,
            "title": "A little about you",
            "fields": ["birthday", "location", "blog_subscription", "workshop_interest"],
        }),
        _ => return None,
    };
    Some(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_steps_cover_zero_to_three() {
        for step in 0..MAX_PROFILE_STEP {
            assert!(prompt_for_step(step).is_some(), "missing prompt for {step}");
        }
    }

    #[test]
    fn test_prompt_exhausted_at_cap() {
        assert!(prompt_for_step(MAX_PROFILE_STEP).is_none());
        assert!(prompt_for_step(MAX_PROFILE_STEP + 1).is_none());
    }
}
