//! Account registration and login.

use axum::Json;
use axum::extract::State;
use hearthglow_core::Email;
use serde::Deserialize;
use serde_json::json;

use crate::db::UserRepository;
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::services::auth::{hash_password, verify_password};
use crate::state::AppState;

/// Passwords shorter than this are rejected at registration.
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/register`
///
/// # Errors
///
/// Returns 400 for an invalid email or short password, 409 when the email
/// is already registered.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email =
        Email::parse(&payload.email).map_err(|e| ApiError::Validation(e.to_string()))?;
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let password_hash =
        hash_password(&payload.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let repo = UserRepository::new(state.pool());
    let user = repo
        .create(&email, &password_hash, &payload.first_name, &payload.last_name)
        .await?;

    let token = state
        .tokens()
        .issue(user.id, user.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({ "user": user, "token": token })))
}

/// `POST /api/auth/login`
///
/// # Errors
///
/// Returns 401 for an unknown email or wrong password; both cases share
/// one message.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let email = Email::parse(&payload.email).map_err(|_| invalid())?;

    let repo = UserRepository::new(state.pool());
    let user = repo.get_by_email(&email).await?.ok_or_else(invalid)?;

    let matches = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !matches {
        return Err(invalid());
    }

    repo.touch_last_login(user.id).await?;

    let token = state
        .tokens()
        .issue(user.id, user.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({ "user": user, "token": token })))
}

/// `GET /api/auth/me`
pub async fn me(RequireAuth(current): RequireAuth) -> Json<serde_json::Value> {
    Json(json!({ "user": current.0 }))
}
