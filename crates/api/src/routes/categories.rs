//! Category handlers.

use axum::Json;
use axum::extract::{Path, State};
use hearthglow_core::{CategoryId, Permission, Slug};
use serde_json::json;

use crate::db::CategoryRepository;
use crate::db::categories::{CategoryPatch, NewCategory};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `GET /api/categories`
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "categories": categories })))
}

/// `GET /api/categories/{slug}`
///
/// # Errors
///
/// Returns 404 for an unknown category.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let slug = Slug::parse(&slug).map_err(|_| ApiError::NotFound("Category"))?;
    let category = CategoryRepository::new(state.pool()).get_by_slug(&slug).await?;
    Ok(Json(json!({ "category": category })))
}

/// `POST /api/admin/categories`
///
/// # Errors
///
/// Returns 403 without the create-products permission, 409 on a slug
/// collision.
pub async fn create(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<NewCategory>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::CreateProducts)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let category = CategoryRepository::new(state.pool()).create(&payload).await?;
    Ok(Json(json!({ "category": category })))
}

/// `PUT /api/admin/categories/{id}`
///
/// # Errors
///
/// Returns 403 without the edit-products permission, 404 for an unknown
/// category.
pub async fn update(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(payload): Json<CategoryPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::EditProducts)?;

    let category = CategoryRepository::new(state.pool()).update(id, &payload).await?;
    Ok(Json(json!({ "category": category })))
}

/// `DELETE /api/admin/categories/{id}`
///
/// Detaches products from the category before deleting it.
///
/// # Errors
///
/// Returns 403 without the delete-products permission, 404 for an unknown
/// category.
pub async fn remove(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::DeleteProducts)?;

    CategoryRepository::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "deleted": true })))
}
