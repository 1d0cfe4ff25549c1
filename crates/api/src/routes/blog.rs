//! Blog handlers.
//!
//! Contributors can create and edit their own drafts; publishing,
//! deleting, and editing other authors' posts are admin operations.

use axum::Json;
use axum::extract::{Path, Query, State};
use hearthglow_core::{Permission, PostId, Role, Slug};
use serde::Deserialize;
use serde_json::json;

use crate::db::PostRepository;
use crate::db::posts::{NewPost, PostFilter, PostPatch};
use crate::error::ApiError;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Include drafts. Requires the edit-blog permission.
    #[serde(default)]
    pub include_drafts: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/blog`
///
/// # Errors
///
/// Returns 401/403 when drafts are requested without the edit-blog
/// permission.
pub async fn list(
    OptionalAuth(current): OptionalAuth,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let published_only = if query.include_drafts {
        let current = current
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        current.require_permission(Permission::EditBlog)?;
        false
    } else {
        true
    };

    let filter = PostFilter {
        published_only,
        category: query.category,
        tag: query.tag,
        limit: Some(query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
        offset: query.offset.map(|o| o.max(0)),
    };

    let posts = PostRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(json!({ "posts": posts })))
}

/// `GET /api/blog/{slug}`
///
/// # Errors
///
/// Returns 404 for an unknown or unpublished post.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let slug = Slug::parse(&slug).map_err(|_| ApiError::NotFound("Post"))?;
    let post = PostRepository::new(state.pool())
        .get_published_by_slug(&slug)
        .await?;
    Ok(Json(json!({ "post": post })))
}

/// `POST /api/blog`
///
/// # Errors
///
/// Returns 403 without the create-blog permission, or without publish-blog
/// when the post is submitted already published.
pub async fn create(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<NewPost>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::CreateBlog)?;
    if payload.is_published {
        current.require_permission(Permission::PublishBlog)?;
    }
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let post = PostRepository::new(state.pool())
        .create(&payload, current.id())
        .await?;
    Ok(Json(json!({ "post": post })))
}

/// `PUT /api/blog/{id}`
///
/// Contributors edit their own posts; admins edit any. Changing the
/// publish flag requires publish-blog.
///
/// # Errors
///
/// Returns 403 on a failed permission or ownership check, 404 for an
/// unknown post.
pub async fn update(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(payload): Json<PostPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::EditBlog)?;
    if payload.is_published.is_some() {
        current.require_permission(Permission::PublishBlog)?;
    }

    let repo = PostRepository::new(state.pool());
    let author = repo.author_of(id).await?;
    current.require_ownership_or_role(author, &[Role::Admin])?;

    let post = repo.update(id, &payload).await?;
    Ok(Json(json!({ "post": post })))
}

/// `DELETE /api/blog/{id}`
///
/// # Errors
///
/// Returns 403 without the delete-blog permission, 404 for an unknown
/// post.
pub async fn remove(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::DeleteBlog)?;

    PostRepository::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "deleted": true })))
}
