//! Admin back-office handlers: users, roles, tags, segments, and store
//! stats.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use hearthglow_core::{OrderStatus, Permission, Role, UserId};
use serde::Deserialize;
use serde_json::json;

use crate::db::users::UserFilter;
use crate::db::{OrderRepository, PostRepository, ProductRepository, UserRepository};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::services::segments::{Segment, SegmentService, members_csv};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

/// Stock at or below this counts as low for the dashboard.
const LOW_STOCK_THRESHOLD: i32 = 5;

/// Fold a GROUP BY role result into one entry per role, zero-filled.
fn role_breakdown(rows: &[(Role, i64)]) -> serde_json::Value {
    let count = |role: Role| {
        rows.iter()
            .find(|(r, _)| *r == role)
            .map_or(0, |(_, c)| *c)
    };
    json!({
        "admin": count(Role::Admin),
        "customer": count(Role::Customer),
        "contributor": count(Role::Contributor),
        "affiliate": count(Role::Affiliate),
    })
}

/// Fold a GROUP BY experience_level result; NULL rows are users who
/// never answered the profile prompt.
fn experience_breakdown(rows: &[(Option<String>, i64)]) -> serde_json::Value {
    let count = |level: &str| {
        rows.iter()
            .find(|(l, _)| l.as_deref() == Some(level))
            .map_or(0, |(_, c)| *c)
    };
    let not_set = rows
        .iter()
        .find(|(l, _)| l.is_none())
        .map_or(0, |(_, c)| *c);
    json!({
        "beginner": count("beginner"),
        "intermediate": count("intermediate"),
        "advanced": count("advanced"),
        "not_set": not_set,
    })
}

/// Pull one status count out of a GROUP BY status result.
fn status_count(rows: &[(OrderStatus, i64)], status: OrderStatus) -> i64 {
    rows.iter()
        .find(|(s, _)| *s == status)
        .map_or(0, |(_, c)| *c)
}

/// `GET /api/admin/stats`
///
/// Marketing-oriented user statistics: role and experience-level
/// distributions, opt-in counts, aggregate lifetime value.
///
/// # Errors
///
/// Returns 403 without the view-analytics permission.
pub async fn stats(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewAnalytics)?;

    let users = UserRepository::new(state.pool());
    let counts = users.counts().await?;
    let by_role = users.role_counts().await?;
    let by_level = users.experience_level_counts().await?;

    Ok(Json(json!({
        "stats": {
            "total_users": counts.total,
            "users_by_role": role_breakdown(&by_role),
            "marketing": {
                "email_opt_in": counts.email_opt_in,
                "sms_opt_in": counts.sms_opt_in,
                "tracking_opt_in": counts.tracking_opt_in,
            },
            "experience_levels": experience_breakdown(&by_level),
            "total_lifetime_value": counts.total_lifetime_value,
        }
    })))
}

/// `GET /api/admin/dashboard`
///
/// Store-wide counts plus operational signals: order status breakdown,
/// trailing 7-day sales, low-stock alerts, recent orders.
///
/// # Errors
///
/// Returns 403 without the view-analytics permission.
pub async fn dashboard(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewAnalytics)?;

    let orders = OrderRepository::new(state.pool());
    let (order_count, revenue) = orders.sales_totals().await?;
    let by_status = orders.status_breakdown().await?;
    let (orders_last_7_days, revenue_last_7_days) = orders.sales_since_days(7).await?;
    let recent = orders.recent(10).await?;

    let (product_total, product_active) = ProductRepository::new(state.pool()).counts().await?;
    let low_stock = ProductRepository::new(state.pool())
        .count_low_stock(LOW_STOCK_THRESHOLD)
        .await?;
    let (post_total, post_published) = PostRepository::new(state.pool()).counts().await?;
    let user_counts = UserRepository::new(state.pool()).counts().await?;

    Ok(Json(json!({
        "dashboard": {
            "products": { "total": product_total, "active": product_active },
            "orders": {
                "total": order_count,
                "revenue": revenue,
                "pending": status_count(&by_status, OrderStatus::Pending),
                "processing": status_count(&by_status, OrderStatus::Processing),
                "shipped": status_count(&by_status, OrderStatus::Shipped),
                "delivered": status_count(&by_status, OrderStatus::Delivered),
            },
            "blog": { "total": post_total, "published": post_published },
            "users": { "total": user_counts.total, "customers": user_counts.customers },
            "alerts": { "low_stock": low_stock },
            "recent": {
                "orders_last_7_days": orders_last_7_days,
                "revenue_last_7_days": revenue_last_7_days,
                "orders": recent,
            },
        }
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    /// Exact marketing tag match, e.g. `interest:tarot`.
    pub tag: Option<String>,
    pub email_opt_in: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/admin/users`
///
/// # Errors
///
/// Returns 403 without the view-users permission.
pub async fn list_users(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewUsers)?;

    let limit = query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    let filter = UserFilter {
        search: query.search,
        role: query.role,
        tag: query.tag,
        email_opt_in: query.email_opt_in,
        limit: Some(limit),
        offset: Some(offset),
    };

    let repo = UserRepository::new(state.pool());
    let users = repo.list(&filter).await?;
    let total = repo.count_matching(&filter).await?;

    Ok(Json(json!({
        "users": users,
        "pagination": {
            "total": total,
            "limit": limit,
            "offset": offset,
            "has_more": offset + limit < total,
        }
    })))
}

/// `GET /api/admin/users/{id}`
///
/// # Errors
///
/// Returns 403 without the view-users permission, 404 for an unknown
/// user.
pub async fn show_user(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewUsers)?;

    let user = UserRepository::new(state.pool()).get_by_id(id).await?;
    Ok(Json(json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

/// `PUT /api/admin/users/{id}/role`
///
/// Admins cannot demote themselves; losing the last admin would lock the
/// back office.
///
/// # Errors
///
/// Returns 403 without the manage-roles permission, 409 on
/// self-demotion, 404 for an unknown user.
pub async fn update_role(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ManageRoles)?;

    if id == current.id() && payload.role != Role::Admin {
        return Err(ApiError::Conflict(
            "cannot change your own admin role".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .update_role(id, payload.role)
        .await?;
    Ok(Json(json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

/// `POST /api/admin/users/{id}/tags`
///
/// # Errors
///
/// Returns 400 for an empty tag list, 403 without the edit-users
/// permission, 404 for an unknown user.
pub async fn add_tags(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<TagsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::EditUsers)?;

    if payload.tags.is_empty() {
        return Err(ApiError::Validation("tags must not be empty".to_string()));
    }

    let user = UserRepository::new(state.pool())
        .add_tags(id, &payload.tags)
        .await?;
    Ok(Json(json!({ "user": user })))
}

/// `DELETE /api/admin/users/{id}/tags`
///
/// # Errors
///
/// Returns 400 for an empty tag list, 403 without the edit-users
/// permission, 404 for an unknown user.
pub async fn remove_tags(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<TagsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::EditUsers)?;

    if payload.tags.is_empty() {
        return Err(ApiError::Validation("tags must not be empty".to_string()));
    }

    let user = UserRepository::new(state.pool())
        .remove_tags(id, &payload.tags)
        .await?;
    Ok(Json(json!({ "user": user })))
}

/// `GET /api/admin/segments`
///
/// # Errors
///
/// Returns 403 without the view-segments permission.
pub async fn list_segments(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewSegments)?;

    let service = SegmentService::new(state.pool());
    let mut segments = Vec::with_capacity(Segment::ALL.len());
    for segment in Segment::ALL {
        let count = service.count(*segment).await?;
        segments.push(json!({
            "name": segment.as_str(),
            "description": segment.description(),
            "count": count,
        }));
    }

    Ok(Json(json!({ "segments": segments })))
}

/// `GET /api/admin/segments/{name}`
///
/// # Errors
///
/// Returns 403 without the view-segments permission, 404 for an unknown
/// segment name.
pub async fn segment_members(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewSegments)?;

    let segment: Segment = name.parse().map_err(|_| ApiError::NotFound("Segment"))?;
    let users = SegmentService::new(state.pool()).members(segment).await?;

    Ok(Json(json!({
        "segment": segment.as_str(),
        "users": users,
    })))
}

/// `GET /api/admin/segments/{name}/export`
///
/// Streams the segment's member emails as CSV.
///
/// # Errors
///
/// Returns 403 without the export-segments permission, 404 for an
/// unknown segment name.
pub async fn export_segment(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    current.require_permission(Permission::ExportSegments)?;

    let segment: Segment = name.parse().map_err(|_| ApiError::NotFound("Segment"))?;
    let users = SegmentService::new(state.pool()).members(segment).await?;
    let csv = members_csv(&users);

    let disposition = format!("attachment; filename=\"{}.csv\"", segment.as_str());
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_breakdown_zero_fills_missing_roles() {
        let rows = vec![(Role::Customer, 12), (Role::Admin, 1)];
        let breakdown = role_breakdown(&rows);
        assert_eq!(breakdown["customer"], 12);
        assert_eq!(breakdown["admin"], 1);
        assert_eq!(breakdown["contributor"], 0);
        assert_eq!(breakdown["affiliate"], 0);
    }

    #[test]
    fn test_experience_breakdown_groups_null_as_not_set() {
        let rows = vec![
            (Some("beginner".to_string()), 4),
            (Some("advanced".to_string()), 2),
            (None, 7),
        ];
        let breakdown = experience_breakdown(&rows);
        assert_eq!(breakdown["beginner"], 4);
        assert_eq!(breakdown["intermediate"], 0);
        assert_eq!(breakdown["advanced"], 2);
        assert_eq!(breakdown["not_set"], 7);
    }

    #[test]
    fn test_status_count_defaults_to_zero() {
        let rows = vec![(OrderStatus::Pending, 3), (OrderStatus::Shipped, 5)];
        assert_eq!(status_count(&rows, OrderStatus::Pending), 3);
        assert_eq!(status_count(&rows, OrderStatus::Delivered), 0);
    }
}
