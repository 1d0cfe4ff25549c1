//! Hosted checkout handlers.

use axum::Json;
use axum::extract::{Path, State};
use hearthglow_core::{OrderId, PaymentStatus, Permission};
use serde_json::json;

use crate::db::OrderRepository;
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `POST /api/orders/{id}/checkout`
///
/// Creates a hosted payment link for an unpaid order. The caller must own
/// the order or hold manage-orders.
///
/// # Errors
///
/// Returns 403 on a failed ownership check, 404 for an unknown order,
/// 409 when the order is already paid, 502 when the gateway is
/// unreachable or not configured.
pub async fn create_session(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = OrderRepository::new(state.pool());
    let order = repo.get_by_id(id).await?;

    if order.user_id != Some(current.id()) {
        current.require_permission(Permission::ManageOrders)?;
    }

    if order.payment_status == PaymentStatus::Paid {
        return Err(ApiError::Conflict("order is already paid".to_string()));
    }

    let checkout = state
        .checkout()
        .ok_or_else(|| ApiError::Upstream("checkout is not configured".to_string()))?;

    let session = checkout
        .create_session(&order)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    repo.set_checkout_session(id, &session.id).await?;

    Ok(Json(json!({
        "checkout_session_id": session.id,
        "checkout_url": session.url,
    })))
}
