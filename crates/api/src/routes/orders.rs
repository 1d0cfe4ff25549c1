//! Order handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use hearthglow_core::{Email, OrderId, OrderStatus, PaymentStatus, Permission, UserId};
use serde::Deserialize;
use serde_json::json;

use crate::db::OrderRepository;
use crate::db::orders::{CartLine, OrderDraft, OrderFilter};
use crate::error::ApiError;
use crate::middleware::{CurrentUser, OptionalAuth, RequireAuth};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// Required for guest checkout; authed requests default to the
    /// account email.
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub shipping_address: serde_json::Value,
    /// Defaults to the shipping address.
    pub billing_address: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: String,
    pub items: Vec<CartLine>,
}

/// Resolve the draft's customer identity from the payload and the
/// optional authenticated user.
fn build_draft(
    payload: PlaceOrderRequest,
    current: Option<&CurrentUser>,
) -> Result<OrderDraft, ApiError> {
    let customer_email = match (payload.customer_email, current) {
        (Some(raw), _) => Email::parse(&raw)
            .map_err(|e| ApiError::Validation(e.to_string()))?
            .into_inner(),
        (None, Some(user)) => user.0.email.as_str().to_owned(),
        (None, None) => {
            return Err(ApiError::Validation(
                "customer_email is required for guest checkout".to_string(),
            ));
        }
    };

    let customer_name = payload
        .customer_name
        .or_else(|| current.map(|u| u.0.full_name()))
        .unwrap_or_default();

    let billing_address = payload
        .billing_address
        .unwrap_or_else(|| payload.shipping_address.clone());

    Ok(OrderDraft {
        user_id: current.map(CurrentUser::id),
        customer_email,
        customer_name,
        shipping_address: payload.shipping_address,
        billing_address,
        notes: payload.notes,
        items: payload.items,
    })
}

/// `POST /api/orders`
///
/// Guest or authenticated checkout. Validation, stock decrement, and the
/// order insert run in one transaction.
///
/// # Errors
///
/// Returns 400 for an empty cart or bad quantities, 404 for an unknown
/// product, 409 for insufficient stock, 422 for an inactive product or
/// unknown variant.
pub async fn place(
    OptionalAuth(current): OptionalAuth,
    State(state): State<AppState>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let draft = build_draft(payload, current.as_ref())?;
    let order = OrderRepository::new(state.pool()).place(&draft).await?;
    Ok(Json(json!({ "order": order })))
}

/// `GET /api/orders/mine`
///
/// # Errors
///
/// Returns 401 without a valid token.
pub async fn mine(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(current.id())
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

/// Decide whether the caller may read an order.
///
/// Guest orders have no owner; knowing the order number is the
/// credential. Orders tied to an account are readable by the owner or
/// by anyone holding view-all-orders.
fn ensure_order_access(
    owner: Option<UserId>,
    current: Option<&CurrentUser>,
) -> Result<(), ApiError> {
    let Some(owner) = owner else {
        return Ok(());
    };
    match current {
        Some(user) if user.id() == owner => Ok(()),
        Some(user) => user.require_permission(Permission::ViewAllOrders),
        None => Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        )),
    }
}

/// `GET /api/orders/{order_number}`
///
/// Lookup by the customer-facing order number. Guests can fetch their
/// own orders with no token.
///
/// # Errors
///
/// Returns 401 when the order belongs to an account and no token was
/// sent, 403 when it belongs to someone else and the caller lacks
/// view-all-orders, 404 for an unknown order number.
pub async fn show(
    OptionalAuth(current): OptionalAuth,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order = OrderRepository::new(state.pool())
        .get_by_number(&order_number)
        .await?;

    ensure_order_access(order.user_id, current.as_ref())?;

    Ok(Json(json!({ "order": order })))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/admin/orders`
///
/// # Errors
///
/// Returns 403 without the view-all-orders permission.
pub async fn list_all(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewAllOrders)?;

    let filter = OrderFilter {
        status: query.status,
        payment_status: query.payment_status,
        limit: Some(query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
        offset: query.offset.map(|o| o.max(0)),
    };

    let orders = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(json!({ "orders": orders })))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// `PATCH /api/admin/orders/{id}/status`
///
/// # Errors
///
/// Returns 400 when neither field is present, 403 without the
/// manage-orders permission, 404 for an unknown order.
pub async fn update_status(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ManageOrders)?;

    if payload.status.is_none() && payload.payment_status.is_none() {
        return Err(ApiError::Validation(
            "status or payment_status is required".to_string(),
        ));
    }

    let order = OrderRepository::new(state.pool())
        .update_status(id, payload.status, payload.payment_status)
        .await?;
    Ok(Json(json!({ "order": order })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hearthglow_core::ProductId;

    fn payload(email: Option<&str>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer_email: email.map(ToOwned::to_owned),
            customer_name: Some("Guest Buyer".to_string()),
            shipping_address: serde_json::json!({"line1": "12 Fern Lane"}),
            billing_address: None,
            notes: String::new(),
            items: vec![CartLine {
                product_id: ProductId::new(1),
                variant_id: None,
                quantity: 1,
            }],
        }
    }

    #[test]
    fn test_guest_draft_requires_email() {
        let err = build_draft(payload(None), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_guest_draft_normalizes_email() {
        let draft = build_draft(payload(Some("  Buyer@Example.COM ")), None).unwrap();
        assert_eq!(draft.customer_email, "buyer@example.com");
        assert!(draft.user_id.is_none());
    }

    #[test]
    fn test_billing_defaults_to_shipping() {
        let draft = build_draft(payload(Some("b@example.com")), None).unwrap();
        assert_eq!(draft.billing_address, draft.shipping_address);
    }

    fn customer(id: i32) -> CurrentUser {
        use chrono::Utc;
        use hearthglow_core::Role;
        use rust_decimal::Decimal;

        CurrentUser(crate::models::User {
            id: UserId::new(id),
            email: Email::parse("buyer@example.com").unwrap(),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "Buyer".to_string(),
            role: Role::Customer,
            email_opt_in: false,
            sms_opt_in: false,
            tracking_opt_in: false,
            email_frequency: "weekly".to_string(),
            birthday: None,
            location: None,
            experience_level: None,
            traditions: vec![],
            interests: vec![],
            favorite_product_types: vec![],
            blog_subscription: false,
            workshop_interest: false,
            tags: vec![],
            lifetime_value: Decimal::ZERO,
            cart_abandoned_count: 0,
            last_purchase: None,
            email_last_opened: None,
            email_clicked_offers: 0,
            profile_completion_step: 0,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn test_guest_order_readable_without_token() {
        assert!(ensure_order_access(None, None).is_ok());
    }

    #[test]
    fn test_owned_order_readable_by_owner() {
        let owner = customer(10);
        assert!(ensure_order_access(Some(UserId::new(10)), Some(&owner)).is_ok());
    }

    #[test]
    fn test_owned_order_hidden_from_other_customers() {
        let stranger = customer(11);
        let err = ensure_order_access(Some(UserId::new(10)), Some(&stranger)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_owned_order_requires_a_token() {
        let err = ensure_order_access(Some(UserId::new(10)), None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
