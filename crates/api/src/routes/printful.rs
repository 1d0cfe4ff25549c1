//! Printful fulfillment handlers.

use axum::Json;
use axum::extract::{Path, State};
use hearthglow_core::{OrderId, Permission};
use serde_json::json;

use crate::db::{OrderRepository, ProductRepository};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::printful::{FulfillmentItem, PrintfulClient, Recipient};
use crate::state::AppState;

fn client(state: &AppState) -> Result<&PrintfulClient, ApiError> {
    state
        .printful()
        .ok_or_else(|| ApiError::Upstream("Printful is not configured".to_string()))
}

/// Summarize a catalog sync run for the response body.
fn sync_report(imported: u32, skipped: u32, errors: Vec<String>) -> serde_json::Value {
    json!({
        "imported": imported,
        "skipped": skipped,
        "errors": errors,
    })
}

/// `POST /api/admin/printful/sync`
///
/// Imports the store's Printful sync catalog, upserting one local product
/// per sync variant. A failure on one product or variant is recorded and
/// the sync moves on, so a single bad row cannot abort the whole import.
///
/// # Errors
///
/// Returns 403 without the create-products permission, 502 when Printful
/// is unreachable or not configured.
pub async fn sync_products(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::CreateProducts)?;
    let printful = client(&state)?;

    let summaries = printful
        .list_products()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let repo = ProductRepository::new(state.pool());
    let mut imported = 0u32;
    let mut skipped = 0u32;
    let mut errors = Vec::new();

    for summary in &summaries {
        let detail = match printful.get_product(summary.id).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(product = %summary.name, error = %e, "printful product fetch failed");
                errors.push(format!("{}: {e}", summary.name));
                continue;
            }
        };

        for variant in &detail.sync_variants {
            let Some(import) = super::products::import_from_variant(
                &detail.sync_product.name,
                detail.sync_product.thumbnail_url.as_deref(),
                variant,
                detail.sync_product.id,
            ) else {
                skipped += 1;
                continue;
            };
            match repo.upsert_printful(&import).await {
                Ok(_) => imported += 1,
                Err(e) => {
                    tracing::warn!(variant = %variant.name, error = %e, "printful variant upsert failed");
                    errors.push(format!("{}: {e}", variant.name));
                }
            }
        }
    }

    Ok(Json(sync_report(imported, skipped, errors)))
}

/// `POST /api/admin/orders/{id}/printful`
///
/// Submits an order's print-on-demand lines for fulfillment. Submitting
/// an already-submitted order is a no-op, as is an order with no
/// qualifying lines.
///
/// # Errors
///
/// Returns 403 without the manage-orders permission, 404 for an unknown
/// order, 502 when Printful is unreachable.
pub async fn submit_order(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ManageOrders)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo.get_by_id(id).await?;

    // Already submitted: report the existing fulfillment order.
    if let Some(existing) = &order.printful_order_id {
        return Ok(Json(json!({
            "submitted": false,
            "printful_order_id": existing,
            "printful_order_status": order.printful_order_status,
        })));
    }

    let items = fulfillment_items(&order);
    if items.is_empty() {
        return Ok(Json(json!({
            "submitted": false,
            "message": "order has no print-on-demand items",
        })));
    }

    let recipient = recipient_from_order(&order).ok_or_else(|| {
        ApiError::Validation("order shipping address is missing required fields".to_string())
    })?;

    let created = client(&state)?
        .create_order(&order.order_number, &recipient, &items)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    repo.attach_printful_order(id, &created.id.to_string(), &created.status)
        .await?;

    Ok(Json(json!({
        "submitted": true,
        "printful_order_id": created.id.to_string(),
        "printful_order_status": created.status,
    })))
}

/// `GET /api/admin/orders/{id}/printful`
///
/// Polls the fulfillment order's status and caches it on our order row.
///
/// # Errors
///
/// Returns 403 without the view-all-orders permission, 404 when the order
/// has no fulfillment order, 502 when Printful is unreachable.
pub async fn order_status(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::ViewAllOrders)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo.get_by_id(id).await?;
    let printful_order_id = order
        .printful_order_id
        .as_deref()
        .ok_or(ApiError::NotFound("Fulfillment order"))?;

    let fetched = client(&state)?
        .get_order(printful_order_id)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    repo.update_printful_status(id, &fetched.status).await?;

    Ok(Json(json!({
        "printful_order_id": printful_order_id,
        "printful_order_status": fetched.status,
    })))
}

/// The order's print-on-demand lines.
fn fulfillment_items(order: &Order) -> Vec<FulfillmentItem> {
    order
        .items
        .0
        .iter()
        .filter_map(|item| {
            item.printful_variant_id.map(|sync_variant_id| FulfillmentItem {
                sync_variant_id,
                quantity: item.quantity,
            })
        })
        .collect()
}

/// Build a shipping recipient from the order's address snapshot.
fn recipient_from_order(order: &Order) -> Option<Recipient> {
    let addr = &order.shipping_address;
    let field = |key: &str| addr.get(key).and_then(|v| v.as_str()).map(ToOwned::to_owned);

    Some(Recipient {
        name: order.customer_name.clone(),
        address1: field("line1").or_else(|| field("address1"))?,
        address2: field("line2").or_else(|| field("address2")),
        city: field("city")?,
        state_code: field("state")?,
        country_code: field("country").unwrap_or_else(|| "US".to_string()),
        zip: field("zip").or_else(|| field("postal_code"))?,
        email: Some(order.customer_email.clone()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use hearthglow_core::{OrderStatus, PaymentStatus, ProductId};
    use rust_decimal::Decimal;
    use sqlx::types::Json as SqlxJson;

    use super::*;
    use crate::models::OrderItem;

    fn order(items: Vec<OrderItem>, shipping: serde_json::Value) -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "ORD-abc123-wxyz".to_string(),
            user_id: None,
            customer_email: "buyer@example.com".to_string(),
            customer_name: "Guest Buyer".to_string(),
            shipping_address: shipping,
            billing_address: serde_json::json!({}),
            items: SqlxJson(items),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            notes: String::new(),
            printful_order_id: None,
            printful_order_status: None,
            checkout_session_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(printful_variant_id: Option<i64>) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            product_name: "Mug".to_string(),
            variant_id: None,
            variant_name: None,
            quantity: 2,
            unit_price: Decimal::ONE,
            line_total: Decimal::TWO,
            image_url: None,
            printful_variant_id,
        }
    }

    #[test]
    fn test_fulfillment_items_filters_local_lines() {
        let o = order(
            vec![item(Some(42)), item(None), item(Some(43))],
            serde_json::json!({}),
        );
        let items = fulfillment_items(&o);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sync_variant_id, 42);
    }

    #[test]
    fn test_recipient_requires_address_fields() {
        let complete = order(
            vec![],
            serde_json::json!({
                "line1": "12 Fern Lane", "city": "Portland",
                "state": "OR", "zip": "97201"
            }),
        );
        let recipient = recipient_from_order(&complete).unwrap();
        assert_eq!(recipient.country_code, "US");
        assert_eq!(recipient.zip, "97201");

        let incomplete = order(vec![], serde_json::json!({ "city": "Portland" }));
        assert!(recipient_from_order(&incomplete).is_none());
    }

    #[test]
    fn test_sync_report_carries_per_item_errors() {
        let report = sync_report(
            3,
            1,
            vec!["Moon Mug / 11oz: slug already exists".to_string()],
        );
        assert_eq!(report["imported"], 3);
        assert_eq!(report["skipped"], 1);
        assert_eq!(report["errors"].as_array().unwrap().len(), 1);
        assert!(
            report["errors"][0]
                .as_str()
                .unwrap()
                .contains("Moon Mug / 11oz")
        );
    }

    #[test]
    fn test_recipient_accepts_alternate_keys() {
        let o = order(
            vec![],
            serde_json::json!({
                "address1": "12 Fern Lane", "city": "Portland",
                "state": "OR", "postal_code": "97201", "country": "CA"
            }),
        );
        let recipient = recipient_from_order(&o).unwrap();
        assert_eq!(recipient.address1, "12 Fern Lane");
        assert_eq!(recipient.country_code, "CA");
    }
}
