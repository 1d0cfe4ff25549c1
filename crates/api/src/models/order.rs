use chrono::{DateTime, Utc};
use hearthglow_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// An order row. Line items are a JSONB snapshot taken at placement time;
/// later product edits never change what the customer bought.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub items: Json<Vec<OrderItem>>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub notes: String,
    pub printful_order_id: Option<String>,
    pub printful_order_status: Option<String>,
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A snapshotted order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Carried so fulfillment submission does not need a product join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printful_variant_id: Option<i64>,
}

/// Trimmed order shape for list endpoints.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
