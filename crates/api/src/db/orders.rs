//! Order repository and the order placement transaction.
//!
//! Placement runs inside a single database transaction: product rows are
//! locked with `SELECT ... FOR UPDATE` in ascending id order, each line is
//! validated against the locked row, stock is decremented, and the order
//! row is inserted. Either every line commits or none do.
//!
//! Line validation and stock arithmetic live in pure functions on the
//! fetched rows, so the pricing and stock rules are unit-testable without
//! a database.

use hearthglow_core::{OrderId, OrderStatus, OrderTotals, PaymentStatus, ProductId, UserId, round_money};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use thiserror::Error;

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderSummary, Product};

/// Attempts at generating a unique order number before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// A requested order line, as submitted by the client. Prices never come
/// from the client; they are read from the locked product row.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i32,
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Option<UserId>,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub notes: String,
    pub items: Vec<CartLine>,
}

/// Why an order could not be placed.
#[derive(Debug, Error)]
pub enum OrderPlacementError {
    #[error("order must contain at least one item")]
    EmptyCart,

    #[error("quantity must be positive for product {0}")]
    InvalidQuantity(ProductId),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {name} is not available for purchase")]
    Unavailable { name: String },

    #[error("product {name} has no variant {variant_id}")]
    UnknownVariant { name: String, variant_id: String },

    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: i32,
        available: i32,
    },

    /// All order-number attempts collided. Practically unreachable.
    #[error("could not allocate a unique order number")]
    NumberExhausted,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Filters for admin order listings.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order: validate every line against locked product rows,
    /// decrement stock, and insert the order. Atomic.
    ///
    /// # Errors
    ///
    /// Returns `OrderPlacementError` describing the first line that failed
    /// validation, or a database error. On any error nothing is written.
    pub async fn place(&self, draft: &OrderDraft) -> Result<Order, OrderPlacementError> {
        if draft.items.is_empty() {
            return Err(OrderPlacementError::EmptyCart);
        }
        for line in &draft.items {
            if line.quantity <= 0 {
                return Err(OrderPlacementError::InvalidQuantity(line.product_id));
            }
        }

        let mut tx = self.pool.begin().await?;

        // Lock rows in ascending product id order so two concurrent orders
        // over the same products cannot deadlock.
        let mut lines = draft.items.clone();
        lines.sort_by_key(|l| l.product_id.as_i32());

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let mut product = lock_product(&mut tx, line.product_id).await?;
            let item = apply_line(&mut product, line)?;
            write_back_stock(&mut tx, &product).await?;
            items.push(item);
        }

        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();
        let totals = OrderTotals::from_subtotal(subtotal);

        let order = insert_order(&mut tx, draft, &items, &totals).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::for_entity(e, "Order"))
    }

    /// Get an order by its customer-facing order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::for_entity(e, "Order"))
    }

    /// List orders for the admin back-office, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, order_number, customer_email, customer_name, total, \
             status, payment_status, created_at FROM orders WHERE TRUE",
        );

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(payment_status) = filter.payment_status {
            qb.push(" AND payment_status = ").push_bind(payment_status);
        }

        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }

        let orders = qb
            .build_query_as::<OrderSummary>()
            .fetch_all(self.pool)
            .await?;
        Ok(orders)
    }

    /// List a customer's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Update fulfillment and/or payment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(
            "UPDATE orders SET \
             status = COALESCE($2, status), \
             payment_status = COALESCE($3, payment_status), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::for_entity(e, "Order"))
    }

    /// Attach a hosted checkout session to an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn set_checkout_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET checkout_session_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(session_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Order"));
        }
        Ok(())
    }

    /// Record the fulfillment order created upstream. Writes only when no
    /// fulfillment order is attached yet; returns `false` when one already
    /// was, so a duplicate submission becomes a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn attach_printful_order(
        &self,
        id: OrderId,
        printful_order_id: &str,
        printful_status: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET printful_order_id = $2, printful_order_status = $3, \
             updated_at = NOW() \
             WHERE id = $1 AND printful_order_id IS NULL",
        )
        .bind(id)
        .bind(printful_order_id)
        .bind(printful_status)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Refresh the cached fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    pub async fn update_printful_status(
        &self,
        id: OrderId,
        printful_status: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET printful_order_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(printful_status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Order"));
        }
        Ok(())
    }

    /// Order count and paid revenue, for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_totals(&self) -> Result<(i64, Decimal), RepositoryError> {
        let (count, revenue): (i64, Option<Decimal>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(total) FILTER (WHERE payment_status = 'paid') FROM orders",
        )
        .fetch_one(self.pool)
        .await?;
        Ok((count, revenue.unwrap_or(Decimal::ZERO)))
    }

    /// Order counts grouped by fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_breakdown(&self) -> Result<Vec<(OrderStatus, i64)>, RepositoryError> {
        let rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// Order count and revenue over the trailing window, for the admin
    /// dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_since_days(&self, days: i32) -> Result<(i64, Decimal), RepositoryError> {
        let (count, revenue): (i64, Option<Decimal>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(total) FROM orders \
             WHERE created_at >= NOW() - make_interval(days => $1)",
        )
        .bind(days)
        .fetch_one(self.pool)
        .await?;
        Ok((count, revenue.unwrap_or(Decimal::ZERO)))
    }

    /// The most recent orders, for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<OrderSummary>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderSummary>(
            "SELECT id, order_number, customer_email, customer_name, total, \
             status, payment_status, created_at \
             FROM orders ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }
}

/// Fetch and lock a product row for the duration of the transaction.
async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<Product, OrderPlacementError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderPlacementError::ProductNotFound(id))
}

/// Write decremented stock back to the locked row.
async fn write_back_stock(
    tx: &mut Transaction<'_, Postgres>,
    product: &Product,
) -> Result<(), OrderPlacementError> {
    sqlx::query(
        "UPDATE products SET stock_quantity = $2, variants = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(product.id)
    .bind(product.stock_quantity)
    .bind(&product.variants)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert the order row, retrying on an order-number collision.
async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    draft: &OrderDraft,
    items: &[OrderItem],
    totals: &OrderTotals,
) -> Result<Order, OrderPlacementError> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let order_number = generate_order_number();
        let result = sqlx::query_as::<_, Order>(
            "INSERT INTO orders \
             (order_number, user_id, customer_email, customer_name, \
              shipping_address, billing_address, items, subtotal, tax, shipping, total, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(&order_number)
        .bind(draft.user_id)
        .bind(&draft.customer_email)
        .bind(&draft.customer_name)
        .bind(&draft.shipping_address)
        .bind(&draft.billing_address)
        .bind(Json(items))
        .bind(totals.subtotal)
        .bind(totals.tax)
        .bind(totals.shipping)
        .bind(totals.total)
        .bind(&draft.notes)
        .fetch_one(&mut **tx)
        .await;

        match result {
            Ok(order) => return Ok(order),
            Err(e) if RepositoryError::is_unique_violation(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(OrderPlacementError::NumberExhausted)
}

/// Validate one cart line against a product row, decrementing the stock
/// it consumes in place. Pricing comes from the row, never the client.
fn apply_line(product: &mut Product, line: &CartLine) -> Result<OrderItem, OrderPlacementError> {
    if !product.is_active {
        return Err(OrderPlacementError::Unavailable {
            name: product.name.clone(),
        });
    }

    let variant = match &line.variant_id {
        Some(variant_id) => {
            let Some(v) = product.variant(variant_id).cloned() else {
                return Err(OrderPlacementError::UnknownVariant {
                    name: product.name.clone(),
                    variant_id: variant_id.clone(),
                });
            };
            Some(v)
        }
        None => None,
    };

    let unit_price = product.unit_price(variant.as_ref());

    // Variant-tracked stock takes precedence; otherwise the product-level
    // counter is authoritative.
    match variant.as_ref().and_then(|v| v.stock_quantity) {
        Some(available) => {
            if available < line.quantity {
                // Name the variant, not just the product, so the customer
                // knows which option ran out.
                return Err(OrderPlacementError::InsufficientStock {
                    name: match variant.as_ref() {
                        Some(v) => format!("{} ({})", product.name, v.name),
                        None => product.name.clone(),
                    },
                    requested: line.quantity,
                    available,
                });
            }
            if let Some(variant_id) = &line.variant_id
                && let Some(v) = product
                    .variants
                    .0
                    .iter_mut()
                    .find(|v| &v.id == variant_id)
            {
                v.stock_quantity = Some(available - line.quantity);
            }
        }
        None => {
            if product.stock_quantity < line.quantity {
                return Err(OrderPlacementError::InsufficientStock {
                    name: product.name.clone(),
                    requested: line.quantity,
                    available: product.stock_quantity,
                });
            }
            product.stock_quantity -= line.quantity;
        }
    }

    let line_total = round_money(unit_price * Decimal::from(line.quantity));

    Ok(OrderItem {
        product_id: product.id,
        product_name: product.name.clone(),
        variant_id: line.variant_id.clone(),
        variant_name: variant.as_ref().map(|v| v.name.clone()),
        quantity: line.quantity,
        unit_price,
        line_total,
        image_url: product.image_url.clone(),
        printful_variant_id: variant
            .as_ref()
            .and_then(|v| v.printful_variant_id)
            .or(product.printful_sync_variant_id),
    })
}

/// Allocate a human-readable order number: `ORD-{timestamp}-{random}`,
/// with the millisecond timestamp in base 36 and a 4-character random
/// suffix. Uniqueness is enforced by the database, not this function.
fn generate_order_number() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = {
        const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::rng();
        (0..4)
            .map(|_| char::from(CHARSET[rng.random_range(0..CHARSET.len())]))
            .collect()
    };
    format!("ORD-{}-{}", to_base36(millis), suffix)
}

/// Encode a non-negative integer in lowercase base 36.
fn to_base36(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    // DIGITS is pure ASCII
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use hearthglow_core::Slug;

    use super::*;
    use crate::models::ProductVariant;

    fn product(stock: i32, price: Decimal) -> Product {
        Product {
            id: ProductId::new(7),
            name: "Beeswax Candle".to_string(),
            slug: Slug::parse("beeswax-candle").unwrap(),
            description: String::new(),
            price,
            compare_at_price: None,
            stock_quantity: stock,
            category_id: None,
            image_url: Some("/img/candle.jpg".to_string()),
            images: vec![],
            is_featured: false,
            is_active: true,
            metadata: serde_json::json!({}),
            variants: Json(vec![]),
            is_printful: false,
            printful_sync_product_id: None,
            printful_sync_variant_id: None,
            sku: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(quantity: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(7),
            variant_id: None,
            quantity,
        }
    }

    #[test]
    fn test_apply_line_decrements_stock_and_prices_from_row() {
        let mut p = product(10, Decimal::new(2000, 2));
        let item = apply_line(&mut p, &line(2)).unwrap();

        assert_eq!(p.stock_quantity, 8);
        assert_eq!(item.unit_price, Decimal::new(2000, 2));
        assert_eq!(item.line_total, Decimal::new(4000, 2));
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_apply_line_rejects_insufficient_stock() {
        let mut p = product(1, Decimal::new(2000, 2));
        let err = apply_line(&mut p, &line(3)).unwrap_err();

        match err {
            OrderPlacementError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Stock untouched on failure
        assert_eq!(p.stock_quantity, 1);
    }

    #[test]
    fn test_apply_line_rejects_inactive_product() {
        let mut p = product(10, Decimal::ONE);
        p.is_active = false;
        assert!(matches!(
            apply_line(&mut p, &line(1)),
            Err(OrderPlacementError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_apply_line_variant_stock_takes_precedence() {
        let mut p = product(0, Decimal::new(2499, 2));
        p.variants = Json(vec![ProductVariant {
            id: "large".to_string(),
            name: "Large".to_string(),
            price: Some(Decimal::new(2999, 2)),
            stock_quantity: Some(5),
            sku: None,
            printful_variant_id: None,
        }]);

        let l = CartLine {
            product_id: ProductId::new(7),
            variant_id: Some("large".to_string()),
            quantity: 2,
        };
        let item = apply_line(&mut p, &l).unwrap();

        // Product-level stock of zero does not block a variant-tracked line
        assert_eq!(item.unit_price, Decimal::new(2999, 2));
        assert_eq!(p.variants.0[0].stock_quantity, Some(3));
        assert_eq!(p.stock_quantity, 0);
    }

    #[test]
    fn test_apply_line_variant_shortage_names_the_variant() {
        let mut p = product(100, Decimal::new(2499, 2));
        p.variants = Json(vec![ProductVariant {
            id: "large".to_string(),
            name: "Large".to_string(),
            price: None,
            stock_quantity: Some(1),
            sku: None,
            printful_variant_id: None,
        }]);

        let l = CartLine {
            product_id: ProductId::new(7),
            variant_id: Some("large".to_string()),
            quantity: 2,
        };
        match apply_line(&mut p, &l).unwrap_err() {
            OrderPlacementError::InsufficientStock { name, .. } => {
                assert_eq!(name, "Beeswax Candle (Large)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_apply_line_unknown_variant() {
        let mut p = product(10, Decimal::ONE);
        let l = CartLine {
            product_id: ProductId::new(7),
            variant_id: Some("missing".to_string()),
            quantity: 1,
        };
        assert!(matches!(
            apply_line(&mut p, &l),
            Err(OrderPlacementError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_checkout_totals_below_free_shipping() {
        // Two 20.00 items: tax 4.00, flat shipping, total 53.99
        let mut p = product(10, Decimal::new(2000, 2));
        let item = apply_line(&mut p, &line(2)).unwrap();
        let totals = OrderTotals::from_subtotal(item.line_total);

        assert_eq!(totals.subtotal, Decimal::new(4000, 2));
        assert_eq!(totals.tax, Decimal::new(400, 2));
        assert_eq!(totals.shipping, Decimal::new(999, 2));
        assert_eq!(totals.total, Decimal::new(5399, 2));
    }

    #[test]
    fn test_order_number_shape() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(!parts[1].is_empty());
        assert_eq!(parts[2].len(), 4);
        assert!(
            parts[1]
                .chars()
                .chain(parts[2].chars())
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_to_base36_roundtrip() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");

        let encoded = to_base36(1_700_000_000_000);
        assert_eq!(
            i64::from_str_radix(&encoded, 36).unwrap(),
            1_700_000_000_000
        );
    }
}
