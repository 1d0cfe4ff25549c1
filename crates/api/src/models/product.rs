use chrono::{DateTime, Utc};
use hearthglow_core::{CategoryId, ProductId, Slug};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// A catalog product row.
///
/// Variants live embedded in the row as a JSONB array; a variant-less
/// product just has an empty list.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub metadata: serde_json::Value,
    pub variants: Json<Vec<ProductVariant>>,
    pub is_printful: bool,
    pub printful_sync_product_id: Option<i64>,
    pub printful_sync_variant_id: Option<i64>,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Look up an embedded variant by id.
    #[must_use]
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.0.iter().find(|v| v.id == variant_id)
    }

    /// Effective unit price for an order line: the variant's own price when
    /// it has one, otherwise the product price.
    #[must_use]
    pub fn unit_price(&self, variant: Option<&ProductVariant>) -> Decimal {
        variant.and_then(|v| v.price).unwrap_or(self.price)
    }
}

/// An embedded product variant (size, color, deck edition).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// When present, stock is tracked per-variant instead of per-product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printful_variant_id: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Rider Tarot Deck".to_string(),
            slug: Slug::parse("rider-tarot-deck").unwrap(),
            description: String::new(),
            price: Decimal::new(2499, 2),
            compare_at_price: None,
            stock_quantity: 10,
            category_id: None,
            image_url: None,
            images: vec![],
            is_featured: false,
            is_active: true,
            metadata: serde_json::json!({}),
            variants: Json(vec![
                ProductVariant {
                    id: "standard".to_string(),
                    name: "Standard".to_string(),
                    price: None,
                    stock_quantity: Some(5),
                    sku: None,
                    printful_variant_id: None,
                },
                ProductVariant {
                    id: "deluxe".to_string(),
                    name: "Deluxe".to_string(),
                    price: Some(Decimal::new(3999, 2)),
                    stock_quantity: Some(2),
                    sku: None,
                    printful_variant_id: None,
                },
            ]),
            is_printful: false,
            printful_sync_product_id: None,
            printful_sync_variant_id: None,
            sku: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_variant_lookup() {
        let product = sample_product();
        assert!(product.variant("deluxe").is_some());
        assert!(product.variant("missing").is_none());
    }

    #[test]
    fn test_unit_price_prefers_variant_price() {
        let product = sample_product();
        let deluxe = product.variant("deluxe").cloned();
        assert_eq!(product.unit_price(deluxe.as_ref()), Decimal::new(3999, 2));
    }

    #[test]
    fn test_unit_price_falls_back_to_product_price() {
        let product = sample_product();
        let standard = product.variant("standard").cloned();
        assert_eq!(product.unit_price(standard.as_ref()), Decimal::new(2499, 2));
        assert_eq!(product.unit_price(None), Decimal::new(2499, 2));
    }
}
