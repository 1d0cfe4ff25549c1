//! Printful API client for print-on-demand fulfillment.
//!
//! Covers the three calls the back office needs: listing the store's sync
//! catalog, creating fulfillment orders, and polling order status.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Printful API base URL.
const BASE_URL: &str = "https://api.printful.com";

/// Errors that can occur when interacting with the Printful API.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Printful wraps every payload in `{ code, result }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// A sync product as listed by `GET /store/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Full sync product detail, variants included.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncProductDetail {
    pub sync_product: SyncProductSummary,
    pub sync_variants: Vec<SyncVariant>,
}

/// One sellable variant of a sync product.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariant {
    pub id: i64,
    pub name: String,
    pub retail_price: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub product: Option<SyncVariantProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncVariantProduct {
    #[serde(default)]
    pub image: Option<String>,
}

impl SyncVariant {
    /// Parse the retail price, which Printful sends as a string.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.retail_price.parse().ok()
    }
}

/// Shipping recipient for a fulfillment order.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// One fulfillment line: a sync variant and a quantity.
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentItem {
    pub sync_variant_id: i64,
    pub quantity: i32,
}

/// A created or fetched fulfillment order.
#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentOrder {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Printful API client.
#[derive(Clone)]
pub struct PrintfulClient {
    client: reqwest::Client,
}

impl PrintfulClient {
    /// Create a new Printful API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or
    /// the HTTP client cannot be built. A client without its auth
    /// header would fail every call, so this never falls back to a
    /// default client.
    pub fn new(api_key: &SecretString) -> Result<Self, PrintfulError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", api_key.expose_secret());
        let mut value = HeaderValue::from_str(&auth_value)
            .map_err(|e| PrintfulError::Parse(format!("invalid API key: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    /// List all sync products in the store.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn list_products(&self) -> Result<Vec<SyncProductSummary>, PrintfulError> {
        self.get(&format!("{BASE_URL}/store/products?limit=100")).await
    }

    /// Fetch one sync product with its variants.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn get_product(&self, id: i64) -> Result<SyncProductDetail, PrintfulError> {
        self.get(&format!("{BASE_URL}/store/products/{id}")).await
    }

    /// Create a fulfillment order. `external_id` carries our order number
    /// so the two systems can be reconciled.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_order(
        &self,
        external_id: &str,
        recipient: &Recipient,
        items: &[FulfillmentItem],
    ) -> Result<FulfillmentOrder, PrintfulError> {
        let body = serde_json::json!({
            "external_id": external_id,
            "recipient": recipient,
            "items": items,
        });

        let response = self
            .client
            .post(format!("{BASE_URL}/orders"))
            .json(&body)
            .send()
            .await?;

        Self::unwrap_envelope(response).await
    }

    /// Fetch a fulfillment order's current status.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn get_order(&self, printful_order_id: &str) -> Result<FulfillmentOrder, PrintfulError> {
        self.get(&format!("{BASE_URL}/orders/{printful_order_id}")).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, PrintfulError> {
        let response = self.client.get(url).send().await?;
        Self::unwrap_envelope(response).await
    }

    async fn unwrap_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PrintfulError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PrintfulError::Parse(e.to_string()))?;
        Ok(envelope.result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_variant_price_parses_string() {
        let variant: SyncVariant = serde_json::from_value(serde_json::json!({
            "id": 101,
            "name": "Moon Mug / 11oz",
            "retail_price": "18.50",
            "sku": "MM-11"
        }))
        .unwrap();

        assert_eq!(variant.price(), Some(Decimal::new(1850, 2)));
    }

    #[test]
    fn test_sync_variant_price_rejects_garbage() {
        let variant: SyncVariant = serde_json::from_value(serde_json::json!({
            "id": 101,
            "name": "Moon Mug",
            "retail_price": "n/a"
        }))
        .unwrap();
        assert_eq!(variant.price(), None);
    }

    #[test]
    fn test_envelope_unwraps_result() {
        let envelope: Envelope<Vec<SyncProductSummary>> = serde_json::from_value(
            serde_json::json!({
                "code": 200,
                "result": [{"id": 5, "name": "Altar Cloth", "thumbnail_url": null}]
            }),
        )
        .unwrap();
        assert_eq!(envelope.result.len(), 1);
        assert_eq!(envelope.result[0].id, 5);
    }

    #[test]
    fn test_recipient_omits_empty_optionals() {
        let recipient = Recipient {
            name: "Ana Reyes".to_string(),
            address1: "12 Fern Lane".to_string(),
            address2: None,
            city: "Portland".to_string(),
            state_code: "OR".to_string(),
            country_code: "US".to_string(),
            zip: "97201".to_string(),
            email: None,
        };
        let json = serde_json::to_string(&recipient).unwrap();
        assert!(!json.contains("address2"));
        assert!(!json.contains("email"));
    }
}
