//! Hosted checkout via Square payment links.
//!
//! The API never touches card data: it creates a payment link for an
//! already-placed order and sends the customer to Square's hosted page.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::models::Order;

/// Square API base URL.
const BASE_URL: &str = "https://connect.squareup.com/v2";

/// Errors that can occur when creating a checkout session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An order amount does not fit in the gateway's integer cents.
    #[error("amount out of range: {0}")]
    AmountOutOfRange(Decimal),
}

/// A created hosted-checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkResponse {
    payment_link: CheckoutSession,
}

/// Square payment-link client.
#[derive(Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    location_id: String,
    redirect_url: Option<String>,
}

impl CheckoutClient {
    /// Create a new checkout client.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(config: &CheckoutConfig) -> Result<Self, CheckoutError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.access_token.expose_secret());
        let mut value = HeaderValue::from_str(&auth_value)
            .map_err(|e| CheckoutError::Parse(format!("invalid access token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            location_id: config.location_id.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }

    /// Create a payment link for an order. The order number doubles as the
    /// idempotency reference on our side; the gateway gets a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or an amount cannot be
    /// expressed in integer cents.
    pub async fn create_session(&self, order: &Order) -> Result<CheckoutSession, CheckoutError> {
        let mut line_items = Vec::with_capacity(order.items.0.len() + 2);
        for item in &order.items.0 {
            line_items.push(serde_json::json!({
                "name": item.product_name,
                "quantity": item.quantity.to_string(),
                "base_price_money": {
                    "amount": to_cents(item.unit_price)?,
                    "currency": "USD"
                }
            }));
        }
        line_items.push(serde_json::json!({
            "name": "Tax",
            "quantity": "1",
            "base_price_money": { "amount": to_cents(order.tax)?, "currency": "USD" }
        }));
        if order.shipping > Decimal::ZERO {
            line_items.push(serde_json::json!({
                "name": "Shipping",
                "quantity": "1",
                "base_price_money": { "amount": to_cents(order.shipping)?, "currency": "USD" }
            }));
        }

        let mut body = serde_json::json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "order": {
                "location_id": self.location_id,
                "reference_id": order.order_number,
                "line_items": line_items,
            }
        });
        if let Some(redirect_url) = &self.redirect_url {
            body["checkout_options"] = serde_json::json!({ "redirect_url": redirect_url });
        }

        let response = self
            .client
            .post(format!("{BASE_URL}/online-checkout/payment-links"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PaymentLinkResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::Parse(e.to_string()))?;
        Ok(parsed.payment_link)
    }
}

/// Convert a decimal dollar amount to integer cents.
fn to_cents(amount: Decimal) -> Result<i64, CheckoutError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round())
        .and_then(|cents| cents.to_i64())
        .ok_or(CheckoutError::AmountOutOfRange(amount))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(Decimal::new(999, 2)).unwrap(), 999);
        assert_eq!(to_cents(Decimal::new(5399, 2)).unwrap(), 5399);
        assert_eq!(to_cents(Decimal::ZERO).unwrap(), 0);
        assert_eq!(to_cents(Decimal::new(20, 0)).unwrap(), 2000);
    }

    #[test]
    fn test_to_cents_out_of_range() {
        let huge = Decimal::MAX;
        assert!(to_cents(huge).is_err());
    }
}
