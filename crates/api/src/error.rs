//! API error handling.
//!
//! Every handler returns `Result<_, ApiError>`. The `IntoResponse` impl maps
//! each variant to a status code and a `{"error", "message"}` JSON body, and
//! reports server-class errors to Sentry before responding.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::db::orders::OrderPlacementError;

/// Errors that can occur in API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request payload failed validation (400).
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist (404).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request conflicts with current state, e.g. a duplicate email (409).
    #[error("{0}")]
    Conflict(String),

    /// Not enough stock to satisfy the requested quantity (409).
    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        requested: i32,
        available: i32,
    },

    /// Item exists but cannot currently be purchased (422).
    #[error("{0}")]
    Unavailable(String),

    /// Database failure (500).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Upstream service failure (502).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Anything else unexpected (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InsufficientStock { .. } => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short machine-readable error label for the response envelope.
    const fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::Unavailable(_) => "unavailable",
            Self::Database(_) | Self::Internal(_) => "server_error",
            Self::Upstream(_) => "upstream_error",
        }
    }

    /// Message safe to return to the client. Server-class errors get a
    /// generic message so internals never leak.
    fn client_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Upstream(_) => "An upstream service is unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            sentry::capture_message(&self.to_string(), sentry::Level::Error);
        }

        let body = json!({
            "error": self.label(),
            "message": self.client_message(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(entity) => Self::NotFound(entity),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Database(e) => Self::Database(e),
        }
    }
}

impl From<OrderPlacementError> for ApiError {
    fn from(err: OrderPlacementError) -> Self {
        match err {
            OrderPlacementError::EmptyCart => {
                Self::Validation("order must contain at least one item".to_string())
            }
            OrderPlacementError::InvalidQuantity(id) => {
                Self::Validation(format!("quantity must be positive for product {id}"))
            }
            OrderPlacementError::ProductNotFound(_) => Self::NotFound("Product"),
            OrderPlacementError::Unavailable { name } => {
                Self::Unavailable(format!("{name} is not available for purchase"))
            }
            OrderPlacementError::UnknownVariant { name, variant_id } => {
                Self::Unavailable(format!("{name} has no variant {variant_id}"))
            }
            OrderPlacementError::InsufficientStock {
                name,
                requested,
                available,
            } => Self::InsufficientStock {
                name,
                requested,
                available,
            },
            OrderPlacementError::NumberExhausted => {
                Self::Internal("could not allocate a unique order number".to_string())
            }
            OrderPlacementError::Database(e) => Self::Database(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let err = ApiError::Validation("items array is required".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.label(), "validation_error");
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let err = ApiError::Unauthorized("Authentication required".to_string());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let err = ApiError::Forbidden("Insufficient permissions".to_string());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::NotFound("Product");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Product not found");
    }

    #[test]
    fn test_insufficient_stock_maps_to_409() {
        let err = ApiError::InsufficientStock {
            name: "Tarot Deck".to_string(),
            requested: 5,
            available: 2,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.label(), "insufficient_stock");
        assert!(err.to_string().contains("requested 5"));
    }

    #[test]
    fn test_unavailable_maps_to_422() {
        let err = ApiError::Unavailable("Product is not available".to_string());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "An internal error occurred");
        assert!(!err.client_message().contains("pool"));
    }

    #[test]
    fn test_upstream_maps_to_502() {
        let err = ApiError::Upstream("printful returned 500".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.client_message(), "An upstream service is unavailable");
    }
}
