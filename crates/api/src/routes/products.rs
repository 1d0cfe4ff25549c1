//! Product handlers: public catalog reads and admin writes.

use axum::Json;
use axum::extract::{Path, Query, State};
use hearthglow_core::{Permission, ProductId, Slug};
use serde::Deserialize;
use serde_json::json;

use crate::db::products::{
    NewProduct, PrintfulImport, ProductFilter, ProductPatch, ProductSort, SortOrder,
};
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Public listings return at most this many products per page.
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    /// `createdAt` (default), `name`, `price`, or `stockQuantity`.
    #[serde(default)]
    pub sort: ProductSort,
    /// `asc` or `desc` (default).
    #[serde(default)]
    pub order: SortOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/products`
///
/// # Errors
///
/// Returns 400 for a malformed category slug or an unknown sort field,
/// 404 for an unknown category.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let category_id = match &query.category {
        Some(raw) => {
            let slug = Slug::parse(raw).map_err(|e| ApiError::Validation(e.to_string()))?;
            let id = CategoryRepository::new(state.pool())
                .id_for_slug(&slug)
                .await?
                .ok_or(ApiError::NotFound("Category"))?;
            Some(id)
        }
        None => None,
    };

    let filter = ProductFilter {
        category_id,
        featured: query.featured,
        include_inactive: false,
        search: query.search,
        sort: query.sort,
        order: query.order,
        limit: Some(query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
        offset: query.offset.map(|o| o.max(0)),
    };

    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(json!({ "products": products })))
}

/// `GET /api/products/{slug}`
///
/// # Errors
///
/// Returns 404 for an unknown or inactive product.
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let slug = Slug::parse(&slug).map_err(|_| ApiError::NotFound("Product"))?;
    let product = ProductRepository::new(state.pool()).get_by_slug(&slug).await?;
    Ok(Json(json!({ "product": product })))
}

/// `POST /api/admin/products`
///
/// # Errors
///
/// Returns 403 without the create-products permission, 409 on a slug
/// collision.
pub async fn create(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::CreateProducts)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let product = ProductRepository::new(state.pool()).create(&payload).await?;
    Ok(Json(json!({ "product": product })))
}

/// `PUT /api/admin/products/{id}`
///
/// # Errors
///
/// Returns 403 without the edit-products permission, 404 for an unknown
/// product.
pub async fn update(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(payload): Json<ProductPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::EditProducts)?;

    if payload.is_empty() {
        return Err(ApiError::Validation("no fields to update".to_string()));
    }

    let product = ProductRepository::new(state.pool()).update(id, &payload).await?;
    Ok(Json(json!({ "product": product })))
}

/// `DELETE /api/admin/products/{id}` (soft delete)
///
/// # Errors
///
/// Returns 403 without the delete-products permission, 404 for an unknown
/// product.
pub async fn remove(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::DeleteProducts)?;

    ProductRepository::new(state.pool()).soft_delete(id).await?;
    Ok(Json(json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<ProductId>,
    pub update: ProductPatch,
}

/// `POST /api/admin/products/bulk`
///
/// Applies one patch to many products. Stock values are written as
/// submitted.
///
/// # Errors
///
/// Returns 400 for an empty id list, 403 without the edit-products
/// permission.
pub async fn bulk_update(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::EditProducts)?;

    if payload.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".to_string()));
    }

    let updated = ProductRepository::new(state.pool())
        .bulk_update(&payload.ids, &payload.update)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<ProductId>,
}

/// `POST /api/admin/products/bulk/delete` (soft delete)
///
/// # Errors
///
/// Returns 400 for an empty id list, 403 without the delete-products
/// permission.
pub async fn bulk_delete(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_permission(Permission::DeleteProducts)?;

    if payload.ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".to_string()));
    }

    let deleted = ProductRepository::new(state.pool())
        .bulk_soft_delete(&payload.ids)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Build the upsert row for one Printful sync variant. Pulled out of the
/// sync handler so the shape is unit-testable.
pub(crate) fn import_from_variant(
    product_name: &str,
    thumbnail: Option<&str>,
    variant: &crate::services::printful::SyncVariant,
    sync_product_id: i64,
) -> Option<PrintfulImport> {
    let price = variant.price()?;
    let name = if variant.name.is_empty() {
        product_name.to_string()
    } else {
        variant.name.clone()
    };
    let slug = Slug::generate(&name)?;
    let image_url = variant
        .product
        .as_ref()
        .and_then(|p| p.image.clone())
        .or_else(|| thumbnail.map(ToOwned::to_owned));

    Some(PrintfulImport {
        name,
        slug,
        price,
        image_url,
        sync_product_id,
        sync_variant_id: variant.id,
        sku: variant.sku.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::printful::SyncVariant;

    fn variant(json: serde_json::Value) -> SyncVariant {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_import_from_variant_maps_fields() {
        let v = variant(serde_json::json!({
            "id": 4242,
            "name": "Moon Phase Mug / 11oz",
            "retail_price": "18.50",
            "sku": "MPM-11",
            "product": { "image": "https://cdn.example.com/mug.png" }
        }));

        let import = import_from_variant("Moon Phase Mug", None, &v, 77).unwrap();
        assert_eq!(import.slug.as_str(), "moon-phase-mug-11oz");
        assert_eq!(import.sync_variant_id, 4242);
        assert_eq!(import.sync_product_id, 77);
        assert_eq!(import.image_url.as_deref(), Some("https://cdn.example.com/mug.png"));
    }

    #[test]
    fn test_import_from_variant_unparseable_price_is_skipped() {
        let v = variant(serde_json::json!({
            "id": 1,
            "name": "Broken",
            "retail_price": "call us"
        }));
        assert!(import_from_variant("Broken", None, &v, 1).is_none());
    }

    #[test]
    fn test_import_from_variant_falls_back_to_thumbnail() {
        let v = variant(serde_json::json!({
            "id": 2,
            "name": "Plain Tee",
            "retail_price": "25.00"
        }));
        let import =
            import_from_variant("Plain Tee", Some("https://cdn.example.com/tee.png"), &v, 9)
                .unwrap();
        assert_eq!(import.image_url.as_deref(), Some("https://cdn.example.com/tee.png"));
    }
}
