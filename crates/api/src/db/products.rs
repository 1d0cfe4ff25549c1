//! Product repository.

use hearthglow_core::{CategoryId, ProductId, Slug};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::RepositoryError;
use crate::models::{Product, ProductVariant};

/// Sortable product columns. Deserialized straight from the query
/// string, so anything outside this enum never reaches the ORDER BY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Name,
    Price,
    StockQuantity,
}

impl ProductSort {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Name => "name",
            Self::Price => "price",
            Self::StockQuantity => "stock_quantity",
        }
    }
}

/// Sort direction. Newest-first is the storefront default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters for product list queries.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub featured: Option<bool>,
    /// Admin listings set this to see soft-deleted items too.
    pub include_inactive: bool,
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
    pub sort: ProductSort,
    pub order: SortOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: Option<Slug>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    pub sku: Option<String>,
}

/// Fields accepted when updating a product. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub metadata: Option<serde_json::Value>,
    pub variants: Option<Vec<ProductVariant>>,
    pub sku: Option<String>,
}

impl ProductPatch {
    /// True when no field is set; the route rejects empty patches.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.compare_at_price.is_none()
            && self.stock_quantity.is_none()
            && self.category_id.is_none()
            && self.image_url.is_none()
            && self.images.is_none()
            && self.is_featured.is_none()
            && self.is_active.is_none()
            && self.metadata.is_none()
            && self.variants.is_none()
            && self.sku.is_none()
    }
}

/// A variant row pulled from Printful's sync catalog.
#[derive(Debug, Clone)]
pub struct PrintfulImport {
    pub name: String,
    pub slug: Slug,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub sync_product_id: i64,
    pub sync_variant_id: i64,
    pub sku: Option<String>,
}

const ALL_COLUMNS: &str = "id, name, slug, description, price, compare_at_price, stock_quantity, \
     category_id, image_url, images, is_featured, is_active, metadata, variants, \
     is_printful, printful_sync_product_id, printful_sync_variant_id, sku, \
     created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ALL_COLUMNS} FROM products WHERE TRUE"));

        if !filter.include_inactive {
            qb.push(" AND is_active = TRUE");
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(featured) = filter.featured {
            qb.push(" AND is_featured = ").push_bind(featured);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(format!(
            " ORDER BY {} {}",
            filter.sort.column(),
            filter.order.sql()
        ));
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }

        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {ALL_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::for_entity(e, "Product"))
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {ALL_COLUMNS} FROM products WHERE slug = $1 AND is_active = TRUE"
        ))
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::for_entity(e, "Product"))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let slug = match &new.slug {
            Some(slug) => slug.clone(),
            None => Slug::generate(&new.name).ok_or_else(|| {
                RepositoryError::Conflict("product name yields an empty slug".to_owned())
            })?,
        };
        let metadata = new.metadata.clone().unwrap_or_else(|| serde_json::json!({}));
        let variants = serde_json::to_value(&new.variants)
            .map_err(|e| RepositoryError::Conflict(format!("invalid variants: {e}")))?;

        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products \
             (name, slug, description, price, compare_at_price, stock_quantity, category_id, \
              image_url, images, is_featured, metadata, variants, sku) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ALL_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&slug)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.compare_at_price)
        .bind(new.stock_quantity)
        .bind(new.category_id)
        .bind(&new.image_url)
        .bind(&new.images)
        .bind(new.is_featured)
        .bind(&metadata)
        .bind(&variants)
        .bind(&new.sku)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if RepositoryError::is_unique_violation(&e) {
                RepositoryError::Conflict("slug already exists".to_owned())
            } else {
                RepositoryError::Database(e)
            }
        })
    }

    /// Apply a partial update. Absent fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists, or
    /// `RepositoryError::Conflict` on a slug collision.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let variants = patch
            .variants
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::Conflict(format!("invalid variants: {e}")))?;

        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET \
             name = COALESCE($2, name), \
             slug = COALESCE($3, slug), \
             description = COALESCE($4, description), \
             price = COALESCE($5, price), \
             compare_at_price = COALESCE($6, compare_at_price), \
             stock_quantity = COALESCE($7, stock_quantity), \
             category_id = COALESCE($8, category_id), \
             image_url = COALESCE($9, image_url), \
             images = COALESCE($10, images), \
             is_featured = COALESCE($11, is_featured), \
             is_active = COALESCE($12, is_active), \
             metadata = COALESCE($13, metadata), \
             variants = COALESCE($14, variants), \
             sku = COALESCE($15, sku), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ALL_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.slug)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(patch.compare_at_price)
        .bind(patch.stock_quantity)
        .bind(patch.category_id)
        .bind(&patch.image_url)
        .bind(&patch.images)
        .bind(patch.is_featured)
        .bind(patch.is_active)
        .bind(&patch.metadata)
        .bind(&variants)
        .bind(&patch.sku)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if RepositoryError::is_unique_violation(&e) {
                RepositoryError::Conflict("slug already exists".to_owned())
            } else {
                RepositoryError::for_entity(e, "Product")
            }
        })
    }

    /// Soft-delete a product. The row stays so order snapshots keep a
    /// referent; it just stops appearing in storefront listings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists.
    pub async fn soft_delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Product"));
        }
        Ok(())
    }

    /// Soft-delete a batch of products in one statement. Returns how many
    /// rows changed; unknown ids are skipped, not errors.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bulk_soft_delete(&self, ids: &[ProductId]) -> Result<u64, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(&raw_ids)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Apply the same patch to a batch of products. Returns how many rows
    /// changed. Stock quantities are written as-is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bulk_update(
        &self,
        ids: &[ProductId],
        patch: &ProductPatch,
    ) -> Result<u64, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let result = sqlx::query(
            "UPDATE products SET \
             price = COALESCE($2, price), \
             stock_quantity = COALESCE($3, stock_quantity), \
             is_featured = COALESCE($4, is_featured), \
             is_active = COALESCE($5, is_active), \
             category_id = COALESCE($6, category_id), \
             updated_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(&raw_ids)
        .bind(patch.price)
        .bind(patch.stock_quantity)
        .bind(patch.is_featured)
        .bind(patch.is_active)
        .bind(patch.category_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Upsert a Printful sync variant as a local product, keyed on the
    /// sync variant id. Printful manages stock, so local stock is pinned
    /// high enough never to block checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_printful(&self, import: &PrintfulImport) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products \
             (name, slug, price, image_url, stock_quantity, is_printful, \
              printful_sync_product_id, printful_sync_variant_id, sku) \
             VALUES ($1, $2, $3, $4, 999, TRUE, $5, $6, $7) \
             ON CONFLICT (printful_sync_variant_id) WHERE printful_sync_variant_id IS NOT NULL \
             DO UPDATE SET \
               name = EXCLUDED.name, \
               price = EXCLUDED.price, \
               image_url = EXCLUDED.image_url, \
               sku = EXCLUDED.sku, \
               updated_at = NOW() \
             RETURNING {ALL_COLUMNS}"
        ))
        .bind(&import.name)
        .bind(&import.slug)
        .bind(import.price)
        .bind(&import.image_url)
        .bind(import.sync_product_id)
        .bind(import.sync_variant_id)
        .bind(&import.sku)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::Database)
    }

    /// Total and active product counts. Used by the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<(i64, i64), RepositoryError> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active = TRUE) FROM products",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// Count active products at or below a stock threshold, ignoring
    /// Printful items whose stock is managed upstream.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_low_stock(&self, threshold: i32) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM products \
             WHERE is_active = TRUE AND is_printful = FALSE AND stock_quantity <= $1",
        )
        .bind(threshold)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_params_deserialize_from_camel_case() {
        let sort: ProductSort = serde_json::from_str("\"stockQuantity\"").unwrap();
        assert_eq!(sort, ProductSort::StockQuantity);
        let sort: ProductSort = serde_json::from_str("\"createdAt\"").unwrap();
        assert_eq!(sort, ProductSort::CreatedAt);
        assert!(serde_json::from_str::<ProductSort>("\"id; DROP TABLE\"").is_err());

        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
        assert!(serde_json::from_str::<SortOrder>("\"sideways\"").is_err());
    }

    #[test]
    fn test_sort_columns_are_whitelisted() {
        assert_eq!(ProductSort::CreatedAt.column(), "created_at");
        assert_eq!(ProductSort::Name.column(), "name");
        assert_eq!(ProductSort::Price.column(), "price");
        assert_eq!(ProductSort::StockQuantity.column(), "stock_quantity");
        assert_eq!(SortOrder::default().sql(), "DESC");
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let filter = ProductFilter::default();
        assert_eq!(filter.sort, ProductSort::CreatedAt);
        assert_eq!(filter.order, SortOrder::Desc);
    }
}
