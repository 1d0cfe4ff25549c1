//! Category repository.

use hearthglow_core::{CategoryId, Slug};
use serde::Deserialize;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Category;

/// Fields accepted when creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<Slug>,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
}

/// Fields accepted when updating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
                .fetch_all(self.pool)
                .await?;
        Ok(categories)
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists.
    pub async fn get_by_slug(&self, slug: &Slug) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::for_entity(e, "Category"))
    }

    /// Resolve a category id from its slug, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_for_slug(&self, slug: &Slug) -> Result<Option<CategoryId>, RepositoryError> {
        let row: Option<(CategoryId,)> =
            sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    pub async fn create(&self, new: &NewCategory) -> Result<Category, RepositoryError> {
        let slug = match &new.slug {
            Some(slug) => slug.clone(),
            None => Slug::generate(&new.name).ok_or_else(|| {
                RepositoryError::Conflict("category name yields an empty slug".to_owned())
            })?,
        };

        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug, description, icon) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new.name)
        .bind(&slug)
        .bind(&new.description)
        .bind(&new.icon)
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

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists.
    pub async fn update(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET \
             name = COALESCE($2, name), \
             slug = COALESCE($3, slug), \
             description = COALESCE($4, description), \
             icon = COALESCE($5, icon), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.slug)
        .bind(&patch.description)
        .bind(&patch.icon)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if RepositoryError::is_unique_violation(&e) {
                RepositoryError::Conflict("slug already exists".to_owned())
            } else {
                RepositoryError::for_entity(e, "Category")
            }
        })
    }

    /// Delete a category, detaching any products that referenced it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Category"));
        }

        tx.commit().await?;
        Ok(())
    }
}
