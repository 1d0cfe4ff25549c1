//! Blog post repository.

use hearthglow_core::{PostId, Slug, UserId};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::RepositoryError;
use crate::models::BlogPost;

/// Filters for public and admin post listings.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Public listings see published posts only.
    pub published_only: bool,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Fields accepted when creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub slug: Option<Slug>,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub read_time: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// Fields accepted when updating a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<Slug>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub read_time: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// Repository for blog post database operations.
pub struct PostRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List posts matching the filter. Published posts order by publish
    /// date, drafts by creation date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &PostFilter) -> Result<Vec<BlogPost>, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM blog_posts WHERE TRUE");

        if filter.published_only {
            qb.push(" AND is_published = TRUE");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if let Some(tag) = &filter.tag {
            qb.push(" AND ").push_bind(tag).push(" = ANY(tags)");
        }

        qb.push(" ORDER BY COALESCE(published_at, created_at) DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }

        let posts = qb.build_query_as::<BlogPost>().fetch_all(self.pool).await?;
        Ok(posts)
    }

    /// Get a published post by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such post exists.
    pub async fn get_published_by_slug(&self, slug: &Slug) -> Result<BlogPost, RepositoryError> {
        sqlx::query_as::<_, BlogPost>(
            "SELECT * FROM blog_posts WHERE slug = $1 AND is_published = TRUE",
        )
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::for_entity(e, "Post"))
    }

    /// Get any post by id, drafts included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such post exists.
    pub async fn get_by_id(&self, id: PostId) -> Result<BlogPost, RepositoryError> {
        sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::for_entity(e, "Post"))
    }

    /// Create a post. `published_at` is stamped when the post is created
    /// already published.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    pub async fn create(
        &self,
        new: &NewPost,
        author_id: UserId,
    ) -> Result<BlogPost, RepositoryError> {
        let slug = match &new.slug {
            Some(slug) => slug.clone(),
            None => Slug::generate(&new.title).ok_or_else(|| {
                RepositoryError::Conflict("post title yields an empty slug".to_owned())
            })?,
        };

        sqlx::query_as::<_, BlogPost>(
            "INSERT INTO blog_posts \
             (title, slug, content, excerpt, category, featured_image, read_time, tags, \
              is_published, published_at, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
                     CASE WHEN $9 THEN NOW() END, $10) \
             RETURNING *",
        )
        .bind(&new.title)
        .bind(&slug)
        .bind(&new.content)
        .bind(&new.excerpt)
        .bind(&new.category)
        .bind(&new.featured_image)
        .bind(new.read_time)
        .bind(&new.tags)
        .bind(new.is_published)
        .bind(author_id)
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

    /// Apply a partial update. `published_at` is stamped on the first
    /// unpublished -> published transition and never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such post exists.
    pub async fn update(&self, id: PostId, patch: &PostPatch) -> Result<BlogPost, RepositoryError> {
        sqlx::query_as::<_, BlogPost>(
            "UPDATE blog_posts SET \
             title = COALESCE($2, title), \
             slug = COALESCE($3, slug), \
             content = COALESCE($4, content), \
             excerpt = COALESCE($5, excerpt), \
             category = COALESCE($6, category), \
             featured_image = COALESCE($7, featured_image), \
             read_time = COALESCE($8, read_time), \
             tags = COALESCE($9, tags), \
             is_published = COALESCE($10, is_published), \
             published_at = CASE \
               WHEN COALESCE($10, is_published) AND published_at IS NULL THEN NOW() \
               ELSE published_at END, \
             updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.slug)
        .bind(&patch.content)
        .bind(&patch.excerpt)
        .bind(&patch.category)
        .bind(&patch.featured_image)
        .bind(patch.read_time)
        .bind(&patch.tags)
        .bind(patch.is_published)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if RepositoryError::is_unique_violation(&e) {
                RepositoryError::Conflict("slug already exists".to_owned())
            } else {
                RepositoryError::for_entity(e, "Post")
            }
        })
    }

    /// Delete a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such post exists.
    pub async fn delete(&self, id: PostId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Post"));
        }
        Ok(())
    }

    /// Total and published post counts. Used by the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<(i64, i64), RepositoryError> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_published = TRUE) FROM blog_posts",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// The author id of a post, for ownership checks on edits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such post exists.
    pub async fn author_of(&self, id: PostId) -> Result<Option<UserId>, RepositoryError> {
        let row: Option<(Option<UserId>,)> =
            sqlx::query_as("SELECT author_id FROM blog_posts WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(|(author,)| author)
            .ok_or(RepositoryError::NotFound("Post"))
    }
}
