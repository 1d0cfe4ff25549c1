use chrono::{DateTime, Utc};
use hearthglow_core::{PostId, Slug, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// An editorial post row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BlogPost {
    pub id: PostId,
    pub slug: Slug,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub read_time: Option<i32>,
    pub tags: Vec<String>,
    pub is_published: bool,
    /// Stamped on the first publish and never overwritten after that.
    pub published_at: Option<DateTime<Utc>>,
    pub author_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
