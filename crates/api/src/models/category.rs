use chrono::{DateTime, Utc};
use hearthglow_core::{CategoryId, Slug};
use serde::Serialize;
use sqlx::FromRow;

/// A catalog category row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
