//! Database access layer.
//!
//! Each submodule exposes a repository struct borrowing the shared `PgPool`.
//! Handlers construct repositories per-request; they are cheap wrappers
//! around the pool reference.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod categories;
pub mod orders;
pub mod posts;
pub mod products;
pub mod users;

pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use posts::PostRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Row lookup returned nothing. Carries the entity name for the 404 body.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// Anything else from the driver.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Map `RowNotFound` to a typed `NotFound` for the given entity.
    pub fn for_entity(err: sqlx::Error, entity: &'static str) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound(entity),
            other => Self::Database(other),
        }
    }

    /// True when the underlying error is a Postgres unique violation.
    #[must_use]
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
        )
    }
}

/// Create a connection pool against the given database URL.
///
/// # Errors
///
/// Returns `sqlx::Error` if the pool cannot be established.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
