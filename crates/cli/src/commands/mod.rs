//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::{ExposeSecret, SecretString};

/// Resolve the database URL from `HEARTHGLOW_DATABASE_URL` with a
/// fallback to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();
    std::env::var("HEARTHGLOW_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "HEARTHGLOW_DATABASE_URL not set")
}

/// Connect to the configured database.
pub async fn connect() -> Result<sqlx::PgPool, Box<dyn std::error::Error>> {
    let url = database_url()?;
    let pool = sqlx::PgPool::connect(url.expose_secret()).await?;
    Ok(pool)
}
