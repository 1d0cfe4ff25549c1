//! Database migration command.
//!
//! Migrations live alongside the API crate:
//!
//! ```text
//! crates/api/migrations/
//! ├── 20260301000001_create_users.sql
//! ├── 20260301000002_create_categories.sql
//! └── ...
//! ```
//!
//! The server never applies migrations on startup; this command is the
//! only migration path.

use tracing::info;

/// Run all pending database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    Ok(())
}
