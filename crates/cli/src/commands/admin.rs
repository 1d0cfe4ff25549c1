//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! hearthglow admin create -e admin@example.com -n "Admin Name" -p <password>
//! ```
//!
//! # Environment Variables
//!
//! - `HEARTHGLOW_DATABASE_URL` - `PostgreSQL` connection string

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher};
use hearthglow_core::{Email, Role};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password too short.
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    /// Password hashing failure.
    #[error("Failed to hash password: {0}")]
    PasswordHash(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),
}

const MIN_PASSWORD_LENGTH: usize = 8;

/// Create a new admin user.
///
/// # Errors
///
/// Fails on an invalid email, a short password, an existing account, or
/// a database error.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    let pool = super::connect()
        .await
        .map_err(|_| AdminError::MissingEnvVar("HEARTHGLOW_DATABASE_URL"))?;

    info!("Creating admin user: {}", email.as_str());

    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(AdminError::UserExists(email.as_str().to_owned()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AdminError::PasswordHash(e.to_string()))?
        .to_string();

    let user_id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO users (email, password_hash, first_name, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(email.as_str())
    .bind(&password_hash)
    .bind(name)
    .bind(Role::Admin)
    .fetch_one(&pool)
    .await?;

    info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user_id,
        email.as_str()
    );

    Ok(user_id)
}
