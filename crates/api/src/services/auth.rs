//! Bearer tokens and password hashing.
//!
//! Tokens are HS256 JWTs carrying the user id and role. The role claim is
//! a hint for clients; authorization always re-checks the database row, so
//! a stale claim cannot keep a demoted admin in the back office.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use hearthglow_core::{Role, UserId};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token lifetime.
const TOKEN_TTL_DAYS: i64 = 7;

/// Errors from token issuance and verification.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hash error: {0}")]
    PasswordHash(String),

    #[error("token claims are malformed: {0}")]
    MalformedClaims(String),
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    /// Role at issuance time.
    pub role: String,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
}

/// A verified token's identity.
#[derive(Debug, Clone, Copy)]
pub struct TokenIdentity {
    pub user_id: UserId,
    pub role: Role,
}

/// Signs and verifies bearer tokens with a single HS256 key.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    /// Create a signer from the configured secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if encoding fails.
    pub fn issue(&self, user_id: UserId, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.as_i32(),
            role: role.as_str().to_string(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
            iat: now.timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token and extract its identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for an invalid or expired token, and
    /// `AuthError::MalformedClaims` when the role claim does not parse.
    pub fn verify(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())?;

        let role: Role = data
            .claims
            .role
            .parse()
            .map_err(|e: hearthglow_core::RoleError| AuthError::MalformedClaims(e.to_string()))?;

        Ok(TokenIdentity {
            user_id: UserId::new(data.claims.sub),
            role,
        })
    }
}

/// Hash a password with Argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(&SecretString::from(
            "kQ9#mZ2!vX7@bN4$pL8&wR3*tY6^hC1%",
        ))
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let signer = signer();
        let token = signer.issue(UserId::new(42), Role::Contributor).unwrap();
        let identity = signer.verify(&token).unwrap();

        assert_eq!(identity.user_id, UserId::new(42));
        assert_eq!(identity.role, Role::Contributor);
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let signer = signer();
        let mut token = signer.issue(UserId::new(1), Role::Customer).unwrap();
        token.push('x');
        assert!(signer.verify(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_foreign_key() {
        let token = signer().issue(UserId::new(1), Role::Admin).unwrap();
        let other = TokenSigner::new(&SecretString::from(
            "different-Gz5$qW8!eR2@uT6#yI9&oP3*aS7",
        ));
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("moonlit-orchard-99").unwrap();
        assert!(verify_password("moonlit-orchard-99", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
