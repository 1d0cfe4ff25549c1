//! Authentication extractors and authorization checks.
//!
//! `RequireAuth` verifies the bearer token and loads the live user row, so
//! role checks always see the current role rather than the one baked into
//! the token. Checks are ordered: a missing or bad token is always 401,
//! an insufficient role is 403.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use hearthglow_core::{Permission, Role, UserId};

use crate::db::UserRepository;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    #[must_use]
    pub fn id(&self) -> UserId {
        self.0.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.0.role
    }

    /// Require a role from an explicit allow-list.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` if the user's role is not listed.
    pub fn require_any_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role()) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient role".to_string()))
        }
    }

    /// Require a specific permission.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` if the user's role lacks it.
    pub fn require_permission(&self, permission: Permission) -> Result<(), ApiError> {
        if self.role().has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    /// Require at least the given role level.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` if the user's role is below it.
    pub fn require_min_role(&self, minimum: Role) -> Result<(), ApiError> {
        if self.role().at_least(minimum) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient role".to_string()))
        }
    }

    /// Require that the user owns the resource, or holds a role from the
    /// allow-list.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` if neither condition holds.
    pub fn require_ownership_or_role(
        &self,
        owner: Option<UserId>,
        allowed: &[Role],
    ) -> Result<(), ApiError> {
        if owner == Some(self.id()) || allowed.contains(&self.role()) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You do not have access to this resource".to_string(),
            ))
        }
    }
}

/// Extractor that requires a valid bearer token.
pub struct RequireAuth(pub CurrentUser);

/// Extractor that attaches the user when a valid token is present, and
/// `None` otherwise. A present-but-invalid token is still a 401, so
/// clients learn their session expired instead of silently downgrading.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Pull the bearer token out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, ApiError> {
    let token = bearer_token(parts)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let identity = state
        .tokens()
        .verify(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let repo = UserRepository::new(state.pool());
    let user = repo.get_by_id(identity.user_id).await.map_err(|e| match e {
        crate::db::RepositoryError::NotFound(_) => {
            ApiError::Unauthorized("Account no longer exists".to_string())
        }
        other => other.into(),
    })?;

    Ok(CurrentUser(user))
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(Self(None));
        }
        let user = authenticate(parts, state).await?;
        Ok(Self(Some(user)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use hearthglow_core::Email;
    use rust_decimal::Decimal;

    use super::*;

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser(User {
            id: UserId::new(10),
            email: Email::parse("test@example.com").unwrap(),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            email_opt_in: false,
            sms_opt_in: false,
            tracking_opt_in: false,
            email_frequency: "weekly".to_string(),
            birthday: None,
            location: None,
            experience_level: None,
            traditions: vec![],
            interests: vec![],
            favorite_product_types: vec![],
            blog_subscription: false,
            workshop_interest: false,
            tags: vec![],
            lifetime_value: Decimal::ZERO,
            cart_abandoned_count: 0,
            last_purchase: None,
            email_last_opened: None,
            email_clicked_offers: 0,
            profile_completion_step: 0,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn test_require_any_role() {
        let contributor = user_with_role(Role::Contributor);
        assert!(contributor
            .require_any_role(&[Role::Contributor, Role::Admin])
            .is_ok());
        assert!(contributor.require_any_role(&[Role::Admin]).is_err());
    }

    #[test]
    fn test_require_permission() {
        let contributor = user_with_role(Role::Contributor);
        assert!(contributor.require_permission(Permission::CreateBlog).is_ok());
        assert!(contributor
            .require_permission(Permission::PublishBlog)
            .is_err());
    }

    #[test]
    fn test_require_min_role() {
        let affiliate = user_with_role(Role::Affiliate);
        assert!(affiliate.require_min_role(Role::Contributor).is_ok());
        assert!(affiliate.require_min_role(Role::Admin).is_err());
    }

    #[test]
    fn test_require_ownership_or_role() {
        let customer = user_with_role(Role::Customer);

        // Owns the resource
        assert!(customer
            .require_ownership_or_role(Some(UserId::new(10)), &[Role::Admin])
            .is_ok());
        // Someone else's resource, no qualifying role
        assert!(customer
            .require_ownership_or_role(Some(UserId::new(99)), &[Role::Admin])
            .is_err());
        // Admin sees everything
        let admin = user_with_role(Role::Admin);
        assert!(admin
            .require_ownership_or_role(Some(UserId::new(99)), &[Role::Admin])
            .is_ok());
        // Ownerless resource requires the role
        assert!(customer
            .require_ownership_or_role(None, &[Role::Admin])
            .is_err());
    }
}
