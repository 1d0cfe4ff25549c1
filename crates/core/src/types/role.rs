//! Account roles and the permission table.
//!
//! Roles form a total order by privilege level; permissions are a closed
//! enum with a static role table, so an unknown permission key cannot exist
//! at runtime - route code names a `Permission` variant and the compiler
//! checks it.

use serde::{Deserialize, Serialize};

/// Error returned when parsing a [`Role`] from a string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("invalid role: {0}")]
pub struct RoleError(pub String);

/// Account role.
///
/// `Contributor` and `Affiliate` share a privilege level; only `Admin`
/// outranks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Contributor,
    Affiliate,
    Admin,
}

impl Role {
    /// Privilege level for minimum-role checks (higher = more privileged).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Customer => 1,
            Self::Contributor | Self::Affiliate => 2,
            Self::Admin => 3,
        }
    }

    /// Whether this role meets or exceeds the given minimum role.
    #[must_use]
    pub const fn at_least(self, minimum: Self) -> bool {
        self.level() >= minimum.level()
    }

    /// Whether this role holds the given permission.
    #[must_use]
    pub fn has_permission(self, permission: Permission) -> bool {
        permission.allowed_roles().contains(&self)
    }

    /// All permissions held by this role.
    #[must_use]
    pub fn permissions(self) -> Vec<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .filter(|p| self.has_permission(*p))
            .collect()
    }

    /// Stable string form, used for database storage and JWT claims.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Contributor => "contributor",
            Self::Affiliate => "affiliate",
            Self::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Customer
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "contributor" => Ok(Self::Contributor),
            "affiliate" => Ok(Self::Affiliate),
            "admin" => Ok(Self::Admin),
            other => Err(RoleError(other.to_owned())),
        }
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// A fine-grained permission, mapped statically to the roles holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    CreateProducts,
    EditProducts,
    DeleteProducts,
    CreateBlog,
    EditBlog,
    DeleteBlog,
    PublishBlog,
    ViewAllOrders,
    ManageOrders,
    ViewUsers,
    EditUsers,
    ManageRoles,
    ViewAnalytics,
    ViewSegments,
    ExportSegments,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::CreateProducts,
        Self::EditProducts,
        Self::DeleteProducts,
        Self::CreateBlog,
        Self::EditBlog,
        Self::DeleteBlog,
        Self::PublishBlog,
        Self::ViewAllOrders,
        Self::ManageOrders,
        Self::ViewUsers,
        Self::EditUsers,
        Self::ManageRoles,
        Self::ViewAnalytics,
        Self::ViewSegments,
        Self::ExportSegments,
    ];

    /// The roles holding this permission.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::CreateProducts
            | Self::EditProducts
            | Self::DeleteProducts
            | Self::DeleteBlog
            | Self::PublishBlog
            | Self::ViewAllOrders
            | Self::ManageOrders
            | Self::ViewUsers
            | Self::EditUsers
            | Self::ManageRoles
            | Self::ViewSegments
            | Self::ExportSegments => &[Role::Admin],
            Self::CreateBlog | Self::EditBlog => &[Role::Contributor, Role::Admin],
            Self::ViewAnalytics => &[Role::Affiliate, Role::Admin],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_levels_are_totally_ordered() {
        assert!(Role::Customer.level() < Role::Contributor.level());
        assert_eq!(Role::Contributor.level(), Role::Affiliate.level());
        assert!(Role::Affiliate.level() < Role::Admin.level());
    }

    #[test]
    fn test_at_least() {
        assert!(Role::Admin.at_least(Role::Contributor));
        assert!(Role::Affiliate.at_least(Role::Contributor));
        assert!(!Role::Customer.at_least(Role::Contributor));
        assert!(Role::Customer.at_least(Role::Customer));
    }

    #[test]
    fn test_permission_table() {
        assert!(Role::Contributor.has_permission(Permission::CreateBlog));
        assert!(!Role::Contributor.has_permission(Permission::PublishBlog));
        assert!(Role::Affiliate.has_permission(Permission::ViewAnalytics));
        assert!(!Role::Customer.has_permission(Permission::CreateProducts));
        // Admin holds everything
        for p in Permission::ALL {
            assert!(Role::Admin.has_permission(*p), "admin missing {p:?}");
        }
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in [
            Role::Customer,
            Role::Contributor,
            Role::Affiliate,
            Role::Admin,
        ] {
            let parsed: Role = role.as_str().parse().expect("roundtrip");
            assert_eq!(parsed, role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_customer_permissions_empty() {
        assert!(Role::Customer.permissions().is_empty());
    }
}
