//! User repository: accounts, marketing preferences, and engagement
//! tracking.

use hearthglow_core::{Email, Role, UserId, add_tags, remove_tags};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::RepositoryError;
use crate::models::{MarketingProfile, User};

/// Profile prompt steps beyond this are ignored; the client stops asking.
pub const MAX_PROFILE_STEP: i32 = 4;

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring match on email or name.
    pub search: Option<String>,
    pub role: Option<Role>,
    /// Exact match against the marketing tag array.
    pub tag: Option<String>,
    pub email_opt_in: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Store-wide user counts for the admin stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCounts {
    pub total: i64,
    pub customers: i64,
    pub email_opt_in: i64,
    pub sms_opt_in: i64,
    pub tracking_opt_in: i64,
    pub total_lifetime_value: Decimal,
}

/// An engagement event reported by the storefront client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackedEvent {
    CartAbandoned,
    Purchase {
        amount: Decimal,
        #[serde(default)]
        product_interest: Option<String>,
    },
    EmailOpened,
    EmailClicked,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an account with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if RepositoryError::is_unique_violation(&e) {
                RepositoryError::Conflict("email already registered".to_owned())
            } else {
                RepositoryError::Database(e)
            }
        })
    }

    /// Get a user by email, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::for_entity(e, "User"))
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Apply a marketing preference update.
    ///
    /// Present fields overwrite, absent fields keep their value. Tags
    /// implied by the update merge into the existing set, and the profile
    /// prompt step advances by one, capped at [`MAX_PROFILE_STEP`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn update_preferences(
        &self,
        id: UserId,
        profile: &MarketingProfile,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent prompt submissions merge tags instead
        // of clobbering each other.
        let row: Option<(Vec<String>, i32)> =
            sqlx::query_as("SELECT tags, profile_completion_step FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((tags, step)) = row else {
            return Err(RepositoryError::NotFound("User"));
        };

        let tags = add_tags(&tags, &profile.derived_tags());
        let step = (step + 1).min(MAX_PROFILE_STEP);

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET \
             email_opt_in = COALESCE($2, email_opt_in), \
             sms_opt_in = COALESCE($3, sms_opt_in), \
             tracking_opt_in = COALESCE($4, tracking_opt_in), \
             email_frequency = COALESCE($5, email_frequency), \
             birthday = COALESCE($6, birthday), \
             location = COALESCE($7, location), \
             experience_level = COALESCE($8, experience_level), \
             traditions = COALESCE($9, traditions), \
             interests = COALESCE($10, interests), \
             favorite_product_types = COALESCE($11, favorite_product_types), \
             blog_subscription = COALESCE($12, blog_subscription), \
             workshop_interest = COALESCE($13, workshop_interest), \
             tags = $14, \
             profile_completion_step = $15, \
             updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(profile.email_opt_in)
        .bind(profile.sms_opt_in)
        .bind(profile.tracking_opt_in)
        .bind(&profile.email_frequency)
        .bind(profile.birthday)
        .bind(&profile.location)
        .bind(&profile.experience_level)
        .bind(&profile.traditions)
        .bind(&profile.interests)
        .bind(&profile.favorite_product_types)
        .bind(profile.blog_subscription)
        .bind(profile.workshop_interest)
        .bind(&tags)
        .bind(step)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Add tags to a user's set. Already-present tags are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn add_tags(&self, id: UserId, additions: &[String]) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Vec<String>,)> =
            sqlx::query_as("SELECT tags FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((tags,)) = row else {
            return Err(RepositoryError::NotFound("User"));
        };

        let tags = add_tags(&tags, additions);
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET tags = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&tags)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Remove tags from a user's set. Absent tags are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn remove_tags(
        &self,
        id: UserId,
        removals: &[String],
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Vec<String>,)> =
            sqlx::query_as("SELECT tags FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((tags,)) = row else {
            return Err(RepositoryError::NotFound("User"));
        };

        let tags = remove_tags(&tags, removals);
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET tags = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&tags)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Record an engagement event against a user's counters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn track_event(
        &self,
        id: UserId,
        event: &TrackedEvent,
    ) -> Result<(), RepositoryError> {
        let result = match event {
            TrackedEvent::CartAbandoned => {
                sqlx::query(
                    "UPDATE users SET cart_abandoned_count = cart_abandoned_count + 1, \
                     updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .execute(self.pool)
                .await?
            }
            TrackedEvent::Purchase {
                amount,
                product_interest,
            } => {
                let result = sqlx::query(
                    "UPDATE users SET last_purchase = NOW(), \
                     lifetime_value = lifetime_value + $2, \
                     updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(amount)
                .execute(self.pool)
                .await?;

                if result.rows_affected() > 0
                    && let Some(interest) = product_interest
                    && let Some(slug) = hearthglow_core::Slug::generate(interest)
                {
                    self.add_tags(id, &[format!("interest:{slug}")]).await?;
                }
                result
            }
            TrackedEvent::EmailOpened => {
                sqlx::query(
                    "UPDATE users SET email_last_opened = NOW(), updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .execute(self.pool)
                .await?
            }
            TrackedEvent::EmailClicked => {
                sqlx::query(
                    "UPDATE users SET email_clicked_offers = email_clicked_offers + 1, \
                     updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .execute(self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("User"));
        }
        Ok(())
    }

    /// Append the shared WHERE clauses for the admin user listing, so
    /// the page query and its total count cannot drift apart.
    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
        if let Some(search) = &filter.search {
            let pattern = format!("%{search}%");
            qb.push(" AND (email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role);
        }
        if let Some(tag) = &filter.tag {
            qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
        }
        if let Some(email_opt_in) = filter.email_opt_in {
            qb.push(" AND email_opt_in = ").push_bind(email_opt_in);
        }
    }

    /// List users for the admin back-office, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users WHERE TRUE");
        Self::push_filters(&mut qb, filter);

        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }

        let users = qb.build_query_as::<User>().fetch_all(self.pool).await?;
        Ok(users)
    }

    /// Count users matching the listing filter, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_matching(&self, filter: &UserFilter) -> Result<i64, RepositoryError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        Self::push_filters(&mut qb, filter);

        let (count,): (i64,) = qb.build_query_as().fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user exists.
    pub async fn update_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::for_entity(e, "User"))
    }

    /// Store-wide user counts for the stats and dashboard endpoints.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<UserCounts, RepositoryError> {
        let (total, customers, email_opt_in, sms_opt_in, tracking_opt_in, total_lifetime_value): (
            i64,
            i64,
            i64,
            i64,
            i64,
            Decimal,
        ) = sqlx::query_as(
            "SELECT COUNT(*), \
             COUNT(*) FILTER (WHERE role = 'customer'), \
             COUNT(*) FILTER (WHERE email_opt_in = TRUE), \
             COUNT(*) FILTER (WHERE sms_opt_in = TRUE), \
             COUNT(*) FILTER (WHERE tracking_opt_in = TRUE), \
             COALESCE(SUM(lifetime_value), 0) \
             FROM users",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(UserCounts {
            total,
            customers,
            email_opt_in,
            sms_opt_in,
            tracking_opt_in,
            total_lifetime_value,
        })
    }

    /// User counts grouped by role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn role_counts(&self) -> Result<Vec<(Role, i64)>, RepositoryError> {
        let rows: Vec<(Role, i64)> =
            sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// User counts grouped by self-reported experience level. `None`
    /// groups users who never answered the profile prompt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn experience_level_counts(
        &self,
    ) -> Result<Vec<(Option<String>, i64)>, RepositoryError> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT experience_level, COUNT(*) FROM users GROUP BY experience_level",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
