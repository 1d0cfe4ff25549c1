//! Marketing segments.
//!
//! A segment is a named, fixed predicate over user rows. The predicates
//! are static SQL fragments paired 1:1 with enum variants; nothing
//! user-supplied ever reaches the WHERE clause.

use sqlx::PgPool;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::User;

/// Error returned when parsing a segment name.
#[derive(Debug, Error)]
#[error("unknown segment: {0}")]
pub struct UnknownSegment(pub String);

/// A marketing segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Beginner-level users interested in tarot.
    BeginnerTarotBuyers,
    /// Intermediate or advanced users interested in crystals.
    CrystalEnthusiasts,
    /// Opened an email in the last 30 days.
    EmailEngaged,
    /// Abandoned a cart at least twice.
    CartAbandoners,
    /// Lifetime value over $100.
    HighLifetimeValue,
    /// Opted in to email marketing.
    EmailOptedIn,
    /// Opted in to SMS marketing.
    SmsOptedIn,
    /// Tradition tag for hoodoo or folk magic.
    HoodooInterest,
    /// Signed up in the last 7 days.
    NewUsers,
}

impl Segment {
    /// Every segment, in display order.
    pub const ALL: &'static [Self] = &[
        Self::BeginnerTarotBuyers,
        Self::CrystalEnthusiasts,
        Self::EmailEngaged,
        Self::CartAbandoners,
        Self::HighLifetimeValue,
        Self::EmailOptedIn,
        Self::SmsOptedIn,
        Self::HoodooInterest,
        Self::NewUsers,
    ];

    /// Stable identifier used in URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeginnerTarotBuyers => "beginner-tarot-buyers",
            Self::CrystalEnthusiasts => "crystal-enthusiasts",
            Self::EmailEngaged => "email-engaged",
            Self::CartAbandoners => "cart-abandoners",
            Self::HighLifetimeValue => "high-lifetime-value",
            Self::EmailOptedIn => "email-opted-in",
            Self::SmsOptedIn => "sms-opted-in",
            Self::HoodooInterest => "hoodoo-interest",
            Self::NewUsers => "new-users",
        }
    }

    /// Human-readable description for the admin UI.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BeginnerTarotBuyers => "Users interested in tarot with beginner experience level",
            Self::CrystalEnthusiasts => "Intermediate/advanced users interested in crystals",
            Self::EmailEngaged => "Opened an email in the last 30 days",
            Self::CartAbandoners => "Abandoned a cart two or more times",
            Self::HighLifetimeValue => "Lifetime value over $100",
            Self::EmailOptedIn => "Opted in to email marketing",
            Self::SmsOptedIn => "Opted in to SMS marketing",
            Self::HoodooInterest => "Users interested in Hoodoo or folk magic traditions",
            Self::NewUsers => "Signed up in the last 7 days",
        }
    }

    /// The predicate over the `users` table. Static SQL only.
    #[must_use]
    pub const fn predicate(self) -> &'static str {
        match self {
            Self::BeginnerTarotBuyers => {
                "'interest:tarot' = ANY(tags) AND 'level:beginner' = ANY(tags)"
            }
            Self::CrystalEnthusiasts => {
                "'interest:crystals' = ANY(tags) \
                 AND ('level:intermediate' = ANY(tags) OR 'level:advanced' = ANY(tags))"
            }
            Self::EmailEngaged => "email_last_opened > NOW() - INTERVAL '30 days'",
            Self::CartAbandoners => "cart_abandoned_count >= 2",
            Self::HighLifetimeValue => "lifetime_value > 100",
            Self::EmailOptedIn => "email_opt_in = TRUE",
            Self::SmsOptedIn => "sms_opt_in = TRUE",
            Self::HoodooInterest => {
                "('tradition:hoodoo' = ANY(tags) OR 'tradition:folk-magic' = ANY(tags))"
            }
            Self::NewUsers => "created_at > NOW() - INTERVAL '7 days'",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Segment {
    type Err = UnknownSegment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|segment| segment.as_str() == s)
            .ok_or_else(|| UnknownSegment(s.to_owned()))
    }
}

/// Runs segment queries against the user table.
pub struct SegmentService<'a> {
    pool: &'a PgPool,
}

impl<'a> SegmentService<'a> {
    /// Create a new segment service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Member count for one segment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, segment: Segment) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {}", segment.predicate());
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Members of one segment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn members(&self, segment: Segment) -> Result<Vec<User>, RepositoryError> {
        let sql = format!(
            "SELECT * FROM users WHERE {} ORDER BY created_at DESC",
            segment.predicate()
        );
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(self.pool).await?;
        Ok(users)
    }
}

/// Render segment members as a CSV of email addresses.
#[must_use]
pub fn members_csv(users: &[User]) -> String {
    let mut out = String::from("Email\n");
    for user in users {
        out.push_str(user.email.as_str());
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_name_roundtrip() {
        for segment in Segment::ALL {
            let parsed: Segment = segment.as_str().parse().unwrap();
            assert_eq!(parsed, *segment);
        }
        assert!("vip-whales".parse::<Segment>().is_err());
    }

    #[test]
    fn test_all_covers_nine_segments() {
        assert_eq!(Segment::ALL.len(), 9);
    }

    #[test]
    fn test_members_csv_header_only_when_empty() {
        assert_eq!(members_csv(&[]), "Email\n");
    }

    #[test]
    fn test_tag_predicates_match_marketing_definitions() {
        let beginner = Segment::BeginnerTarotBuyers.predicate();
        assert!(beginner.contains("'interest:tarot' = ANY(tags)"));
        assert!(beginner.contains("'level:beginner' = ANY(tags)"));
        assert!(!beginner.contains("last_purchase"));

        let crystals = Segment::CrystalEnthusiasts.predicate();
        assert!(crystals.contains("'interest:crystals' = ANY(tags)"));
        assert!(crystals.contains("'level:intermediate' = ANY(tags)"));
        assert!(crystals.contains("'level:advanced' = ANY(tags)"));

        let hoodoo = Segment::HoodooInterest.predicate();
        assert!(hoodoo.contains("'tradition:hoodoo' = ANY(tags)"));
        assert!(hoodoo.contains("'tradition:folk-magic' = ANY(tags)"));
        assert!(!hoodoo.contains("interest:hoodoo"));
    }
}
