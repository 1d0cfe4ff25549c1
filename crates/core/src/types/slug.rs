//! URL-safe slug type.
//!
//! Slugs identify products, categories, and blog posts in public URLs.
//! The accepted alphabet matches the validation the API applies to
//! client-supplied slugs: lowercase ASCII letters, digits, and hyphens.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum SlugError {
    /// The input string is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The input contains characters outside `[a-z0-9-]`.
    #[error("slug may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacters,
}

/// A URL-safe identifier: non-empty, `[a-z0-9-]+`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Parse a `Slug`, rejecting anything outside the slug alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or contains characters
    /// outside `[a-z0-9-]`.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Generate a slug from free-form text.
    ///
    /// Lowercases the input, collapses every run of non-alphanumeric
    /// characters to a single hyphen, and strips leading/trailing hyphens.
    /// Returns `None` when nothing slug-worthy remains (e.g. all
    /// punctuation).
    #[must_use]
    pub fn generate(text: &str) -> Option<Self> {
        let mut out = String::with_capacity(text.len());
        let mut pending_hyphen = false;

        for c in text.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }

        if out.is_empty() { None } else { Some(Self(out)) }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Slug::parse("tarot-starter-deck").is_ok());
        assert!(Slug::parse("mug-01").is_ok());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(Slug::parse(""), Err(SlugError::Empty)));
        assert!(matches!(
            Slug::parse("Has Spaces"),
            Err(SlugError::InvalidCharacters)
        ));
        assert!(matches!(
            Slug::parse("UPPER"),
            Err(SlugError::InvalidCharacters)
        ));
        assert!(matches!(
            Slug::parse("under_score"),
            Err(SlugError::InvalidCharacters)
        ));
    }

    #[test]
    fn test_generate() {
        assert_eq!(
            Slug::generate("Moon Phase Mug - White / 11oz").unwrap().as_str(),
            "moon-phase-mug-white-11oz"
        );
        assert_eq!(Slug::generate("  Hoodoo  ").unwrap().as_str(), "hoodoo");
        assert_eq!(Slug::generate("Folk Magic").unwrap().as_str(), "folk-magic");
    }

    #[test]
    fn test_generate_collapses_runs_and_trims() {
        assert_eq!(Slug::generate("--a!!b--").unwrap().as_str(), "a-b");
        assert!(Slug::generate("!!!").is_none());
        assert!(Slug::generate("").is_none());
    }
}
