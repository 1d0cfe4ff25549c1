use chrono::{DateTime, NaiveDate, Utc};
use hearthglow_core::{Email, Role, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account row.
///
/// The password hash never serializes; everything else is safe to return to
/// the account owner or an admin.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,

    // Marketing profile
    pub email_opt_in: bool,
    pub sms_opt_in: bool,
    pub tracking_opt_in: bool,
    pub email_frequency: String,
    pub birthday: Option<NaiveDate>,
    pub location: Option<serde_json::Value>,
    pub experience_level: Option<String>,
    pub traditions: Vec<String>,
    pub interests: Vec<String>,
    pub favorite_product_types: Vec<String>,
    pub blog_subscription: bool,
    pub workshop_interest: bool,
    pub tags: Vec<String>,

    // Engagement counters
    pub lifetime_value: Decimal,
    pub cart_abandoned_count: i32,
    pub last_purchase: Option<DateTime<Utc>>,
    pub email_last_opened: Option<DateTime<Utc>>,
    pub email_clicked_offers: i32,
    pub profile_completion_step: i32,
    pub last_login: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Incoming marketing preference update. Every field is optional so a
/// client can submit one prompt step at a time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketingProfile {
    pub email_opt_in: Option<bool>,
    pub sms_opt_in: Option<bool>,
    pub tracking_opt_in: Option<bool>,
    pub email_frequency: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub location: Option<serde_json::Value>,
    pub experience_level: Option<String>,
    pub traditions: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub favorite_product_types: Option<Vec<String>>,
    pub blog_subscription: Option<bool>,
    pub workshop_interest: Option<bool>,
}

impl MarketingProfile {
    /// Segmentation tags implied by the submitted fields.
    ///
    /// Only fields present in this update contribute; tags derived from
    /// earlier submissions stay on the account.
    #[must_use]
    pub fn derived_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();

        if let Some(level) = &self.experience_level
            && let Some(slug) = hearthglow_core::Slug::generate(level)
        {
            tags.push(format!("level:{slug}"));
        }
        for tradition in self.traditions.iter().flatten() {
            if let Some(slug) = hearthglow_core::Slug::generate(tradition) {
                tags.push(format!("tradition:{slug}"));
            }
        }
        for interest in self.interests.iter().flatten() {
            if let Some(slug) = hearthglow_core::Slug::generate(interest) {
                tags.push(format!("interest:{slug}"));
            }
        }
        if self.email_opt_in == Some(true) {
            tags.push("channel:email_opt_in".to_string());
        }
        if self.sms_opt_in == Some(true) {
            tags.push("channel:sms_opt_in".to_string());
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_omits_password_hash() {
        let user = User {
            id: UserId::new(1),
            email: Email::parse("ana@example.com").expect("valid"),
            password_hash: "$argon2id$v=19$secret".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            role: Role::Customer,
            email_opt_in: true,
            sms_opt_in: false,
            tracking_opt_in: true,
            email_frequency: "weekly".to_string(),
            birthday: None,
            location: None,
            experience_level: None,
            traditions: vec![],
            interests: vec![],
            favorite_product_types: vec![],
            blog_subscription: false,
            workshop_interest: false,
            tags: vec!["channel:email_opt_in".to_string()],
            lifetime_value: Decimal::ZERO,
            cart_abandoned_count: 0,
            last_purchase: None,
            email_last_opened: None,
            email_clicked_offers: 0,
            profile_completion_step: 0,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).expect("serializes");
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("ana@example.com"));
    }

    #[test]
    fn test_derived_tags_full_profile() {
        let profile = MarketingProfile {
            email_opt_in: Some(true),
            sms_opt_in: Some(false),
            experience_level: Some("Beginner".to_string()),
            traditions: Some(vec!["Green Witchcraft".to_string()]),
            interests: Some(vec!["tarot".to_string(), "Crystals".to_string()]),
            ..Default::default()
        };

        let tags = profile.derived_tags();
        assert!(tags.contains(&"level:beginner".to_string()));
        assert!(tags.contains(&"tradition:green-witchcraft".to_string()));
        assert!(tags.contains(&"interest:tarot".to_string()));
        assert!(tags.contains(&"interest:crystals".to_string()));
        assert!(tags.contains(&"channel:email_opt_in".to_string()));
        // opted out of sms, so no sms channel tag
        assert!(!tags.iter().any(|t| t.contains("sms")));
    }

    #[test]
    fn test_derived_tags_empty_update() {
        assert!(MarketingProfile::default().derived_tags().is_empty());
    }
}
