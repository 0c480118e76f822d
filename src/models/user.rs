//! User model and profile request bodies.

use serde::{Deserialize, Serialize};

/// Links to a user's social media accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

/// An earned achievement badge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub earned_at: String,
}

/// Public profile fields of a user. Never carries secrets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    /// Hidden on author pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub profile_picture: String,
    pub cover_picture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooking_style: Option<String>,
    pub social_media: SocialMedia,
    pub interests: Vec<String>,
    pub specialties: Vec<String>,
    pub badges: Vec<Badge>,
    pub is_verified: bool,
    pub is_pro_chef: bool,
    pub member_since: String,
    pub last_active: String,
}

/// Denormalized counters persisted on the user row.
///
/// These are a cache. `stats::StatsEngine::recompute` is the authority and
/// overwrites them whenever it runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserCounters {
    pub recipes_count: i64,
    pub favorites_count: i64,
    pub reviews_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub total_likes: i64,
    pub total_views: i64,
}

/// A user as stored: profile plus persisted counters.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(flatten)]
    pub counters: UserCounters,
}

impl User {
    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn username(&self) -> &str {
        &self.profile.username
    }
}

/// Compact author/sender reference embedded in other records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_picture: String,
    pub followers_count: i64,
    pub recipes_count: i64,
}

/// Entry in the top chefs listing, sorted by the persisted counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChefEntry {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_picture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub recipes_count: i64,
    pub followers_count: i64,
    pub is_verified: bool,
    pub social_media: SocialMedia,
    pub created_at: String,
}

/// Request body for updating the caller's profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub cooking_style: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub specialties: Option<Vec<String>>,
    #[serde(default)]
    pub social_media: Option<SocialMedia>,
    #[serde(default)]
    pub is_pro_chef: Option<bool>,
}

/// Request body for awarding a badge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBadgeRequest {
    pub badge_name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Drop blank entries and surrounding whitespace from a list field.
pub fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
