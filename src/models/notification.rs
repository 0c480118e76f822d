//! Notification model.

use serde::{Deserialize, Serialize};

/// The social event a notification reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    Login,
    Follow,
    RecipeAdded,
    RecipeLiked,
    RecipeSaved,
    ReviewAdded,
    NewFollower,
    Achievement,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Welcome => "welcome",
            NotificationKind::Login => "login",
            NotificationKind::Follow => "follow",
            NotificationKind::RecipeAdded => "recipe_added",
            NotificationKind::RecipeLiked => "recipe_liked",
            NotificationKind::RecipeSaved => "recipe_saved",
            NotificationKind::ReviewAdded => "review_added",
            NotificationKind::NewFollower => "new_follower",
            NotificationKind::Achievement => "achievement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "welcome" => Some(NotificationKind::Welcome),
            "login" => Some(NotificationKind::Login),
            "follow" => Some(NotificationKind::Follow),
            "recipe_added" => Some(NotificationKind::RecipeAdded),
            "recipe_liked" => Some(NotificationKind::RecipeLiked),
            "recipe_saved" => Some(NotificationKind::RecipeSaved),
            "review_added" => Some(NotificationKind::ReviewAdded),
            "new_follower" => Some(NotificationKind::NewFollower),
            "achievement" => Some(NotificationKind::Achievement),
            _ => None,
        }
    }

    /// Whether repeats inside the dedupe window are suppressed by default.
    ///
    /// Welcome and login notifications fire on every registration and login.
    pub fn dedupes(&self) -> bool {
        !matches!(self, NotificationKind::Welcome | NotificationKind::Login)
    }
}

/// Sender reference carried by a notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSender {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_picture: String,
}

/// Recipe reference carried by a notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecipe {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<NotificationSender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<NotificationRecipe>,
}
