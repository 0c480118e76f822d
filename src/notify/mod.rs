//! Notification dispatch.
//!
//! Notifications are best-effort. [`NotificationDispatcher::dispatch`] never
//! returns an error: suppressed duplicates and store failures both come back
//! as `None`, so the social operation that triggered the event is never
//! aborted by it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::db::{format_timestamp, NewNotification, Repository};
use crate::models::{Notification, NotificationKind};

/// Default window inside which identical notifications are suppressed.
pub const DEFAULT_DEDUPE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// A social event to report to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    record: NewNotification,
    dedupe: bool,
}

impl NotificationEvent {
    fn new(recipient_id: &str, kind: NotificationKind, title: &str, message: String) -> Self {
        Self {
            record: NewNotification {
                recipient_id: recipient_id.to_string(),
                sender_id: None,
                kind,
                title: title.to_string(),
                message,
                recipe_id: None,
            },
            dedupe: kind.dedupes(),
        }
    }

    fn from_sender(mut self, sender_id: &str) -> Self {
        self.record.sender_id = Some(sender_id.to_string());
        self
    }

    fn about_recipe(mut self, recipe_id: &str) -> Self {
        self.record.recipe_id = Some(recipe_id.to_string());
        self
    }

    /// Override the per-kind de-duplication default.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn welcome(recipient_id: &str) -> Self {
        Self::new(
            recipient_id,
            NotificationKind::Welcome,
            "Welcome to Recipe Hub!",
            "We're excited to have you here! Start exploring delicious recipes and share your \
             culinary creations with the community."
                .to_string(),
        )
    }

    pub fn login(recipient_id: &str) -> Self {
        Self::new(
            recipient_id,
            NotificationKind::Login,
            "Welcome back, Chef!",
            "Good to see you again! Ready to cook something amazing today?".to_string(),
        )
    }

    pub fn follow(recipient_id: &str, follower_id: &str, follower_username: &str) -> Self {
        Self::new(
            recipient_id,
            NotificationKind::Follow,
            "New Follower!",
            format!("{} started following you", follower_username),
        )
        .from_sender(follower_id)
    }

    pub fn recipe_added(author_id: &str, recipe_id: &str, recipe_title: &str) -> Self {
        Self::new(
            author_id,
            NotificationKind::RecipeAdded,
            "Recipe Published!",
            format!(
                "Your recipe \"{}\" has been published and is now available for others to \
                 discover and enjoy!",
                recipe_title
            ),
        )
        .about_recipe(recipe_id)
    }

    pub fn recipe_liked(
        author_id: &str,
        liker_id: &str,
        liker_username: &str,
        recipe_id: &str,
        recipe_title: &str,
    ) -> Self {
        Self::new(
            author_id,
            NotificationKind::RecipeLiked,
            "Your Recipe Got a Like!",
            format!("{} liked your recipe \"{}\"", liker_username, recipe_title),
        )
        .from_sender(liker_id)
        .about_recipe(recipe_id)
    }

    pub fn recipe_saved(
        author_id: &str,
        saver_id: &str,
        saver_username: &str,
        recipe_id: &str,
        recipe_title: &str,
    ) -> Self {
        Self::new(
            author_id,
            NotificationKind::RecipeSaved,
            "Recipe Saved!",
            format!(
                "{} saved your recipe \"{}\" to their collection",
                saver_username, recipe_title
            ),
        )
        .from_sender(saver_id)
        .about_recipe(recipe_id)
    }

    pub fn review_added(
        author_id: &str,
        reviewer_id: &str,
        reviewer_username: &str,
        recipe_id: &str,
        recipe_title: &str,
    ) -> Self {
        Self::new(
            author_id,
            NotificationKind::ReviewAdded,
            "New Review!",
            format!(
                "{} left a review on your recipe \"{}\"",
                reviewer_username, recipe_title
            ),
        )
        .from_sender(reviewer_id)
        .about_recipe(recipe_id)
    }

    pub fn achievement(recipient_id: &str, achievement: &str) -> Self {
        Self::new(
            recipient_id,
            NotificationKind::Achievement,
            "Achievement Unlocked!",
            achievement.to_string(),
        )
    }

    pub fn kind(&self) -> NotificationKind {
        self.record.kind
    }

    pub fn recipient_id(&self) -> &str {
        &self.record.recipient_id
    }
}

/// Writes notifications, suppressing near-duplicates.
#[derive(Clone)]
pub struct NotificationDispatcher {
    repo: Arc<Repository>,
    window: chrono::Duration,
}

impl NotificationDispatcher {
    pub fn new(repo: Arc<Repository>, window: Duration) -> Self {
        let window = chrono::Duration::from_std(window)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_DEDUPE_WINDOW.as_secs() as i64));
        Self { repo, window }
    }

    /// Dispatch an event now. `None` means suppressed or failed, never an error.
    pub async fn dispatch(&self, event: NotificationEvent) -> Option<Notification> {
        self.dispatch_at(event, Utc::now()).await
    }

    /// Dispatch an event as if the current time were `now`.
    pub async fn dispatch_at(
        &self,
        event: NotificationEvent,
        now: DateTime<Utc>,
    ) -> Option<Notification> {
        let kind = event.kind().as_str();
        let recipient_id = event.recipient_id();

        if event.dedupe {
            let since = format_timestamp(now - self.window);
            match self.repo.has_recent_duplicate(&event.record, &since).await {
                Ok(true) => {
                    tracing::debug!(recipient_id, kind, "Duplicate notification suppressed");
                    return None;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(recipient_id, kind, error = %e, "Notification dedupe check failed");
                    return None;
                }
            }
        }

        let created_at = format_timestamp(now);
        let inserted = match self.repo.insert_notification(&event.record, &created_at).await {
            Ok(notification) => notification,
            Err(first) => {
                tracing::warn!(recipient_id, kind, error = %first, "Notification insert failed, retrying");
                match self.repo.insert_notification(&event.record, &created_at).await {
                    Ok(notification) => notification,
                    Err(e) => {
                        tracing::error!(recipient_id, kind, error = %e, "Notification dropped");
                        return None;
                    }
                }
            }
        };

        tracing::info!(recipient_id, kind, notification_id = %inserted.id, "Notification created");

        // Populate sender and recipe summaries for the caller
        match self.repo.get_notification(&inserted.id).await {
            Ok(Some(populated)) => Some(populated),
            _ => Some(inserted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{make_recipe, make_user, temp_repo};

    async fn count_for(repo: &Repository, recipient_id: &str) -> i64 {
        repo.list_notifications(recipient_id, 0, 100).await.unwrap().1
    }

    #[tokio::test]
    async fn test_duplicates_inside_window_are_suppressed() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let fan = make_user(&repo, "fan").await;
        let recipe = make_recipe(&repo, &author, "Pancakes").await;
        let dispatcher = NotificationDispatcher::new(repo.clone(), DEFAULT_DEDUPE_WINDOW);

        let event = NotificationEvent::recipe_liked(
            author.id(),
            fan.id(),
            fan.username(),
            &recipe.id,
            &recipe.title,
        );
        let start = Utc::now();

        let first = dispatcher.dispatch_at(event.clone(), start).await;
        assert!(first.is_some());
        let second = dispatcher
            .dispatch_at(event.clone(), start + chrono::Duration::seconds(30))
            .await;
        assert!(second.is_none());
        assert_eq!(count_for(&repo, author.id()).await, 1);

        let third = dispatcher
            .dispatch_at(event, start + chrono::Duration::seconds(5 * 60 + 1))
            .await;
        assert!(third.is_some());
        assert_eq!(count_for(&repo, author.id()).await, 2);
    }

    #[tokio::test]
    async fn test_dispatch_populates_sender_and_recipe() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let fan = make_user(&repo, "fan").await;
        let recipe = make_recipe(&repo, &author, "Pancakes").await;
        let dispatcher = NotificationDispatcher::new(repo.clone(), DEFAULT_DEDUPE_WINDOW);

        let notification = dispatcher
            .dispatch(NotificationEvent::recipe_saved(
                author.id(),
                fan.id(),
                fan.username(),
                &recipe.id,
                &recipe.title,
            ))
            .await
            .unwrap();

        assert_eq!(notification.kind, NotificationKind::RecipeSaved);
        assert_eq!(notification.sender.unwrap().username, "fan");
        assert_eq!(notification.recipe.unwrap().title, "Pancakes");
        assert_eq!(
            notification.message,
            "fan saved your recipe \"Pancakes\" to their collection"
        );
    }

    #[tokio::test]
    async fn test_different_senders_are_not_duplicates() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let a = make_user(&repo, "alice").await;
        let b = make_user(&repo, "bob").await;
        let dispatcher = NotificationDispatcher::new(repo.clone(), DEFAULT_DEDUPE_WINDOW);

        assert!(dispatcher
            .dispatch(NotificationEvent::follow(author.id(), a.id(), a.username()))
            .await
            .is_some());
        assert!(dispatcher
            .dispatch(NotificationEvent::follow(author.id(), b.id(), b.username()))
            .await
            .is_some());
        assert_eq!(count_for(&repo, author.id()).await, 2);
    }

    #[tokio::test]
    async fn test_login_notifications_fire_every_time() {
        let (repo, _dir) = temp_repo().await;
        let user = make_user(&repo, "cook").await;
        let dispatcher = NotificationDispatcher::new(repo.clone(), DEFAULT_DEDUPE_WINDOW);

        for _ in 0..3 {
            assert!(dispatcher
                .dispatch(NotificationEvent::login(user.id()))
                .await
                .is_some());
        }
        assert_eq!(count_for(&repo, user.id()).await, 3);

        // Opting a kind into dedupe is honored
        let event = NotificationEvent::welcome(user.id()).with_dedupe(true);
        assert!(dispatcher.dispatch(event.clone()).await.is_some());
        assert!(dispatcher.dispatch(event).await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_returns_none() {
        let (repo, _dir) = temp_repo().await;
        let dispatcher = NotificationDispatcher::new(repo, DEFAULT_DEDUPE_WINDOW);

        // Unknown recipient violates the foreign key on both attempts
        let result = dispatcher
            .dispatch(NotificationEvent::achievement("nobody", "First recipe"))
            .await;
        assert!(result.is_none());
    }
}
