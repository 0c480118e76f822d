//! Social graph operations: follows, favorites, saves, reviews and the
//! recipe lifecycle.
//!
//! Every operation has the same shape: validate, check the target exists,
//! mutate through the repository (which keeps counters in step inside one
//! transaction), dispatch a notification on positive transitions, then
//! re-read fresh counts from the store. Mutation failures are reported;
//! notification failures never are.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::AuthUser;
use crate::db::{AccountCascade, CascadeReport, Repository};
use crate::errors::{codes, AppError};
use crate::models::{
    AddReviewRequest, Recipe, RecipeInput, RecipeReport, Review, UpdateRecipeRequest,
};
use crate::notify::{NotificationDispatcher, NotificationEvent};
use crate::search::SearchIndex;

/// Follow state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowOutcome {
    pub is_following: bool,
    /// Followers of the target user.
    pub followers_count: i64,
    /// Users the actor follows.
    pub following_count: i64,
}

/// Favorite state after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteOutcome {
    pub is_favorite: bool,
    /// Likes on the recipe.
    pub likes_count: i64,
    /// Recipes the actor has favorited.
    pub favorites_count: i64,
}

/// Saved state after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub is_saved: bool,
    /// Recipes the actor has saved.
    pub saved_count: i64,
}

/// Relationship and recipe lifecycle operations.
#[derive(Clone)]
pub struct SocialGraph {
    repo: Arc<Repository>,
    notifier: NotificationDispatcher,
    search: Arc<SearchIndex>,
}

impl SocialGraph {
    pub fn new(
        repo: Arc<Repository>,
        notifier: NotificationDispatcher,
        search: Arc<SearchIndex>,
    ) -> Self {
        Self {
            repo,
            notifier,
            search,
        }
    }

    async fn require_recipe(&self, recipe_id: &str) -> Result<Recipe, AppError> {
        self.repo
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| AppError::recipe_not_found(recipe_id))
    }

    async fn require_owned_recipe(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
        action: &str,
    ) -> Result<Recipe, AppError> {
        let recipe = self.require_recipe(recipe_id).await?;
        if recipe.author_id != actor.id {
            return Err(AppError::Forbidden(format!(
                "Not authorized to {} this recipe",
                action
            )));
        }
        Ok(recipe)
    }

    // ==================== FOLLOW ====================

    /// Follow the target if the actor does not follow them yet, otherwise unfollow.
    ///
    /// Only the follow transition notifies the target.
    pub async fn toggle_follow(
        &self,
        actor: &AuthUser,
        target_id: &str,
    ) -> Result<FollowOutcome, AppError> {
        if actor.id == target_id {
            return Err(AppError::invalid_state(
                codes::CANNOT_FOLLOW_SELF,
                "You cannot follow yourself",
            ));
        }
        if !self.repo.user_exists(target_id).await? {
            return Err(AppError::user_not_found(target_id));
        }

        let is_following = if self.repo.is_following(&actor.id, target_id).await? {
            self.repo.remove_follow(&actor.id, target_id).await?;
            tracing::info!(follower_id = %actor.id, followee_id = %target_id, "Unfollowed");
            false
        } else {
            // A racing request may have created the follow first; either way it now exists
            if self.repo.add_follow(&actor.id, target_id).await? {
                tracing::info!(follower_id = %actor.id, followee_id = %target_id, "Followed");
                self.notifier
                    .dispatch(NotificationEvent::follow(target_id, &actor.id, &actor.username))
                    .await;
            }
            true
        };

        let counts = self.repo.follow_counts(&actor.id, target_id).await?;
        Ok(FollowOutcome {
            is_following,
            followers_count: counts.followers_count,
            following_count: counts.following_count,
        })
    }

    // ==================== FAVORITES ====================

    async fn favorite_outcome(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
        is_favorite: bool,
    ) -> Result<FavoriteOutcome, AppError> {
        let likes_count = self
            .repo
            .get_recipe(recipe_id)
            .await?
            .map(|r| r.likes_count)
            .unwrap_or(0);
        Ok(FavoriteOutcome {
            is_favorite,
            likes_count,
            favorites_count: self.repo.favorites_count(&actor.id).await?,
        })
    }

    /// Favorite a recipe. Favoriting counts as a like for the recipe's author.
    pub async fn add_favorite(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
    ) -> Result<FavoriteOutcome, AppError> {
        let recipe = self.require_recipe(recipe_id).await?;

        if !self.repo.add_favorite(&actor.id, recipe_id).await? {
            return Err(AppError::invalid_state(
                codes::ALREADY_FAVORITED,
                "Recipe already in favorites",
            ));
        }
        tracing::info!(user_id = %actor.id, recipe_id, "Recipe favorited");

        if recipe.author_id != actor.id {
            self.notifier
                .dispatch(NotificationEvent::recipe_liked(
                    &recipe.author_id,
                    &actor.id,
                    &actor.username,
                    &recipe.id,
                    &recipe.title,
                ))
                .await;
        }

        self.favorite_outcome(actor, recipe_id, true).await
    }

    pub async fn remove_favorite(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
    ) -> Result<FavoriteOutcome, AppError> {
        self.require_recipe(recipe_id).await?;

        if !self.repo.remove_favorite(&actor.id, recipe_id).await? {
            return Err(AppError::invalid_state(
                codes::NOT_IN_FAVORITES,
                "Recipe not in favorites",
            ));
        }
        tracing::info!(user_id = %actor.id, recipe_id, "Recipe unfavorited");

        self.favorite_outcome(actor, recipe_id, false).await
    }

    /// Favorite or unfavorite depending on the current state.
    pub async fn toggle_favorite(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
    ) -> Result<FavoriteOutcome, AppError> {
        if self.repo.is_favorite(&actor.id, recipe_id).await? {
            self.remove_favorite(actor, recipe_id).await
        } else {
            self.add_favorite(actor, recipe_id).await
        }
    }

    // ==================== SAVED RECIPES ====================

    pub async fn save_recipe(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
    ) -> Result<SaveOutcome, AppError> {
        let recipe = self.require_recipe(recipe_id).await?;

        if !self.repo.add_saved(&actor.id, recipe_id).await? {
            return Err(AppError::invalid_state(
                codes::ALREADY_SAVED,
                "Recipe already saved",
            ));
        }
        tracing::info!(user_id = %actor.id, recipe_id, "Recipe saved");

        if recipe.author_id != actor.id {
            self.notifier
                .dispatch(NotificationEvent::recipe_saved(
                    &recipe.author_id,
                    &actor.id,
                    &actor.username,
                    &recipe.id,
                    &recipe.title,
                ))
                .await;
        }

        Ok(SaveOutcome {
            is_saved: true,
            saved_count: self.repo.saved_count(&actor.id).await?,
        })
    }

    pub async fn unsave_recipe(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
    ) -> Result<SaveOutcome, AppError> {
        self.require_recipe(recipe_id).await?;

        if !self.repo.remove_saved(&actor.id, recipe_id).await? {
            return Err(AppError::invalid_state(codes::NOT_IN_SAVED, "Recipe not saved"));
        }
        tracing::info!(user_id = %actor.id, recipe_id, "Recipe unsaved");

        Ok(SaveOutcome {
            is_saved: false,
            saved_count: self.repo.saved_count(&actor.id).await?,
        })
    }

    // ==================== REVIEWS ====================

    /// Review a recipe. One review per user and recipe.
    pub async fn add_review(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
        request: &AddReviewRequest,
    ) -> Result<Review, AppError> {
        request.validate()?;
        let recipe = self.require_recipe(recipe_id).await?;

        let review = self
            .repo
            .insert_review(recipe_id, &actor.id, request.rating, request.comment.trim())
            .await?
            .ok_or_else(|| {
                AppError::invalid_state(
                    codes::DUPLICATE_REVIEW,
                    "You have already reviewed this recipe",
                )
            })?;
        tracing::info!(user_id = %actor.id, recipe_id, review_id = %review.id, "Review added");

        if recipe.author_id != actor.id {
            self.notifier
                .dispatch(NotificationEvent::review_added(
                    &recipe.author_id,
                    &actor.id,
                    &actor.username,
                    &recipe.id,
                    &recipe.title,
                ))
                .await;
        }

        Ok(review)
    }

    /// Delete one of the actor's own reviews.
    pub async fn delete_review(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
        review_id: &str,
    ) -> Result<(), AppError> {
        let review = self
            .repo
            .get_review(review_id)
            .await?
            .filter(|r| r.recipe_id == recipe_id)
            .ok_or_else(|| {
                AppError::not_found(
                    codes::REVIEW_NOT_FOUND,
                    format!("Review {} not found", review_id),
                )
            })?;

        if review.author_id != actor.id {
            return Err(AppError::Forbidden(
                "Not authorized to delete this review".to_string(),
            ));
        }

        if !self.repo.delete_review(&review).await? {
            return Err(AppError::not_found(
                codes::REVIEW_NOT_FOUND,
                format!("Review {} not found", review_id),
            ));
        }
        tracing::info!(user_id = %actor.id, recipe_id, review_id, "Review deleted");
        Ok(())
    }

    // ==================== RECIPE LIFECYCLE ====================

    /// Publish a recipe: store it, index it and tell the author.
    pub async fn create_recipe(
        &self,
        actor: &AuthUser,
        input: &RecipeInput,
    ) -> Result<Recipe, AppError> {
        input.validate()?;

        let recipe = self.repo.create_recipe(&actor.id, input).await?;
        tracing::info!(recipe_id = %recipe.id, author_id = %actor.id, "Recipe created");

        if let Err(e) = self.search.index_recipe(&recipe).await {
            tracing::error!(recipe_id = %recipe.id, error = %e, "Failed to index recipe");
        }

        self.notifier
            .dispatch(NotificationEvent::recipe_added(
                &actor.id,
                &recipe.id,
                &recipe.title,
            ))
            .await;

        Ok(recipe)
    }

    /// Partially update a recipe. Author only.
    pub async fn update_recipe(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
        request: &UpdateRecipeRequest,
    ) -> Result<Recipe, AppError> {
        let existing = self.require_owned_recipe(actor, recipe_id, "update").await?;
        let merged = request.apply(&existing)?;

        let updated = self.repo.update_recipe(&merged).await?;
        tracing::info!(recipe_id, "Recipe updated");

        if let Err(e) = self.search.index_recipe(&updated).await {
            tracing::error!(recipe_id, error = %e, "Failed to reindex recipe");
        }

        Ok(updated)
    }

    /// Delete a recipe and everything hanging off it. Author only.
    ///
    /// The store mutations commit as one unit; the search index is updated
    /// afterwards and a failure there is only logged, since the next index
    /// rebuild drops the stale document.
    pub async fn delete_recipe(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
    ) -> Result<CascadeReport, AppError> {
        self.require_owned_recipe(actor, recipe_id, "delete").await?;

        let report = self
            .repo
            .delete_recipe_cascade(recipe_id)
            .await?
            .ok_or_else(|| AppError::recipe_not_found(recipe_id))?;
        tracing::info!(
            recipe_id,
            favorites_removed = report.favorites_removed,
            saves_removed = report.saves_removed,
            reviews_removed = report.reviews_removed,
            "Recipe deleted"
        );

        if let Err(e) = self.search.remove_recipe(recipe_id).await {
            tracing::error!(recipe_id, error = %e, "Failed to remove recipe from index");
        }

        Ok(report)
    }

    /// File a moderation report against a recipe.
    pub async fn report_recipe(
        &self,
        actor: &AuthUser,
        recipe_id: &str,
        reason: &str,
    ) -> Result<RecipeReport, AppError> {
        self.require_recipe(recipe_id).await?;

        let report = self.repo.insert_report(recipe_id, &actor.id, reason).await?;
        let open_reports = self.repo.report_count(recipe_id).await?;
        tracing::warn!(recipe_id, reporter_id = %actor.id, open_reports, "Recipe reported");

        Ok(report)
    }

    // ==================== ACCOUNTS ====================

    /// Delete the actor's account and everything it owns, then drop its
    /// recipes from the search index.
    pub async fn delete_account(&self, actor: &AuthUser) -> Result<AccountCascade, AppError> {
        let cascade = self
            .repo
            .delete_account_cascade(&actor.id)
            .await?
            .ok_or_else(|| AppError::user_not_found(&actor.id))?;
        tracing::info!(
            user_id = %actor.id,
            recipes_removed = cascade.recipe_ids.len(),
            reviews_removed = cascade.reviews_removed,
            "Account deleted"
        );

        for recipe_id in &cascade.recipe_ids {
            if let Err(e) = self.search.remove_recipe(recipe_id).await {
                tracing::error!(
                    recipe_id = %recipe_id,
                    error = %e,
                    "Failed to remove recipe from index"
                );
            }
        }

        Ok(cascade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{make_recipe, make_user, recipe_input, temp_repo};
    use crate::models::{NotificationKind, User};
    use crate::notify::DEFAULT_DEDUPE_WINDOW;
    use crate::stats::StatsEngine;
    use tempfile::TempDir;

    struct Fixture {
        repo: Arc<Repository>,
        social: SocialGraph,
        search: Arc<SearchIndex>,
        _db_dir: TempDir,
        _index_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let (repo, db_dir) = temp_repo().await;
        let index_dir = TempDir::new().unwrap();
        let search = Arc::new(SearchIndex::open(index_dir.path()).unwrap());
        let notifier = NotificationDispatcher::new(repo.clone(), DEFAULT_DEDUPE_WINDOW);
        let social = SocialGraph::new(repo.clone(), notifier, search.clone());
        Fixture {
            repo,
            social,
            search,
            _db_dir: db_dir,
            _index_dir: index_dir,
        }
    }

    fn actor(user: &User) -> AuthUser {
        AuthUser {
            id: user.id().to_string(),
            username: user.username().to_string(),
        }
    }

    async fn notifications_of(repo: &Repository, user: &User, kind: NotificationKind) -> usize {
        let (items, _) = repo.list_notifications(user.id(), 0, 100).await.unwrap();
        items.iter().filter(|n| n.kind == kind).count()
    }

    #[tokio::test]
    async fn test_follow_toggle_is_symmetric() {
        let f = fixture().await;
        let a = make_user(&f.repo, "alice").await;
        let b = make_user(&f.repo, "bob").await;

        let followed = f.social.toggle_follow(&actor(&a), b.id()).await.unwrap();
        assert_eq!(
            followed,
            FollowOutcome {
                is_following: true,
                followers_count: 1,
                following_count: 1,
            }
        );
        assert_eq!(notifications_of(&f.repo, &b, NotificationKind::Follow).await, 1);

        let unfollowed = f.social.toggle_follow(&actor(&a), b.id()).await.unwrap();
        assert_eq!(
            unfollowed,
            FollowOutcome {
                is_following: false,
                followers_count: 0,
                following_count: 0,
            }
        );
        assert!(!f.repo.is_following(a.id(), b.id()).await.unwrap());
        // Unfollowing never notifies
        assert_eq!(notifications_of(&f.repo, &b, NotificationKind::Follow).await, 1);
    }

    #[tokio::test]
    async fn test_self_follow_rejected_without_side_effects() {
        let f = fixture().await;
        let a = make_user(&f.repo, "alice").await;

        let err = f.social.toggle_follow(&actor(&a), a.id()).await.unwrap_err();
        assert_eq!(err.error_code(), "CANNOT_FOLLOW_SELF");

        let user = f.repo.get_user(a.id()).await.unwrap().unwrap();
        assert_eq!(user.counters.followers_count, 0);
        assert_eq!(user.counters.following_count, 0);
        assert_eq!(f.repo.list_notifications(a.id(), 0, 10).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_follow_unknown_user() {
        let f = fixture().await;
        let a = make_user(&f.repo, "alice").await;

        let err = f.social.toggle_follow(&actor(&a), "missing").await.unwrap_err();
        assert_eq!(err.error_code(), "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_duplicate_favorite_and_save_are_rejected() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let fan = make_user(&f.repo, "fan").await;
        let recipe = make_recipe(&f.repo, &author, "Pancakes").await;

        let added = f.social.add_favorite(&actor(&fan), &recipe.id).await.unwrap();
        assert_eq!(
            added,
            FavoriteOutcome {
                is_favorite: true,
                likes_count: 1,
                favorites_count: 1,
            }
        );
        let err = f.social.add_favorite(&actor(&fan), &recipe.id).await.unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_FAVORITED");

        let removed = f.social.remove_favorite(&actor(&fan), &recipe.id).await.unwrap();
        assert!(!removed.is_favorite);
        assert_eq!(removed.likes_count, 0);
        let err = f.social.remove_favorite(&actor(&fan), &recipe.id).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_IN_FAVORITES");

        let saved = f.social.save_recipe(&actor(&fan), &recipe.id).await.unwrap();
        assert_eq!(
            saved,
            SaveOutcome {
                is_saved: true,
                saved_count: 1,
            }
        );
        let err = f.social.save_recipe(&actor(&fan), &recipe.id).await.unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_SAVED");
        let unsaved = f.social.unsave_recipe(&actor(&fan), &recipe.id).await.unwrap();
        assert!(!unsaved.is_saved);
        assert_eq!(unsaved.saved_count, 0);
        let err = f.social.unsave_recipe(&actor(&fan), &recipe.id).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_IN_SAVED");

        let err = f.social.add_favorite(&actor(&fan), "missing").await.unwrap_err();
        assert_eq!(err.error_code(), "RECIPE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_own_recipe_interactions_do_not_notify() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let recipe = make_recipe(&f.repo, &author, "Pancakes").await;

        f.social.add_favorite(&actor(&author), &recipe.id).await.unwrap();
        f.social.save_recipe(&actor(&author), &recipe.id).await.unwrap();

        assert_eq!(notifications_of(&f.repo, &author, NotificationKind::RecipeLiked).await, 0);
        assert_eq!(notifications_of(&f.repo, &author, NotificationKind::RecipeSaved).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_review_leaves_rating_alone() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let critic = make_user(&f.repo, "critic").await;
        let recipe = make_recipe(&f.repo, &author, "Pancakes").await;

        let request = AddReviewRequest {
            rating: 4,
            comment: "Fluffy".into(),
        };
        f.social.add_review(&actor(&critic), &recipe.id, &request).await.unwrap();

        let again = AddReviewRequest {
            rating: 1,
            comment: "Changed my mind".into(),
        };
        let err = f
            .social
            .add_review(&actor(&critic), &recipe.id, &again)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_REVIEW");

        let stored = f.repo.get_recipe(&recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.review_count, 1);
        assert_eq!(stored.rating, 4.0);
        assert_eq!(notifications_of(&f.repo, &author, NotificationKind::ReviewAdded).await, 1);
    }

    #[tokio::test]
    async fn test_review_rating_average_and_delete() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let a = make_user(&f.repo, "alice").await;
        let b = make_user(&f.repo, "bob").await;
        let recipe = make_recipe(&f.repo, &author, "Pancakes").await;

        let review_a = f
            .social
            .add_review(&actor(&a), &recipe.id, &AddReviewRequest { rating: 5, comment: "Great".into() })
            .await
            .unwrap();
        f.social
            .add_review(&actor(&b), &recipe.id, &AddReviewRequest { rating: 2, comment: "Meh".into() })
            .await
            .unwrap();
        assert_eq!(f.repo.get_recipe(&recipe.id).await.unwrap().unwrap().rating, 3.5);

        let err = f
            .social
            .delete_review(&actor(&b), &recipe.id, &review_a.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");

        f.social
            .delete_review(&actor(&a), &recipe.id, &review_a.id)
            .await
            .unwrap();
        let stored = f.repo.get_recipe(&recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.rating, 2.0);
        assert_eq!(stored.review_count, 1);

        let err = f
            .social
            .delete_review(&actor(&a), &recipe.id, &review_a.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "REVIEW_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_favorites_and_reviews() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let recipe = f
            .social
            .create_recipe(&actor(&author), &recipe_input("Shakshuka"))
            .await
            .unwrap();
        assert_eq!(f.search.search("shakshuka", 10, 0).unwrap().total, 1);

        let mut fans = Vec::new();
        for name in ["ann", "ben", "cat"] {
            let fan = make_user(&f.repo, name).await;
            f.social.add_favorite(&actor(&fan), &recipe.id).await.unwrap();
            fans.push(fan);
        }
        f.social
            .add_review(
                &actor(&fans[0]),
                &recipe.id,
                &AddReviewRequest {
                    rating: 5,
                    comment: "Yum".into(),
                },
            )
            .await
            .unwrap();
        f.social.save_recipe(&actor(&fans[1]), &recipe.id).await.unwrap();

        let err = f
            .social
            .delete_recipe(&actor(&fans[0]), &recipe.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");

        let report = f.social.delete_recipe(&actor(&author), &recipe.id).await.unwrap();
        assert_eq!(report.favorites_removed, 3);
        assert_eq!(report.reviews_removed, 1);
        assert_eq!(report.saves_removed, 1);

        for fan in &fans {
            assert!(!f.repo.is_favorite(fan.id(), &recipe.id).await.unwrap());
            let stored = f.repo.get_user(fan.id()).await.unwrap().unwrap();
            assert_eq!(stored.counters.favorites_count, 0);
        }
        let (reviews, total) = f.repo.list_reviews(&recipe.id, 0, 10).await.unwrap();
        assert!(reviews.is_empty());
        assert_eq!(total, 0);

        let stored_author = f.repo.get_user(author.id()).await.unwrap().unwrap();
        assert_eq!(stored_author.counters.recipes_count, 0);
        assert_eq!(stored_author.counters.total_likes, 0);
        assert_eq!(f.search.search("shakshuka", 10, 0).unwrap().total, 0);

        // Cached counters agree with a full recount
        let stats = StatsEngine::new(f.repo.clone()).recompute(author.id()).await;
        assert_eq!(stats.recipes_count, 0);
    }

    #[tokio::test]
    async fn test_update_recipe_author_only() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let other = make_user(&f.repo, "other").await;
        let recipe = make_recipe(&f.repo, &author, "Pancakes").await;

        let request = UpdateRecipeRequest {
            title: Some("Crepes".into()),
            ..Default::default()
        };
        let err = f
            .social
            .update_recipe(&actor(&other), &recipe.id, &request)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");

        let updated = f
            .social
            .update_recipe(&actor(&author), &recipe.id, &request)
            .await
            .unwrap();
        assert_eq!(updated.title, "Crepes");
        assert_eq!(updated.servings, recipe.servings);
        assert_eq!(f.search.search("crepes", 10, 0).unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_favorite_scenario_with_dedupe() {
        let f = fixture().await;
        let u = make_user(&f.repo, "umami").await;
        let v = make_user(&f.repo, "vanilla").await;
        let recipe = make_recipe(&f.repo, &u, "Omelette").await;
        let stats = StatsEngine::new(f.repo.clone());

        let before = stats.recompute(u.id()).await;
        f.social.add_favorite(&actor(&v), &recipe.id).await.unwrap();
        let after = stats.recompute(u.id()).await;
        assert_eq!(after.favorites_count, before.favorites_count);
        assert_eq!(after.total_likes, 1);

        let liked = f.repo.list_notifications(u.id(), 0, 10).await.unwrap().0;
        let liked: Vec<_> = liked
            .into_iter()
            .filter(|n| n.kind == NotificationKind::RecipeLiked)
            .collect();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].sender_id.as_deref(), Some(v.id()));

        f.social.remove_favorite(&actor(&v), &recipe.id).await.unwrap();
        assert_eq!(notifications_of(&f.repo, &u, NotificationKind::RecipeLiked).await, 1);

        // Re-favoriting inside the window is an exact duplicate and stays silent
        f.social.add_favorite(&actor(&v), &recipe.id).await.unwrap();
        assert_eq!(notifications_of(&f.repo, &u, NotificationKind::RecipeLiked).await, 1);
    }

    #[tokio::test]
    async fn test_report_recipe_is_recorded() {
        let f = fixture().await;
        let author = make_user(&f.repo, "author").await;
        let reader = make_user(&f.repo, "reader").await;
        let recipe = make_recipe(&f.repo, &author, "Mystery Stew").await;

        let report = f
            .social
            .report_recipe(&actor(&reader), &recipe.id, "Copied from a book")
            .await
            .unwrap();
        assert_eq!(report.recipe_id, recipe.id);
        assert_eq!(report.reporter_id, reader.id());
        assert_eq!(f.repo.report_count(&recipe.id).await.unwrap(), 1);

        let err = f
            .social
            .report_recipe(&actor(&reader), "missing", "Spam")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "RECIPE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_account_drops_recipes_from_index() {
        let f = fixture().await;
        let leaving = make_user(&f.repo, "leaving").await;
        let staying = make_user(&f.repo, "staying").await;
        f.social
            .create_recipe(&actor(&leaving), &recipe_input("Walnut Brownies"))
            .await
            .unwrap();
        let kept = f
            .social
            .create_recipe(&actor(&staying), &recipe_input("Walnut Salad"))
            .await
            .unwrap();
        f.social.toggle_follow(&actor(&staying), leaving.id()).await.unwrap();
        assert_eq!(f.search.search("walnut", 10, 0).unwrap().total, 2);

        let cascade = f.social.delete_account(&actor(&leaving)).await.unwrap();
        assert_eq!(cascade.recipe_ids.len(), 1);

        let hits = f.search.search("walnut", 10, 0).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].recipe_id, kept.id);

        let staying = f.repo.get_user(staying.id()).await.unwrap().unwrap();
        assert_eq!(staying.counters.following_count, 0);

        let err = f.social.delete_account(&actor(&leaving)).await.unwrap_err();
        assert_eq!(err.error_code(), "USER_NOT_FOUND");
    }
}
