//! Relationship sets (follows, favorites, saved recipes) and the counters
//! cached over them.
//!
//! Every add is an `INSERT OR IGNORE` and every remove a plain `DELETE`; the
//! counter updates run in the same transaction and only when the statement
//! changed a row, so two racing requests cannot count one relationship twice.

use sqlx::Row;

use super::repository::or_missing;
use super::reviews::refresh_recipe_rating;
use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::UserCounters;

/// Counts re-read after a follow mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowCounts {
    /// Followers of the followed user.
    pub followers_count: i64,
    /// Users the acting user follows.
    pub following_count: i64,
}

/// Aggregates computed from the relationship tables, never from cached counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityTotals {
    pub counters: UserCounters,
    pub saved_recipes_count: i64,
}

/// What a recipe deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub favorites_removed: u64,
    pub saves_removed: u64,
    pub reviews_removed: u64,
}

/// What an account deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountCascade {
    /// Recipes the account authored, now deleted.
    pub recipe_ids: Vec<String>,
    /// Reviews the account wrote on other users' recipes.
    pub reviews_removed: u64,
}

impl Repository {
    // ==================== FOLLOW OPERATIONS ====================

    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Returns true when the follow was created by this call.
    pub async fn add_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| or_missing(e, || AppError::user_not_found(followee_id)))?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET following_count = following_count + 1 WHERE id = ?")
            .bind(follower_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET followers_count = followers_count + 1 WHERE id = ?")
            .bind(followee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Returns true when a follow was removed by this call.
    pub async fn remove_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET following_count = MAX(following_count - 1, 0) WHERE id = ?")
            .bind(follower_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET followers_count = MAX(followers_count - 1, 0) WHERE id = ?")
            .bind(followee_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Current persisted follow counters of both sides.
    pub async fn follow_counts(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<FollowCounts, AppError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT followers_count FROM users WHERE id = ?) AS followers_count,
                (SELECT following_count FROM users WHERE id = ?) AS following_count"#,
        )
        .bind(followee_id)
        .bind(follower_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowCounts {
            followers_count: row.get::<Option<i64>, _>("followers_count").unwrap_or(0),
            following_count: row.get::<Option<i64>, _>("following_count").unwrap_or(0),
        })
    }

    // ==================== FAVORITE OPERATIONS ====================

    pub async fn is_favorite(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM favorites WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Favorite a recipe. Also counts a like on the recipe and on its author.
    pub async fn add_favorite(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO favorites (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(now_timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| or_missing(e, || AppError::recipe_not_found(recipe_id)))?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET favorites_count = favorites_count + 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE recipes SET likes_count = likes_count + 1 WHERE id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE users SET total_likes = total_likes + 1 \
             WHERE id = (SELECT author_id FROM recipes WHERE id = ?)",
        )
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn remove_favorite(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET favorites_count = MAX(favorites_count - 1, 0) WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE recipes SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE users SET total_likes = MAX(total_likes - 1, 0) \
             WHERE id = (SELECT author_id FROM recipes WHERE id = ?)",
        )
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Persisted favorites counter of a user.
    pub async fn favorites_count(&self, user_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT favorites_count FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("favorites_count")).unwrap_or(0))
    }

    // ==================== SAVED RECIPE OPERATIONS ====================

    pub async fn is_saved(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM saved_recipes WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn add_saved(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO saved_recipes (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| or_missing(e, || AppError::recipe_not_found(recipe_id)))?;
        Ok(inserted.rows_affected() > 0)
    }

    pub async fn remove_saved(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM saved_recipes WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    /// Number of recipes a user has saved.
    pub async fn saved_count(&self, user_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM saved_recipes WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    // ==================== RECIPE DELETION ====================

    /// Delete a recipe with everything that references it, in one transaction.
    ///
    /// Steps, in order: release favorites (and the favoriters' counters),
    /// drop saves, release reviews (and the reviewers' counters), uncount the
    /// recipe and its likes and views from the author, delete the recipe.
    /// Returns `None` when the recipe does not exist.
    ///
    /// Takes the write lock up front. A deferred transaction that starts with a
    /// read gets `SQLITE_BUSY` without waiting once another writer commits.
    pub async fn delete_recipe_cascade(
        &self,
        recipe_id: &str,
    ) -> Result<Option<CascadeReport>, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let Some(recipe) =
            sqlx::query("SELECT author_id, likes_count, views FROM recipes WHERE id = ?")
                .bind(recipe_id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };
        let author_id: String = recipe.get("author_id");
        let likes_count: i64 = recipe.get("likes_count");
        let views: i64 = recipe.get("views");

        sqlx::query(
            "UPDATE users SET favorites_count = MAX(favorites_count - 1, 0) \
             WHERE id IN (SELECT user_id FROM favorites WHERE recipe_id = ?)",
        )
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
        let favorites = sqlx::query("DELETE FROM favorites WHERE recipe_id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        let saves = sqlx::query("DELETE FROM saved_recipes WHERE recipe_id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE users SET reviews_count = MAX(reviews_count - 1, 0) \
             WHERE id IN (SELECT author_id FROM reviews WHERE recipe_id = ?)",
        )
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
        let reviews = sqlx::query("DELETE FROM reviews WHERE recipe_id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"UPDATE users SET
                recipes_count = MAX(recipes_count - 1, 0),
                total_likes = MAX(total_likes - ?, 0),
                total_views = MAX(total_views - ?, 0)
            WHERE id = ?"#,
        )
        .bind(likes_count)
        .bind(views)
        .bind(&author_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(CascadeReport {
            favorites_removed: favorites.rows_affected(),
            saves_removed: saves.rows_affected(),
            reviews_removed: reviews.rows_affected(),
        }))
    }

    // ==================== ACCOUNT DELETION ====================

    /// Delete an account and everything it owns or touched, in one transaction.
    ///
    /// Follow edges in both directions are released with the counters of the
    /// other side. Favorites the user gave are uncounted from those recipes and
    /// their authors; reviews the user wrote are removed and the reviewed
    /// recipes re-rated. The user's own recipes go with their favorites, saves
    /// and reviews, and the favoriters and reviewers lose those counts.
    /// Returns `None` when the account does not exist.
    pub async fn delete_account_cascade(
        &self,
        user_id: &str,
    ) -> Result<Option<AccountCascade>, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let recipe_ids: Vec<String> = sqlx::query("SELECT id FROM recipes WHERE author_id = ?")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.get("id"))
            .collect();

        // Follow edges
        sqlx::query(
            "UPDATE users SET followers_count = MAX(followers_count - 1, 0) \
             WHERE id IN (SELECT followee_id FROM follows WHERE follower_id = ?)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE users SET following_count = MAX(following_count - 1, 0) \
             WHERE id IN (SELECT follower_id FROM follows WHERE followee_id = ?)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM follows WHERE follower_id = ? OR followee_id = ?")
            .bind(user_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Favorites given by the user
        sqlx::query(
            r#"UPDATE users SET total_likes = MAX(total_likes - (
                    SELECT COUNT(*) FROM favorites f JOIN recipes r ON r.id = f.recipe_id
                    WHERE f.user_id = ? AND r.author_id = users.id), 0)
               WHERE id IN (
                    SELECT r.author_id FROM favorites f JOIN recipes r ON r.id = f.recipe_id
                    WHERE f.user_id = ?)"#,
        )
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE recipes SET likes_count = MAX(likes_count - 1, 0) \
             WHERE id IN (SELECT recipe_id FROM favorites WHERE user_id = ?)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM saved_recipes WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Reviews written by the user
        let reviewed: Vec<String> = sqlx::query(
            "SELECT recipe_id FROM reviews WHERE author_id = ? \
             AND recipe_id NOT IN (SELECT id FROM recipes WHERE author_id = ?)",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| row.get("recipe_id"))
        .collect();
        sqlx::query("DELETE FROM reviews WHERE author_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for recipe_id in &reviewed {
            refresh_recipe_rating(&mut *tx, recipe_id).await?;
        }

        // The user's own recipes
        sqlx::query(
            r#"UPDATE users SET favorites_count = MAX(favorites_count - (
                    SELECT COUNT(*) FROM favorites f JOIN recipes r ON r.id = f.recipe_id
                    WHERE r.author_id = ? AND f.user_id = users.id), 0)
               WHERE id IN (
                    SELECT f.user_id FROM favorites f JOIN recipes r ON r.id = f.recipe_id
                    WHERE r.author_id = ?)"#,
        )
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"UPDATE users SET reviews_count = MAX(reviews_count - (
                    SELECT COUNT(*) FROM reviews v JOIN recipes r ON r.id = v.recipe_id
                    WHERE r.author_id = ? AND v.author_id = users.id), 0)
               WHERE id IN (
                    SELECT v.author_id FROM reviews v JOIN recipes r ON r.id = v.recipe_id
                    WHERE r.author_id = ?)"#,
        )
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        for table in ["favorites", "saved_recipes", "reviews"] {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE recipe_id IN (SELECT id FROM recipes WHERE author_id = ?)",
                table
            ))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("DELETE FROM recipes WHERE author_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Inbox rows cascade; notifications the user sent keep a null sender
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(AccountCascade {
            recipe_ids,
            reviews_removed: reviewed.len() as u64,
        }))
    }

    // ==================== AGGREGATES ====================

    /// Count a user's activity from the source tables. `None` if the user is unknown.
    ///
    /// Runs in one transaction so all counts come from the same snapshot.
    pub async fn activity_totals(&self, user_id: &str) -> Result<Option<ActivityTotals>, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM recipes WHERE author_id = ?) AS recipes_count,
                (SELECT COUNT(*) FROM favorites WHERE user_id = ?) AS favorites_count,
                (SELECT COUNT(*) FROM saved_recipes WHERE user_id = ?) AS saved_count,
                (SELECT COUNT(*) FROM reviews WHERE author_id = ?) AS reviews_count,
                (SELECT COUNT(*) FROM follows WHERE followee_id = ?) AS followers_count,
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?) AS following_count,
                (SELECT COUNT(*) FROM favorites f JOIN recipes r ON r.id = f.recipe_id
                    WHERE r.author_id = ?) AS total_likes,
                (SELECT COALESCE(SUM(views), 0) FROM recipes WHERE author_id = ?) AS total_views"#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ActivityTotals {
            counters: UserCounters {
                recipes_count: row.get("recipes_count"),
                favorites_count: row.get("favorites_count"),
                reviews_count: row.get("reviews_count"),
                followers_count: row.get("followers_count"),
                following_count: row.get("following_count"),
                total_likes: row.get("total_likes"),
                total_views: row.get("total_views"),
            },
            saved_recipes_count: row.get("saved_count"),
        }))
    }

    /// Reset the like counters of an author's recipes from the favorites table.
    pub async fn reconcile_recipe_likes(&self, author_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE recipes SET likes_count = \
                (SELECT COUNT(*) FROM favorites WHERE favorites.recipe_id = recipes.id) \
             WHERE author_id = ?",
        )
        .bind(author_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::db::test_support::{make_recipe, make_user, temp_repo};
    use crate::db::Repository;
    use crate::errors::codes;

    const RACERS: usize = 8;

    async fn counters_match_sources(repo: &Repository, user_id: &str) {
        let user = repo.get_user(user_id).await.unwrap().unwrap();
        let totals = repo.activity_totals(user_id).await.unwrap().unwrap();
        assert_eq!(user.counters, totals.counters, "counters drifted for {}", user_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_favorites_count_once() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let fan = make_user(&repo, "fan").await;
        let recipe = make_recipe(&repo, &author, "Shakshuka").await;

        let tasks: Vec<_> = (0..RACERS)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let (fan_id, recipe_id) = (fan.id().to_string(), recipe.id.clone());
                tokio::spawn(async move { repo.add_favorite(&fan_id, &recipe_id).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        assert_eq!(repo.favorites_count(fan.id()).await.unwrap(), 1);
        assert_eq!(repo.get_recipe(&recipe.id).await.unwrap().unwrap().likes_count, 1);
        let author = repo.get_user(author.id()).await.unwrap().unwrap();
        assert_eq!(author.counters.total_likes, 1);
        counters_match_sources(&repo, fan.id()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_follows_count_once() {
        let (repo, _dir) = temp_repo().await;
        let chef = make_user(&repo, "chef").await;
        let fan = make_user(&repo, "fan").await;

        let tasks: Vec<_> = (0..RACERS)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let (fan_id, chef_id) = (fan.id().to_string(), chef.id().to_string());
                tokio::spawn(async move { repo.add_follow(&fan_id, &chef_id).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let counts = repo.follow_counts(fan.id(), chef.id()).await.unwrap();
        assert_eq!(counts.followers_count, 1);
        assert_eq!(counts.following_count, 1);
        counters_match_sources(&repo, chef.id()).await;
        counters_match_sources(&repo, fan.id()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_racing_favorites_leaves_no_drift() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let recipe = make_recipe(&repo, &author, "Ramen").await;
        let mut fans = Vec::new();
        for i in 0..RACERS {
            fans.push(make_user(&repo, &format!("fan{}", i)).await);
        }

        let favorites: Vec<_> = fans
            .iter()
            .map(|fan| {
                let repo = Arc::clone(&repo);
                let (fan_id, recipe_id) = (fan.id().to_string(), recipe.id.clone());
                tokio::spawn(async move { repo.add_favorite(&fan_id, &recipe_id).await })
            })
            .collect();
        let deletion = {
            let repo = Arc::clone(&repo);
            let recipe_id = recipe.id.clone();
            tokio::spawn(async move { repo.delete_recipe_cascade(&recipe_id).await })
        };

        for task in favorites {
            match task.await.unwrap() {
                Ok(_) => {}
                Err(e) => assert_eq!(e.error_code(), codes::RECIPE_NOT_FOUND),
            }
        }
        assert!(deletion.await.unwrap().unwrap().is_some());

        assert!(repo.get_recipe(&recipe.id).await.unwrap().is_none());
        for fan in &fans {
            assert_eq!(repo.favorites_count(fan.id()).await.unwrap(), 0);
            counters_match_sources(&repo, fan.id()).await;
        }
        counters_match_sources(&repo, author.id()).await;
    }

    #[tokio::test]
    async fn test_relationship_to_missing_recipe_is_not_found() {
        let (repo, _dir) = temp_repo().await;
        let user = make_user(&repo, "cook").await;

        let err = repo.add_favorite(user.id(), "missing").await.unwrap_err();
        assert_eq!(err.error_code(), codes::RECIPE_NOT_FOUND);
        let err = repo.add_saved(user.id(), "missing").await.unwrap_err();
        assert_eq!(err.error_code(), codes::RECIPE_NOT_FOUND);
        let err = repo.add_follow(user.id(), "missing").await.unwrap_err();
        assert_eq!(err.error_code(), codes::USER_NOT_FOUND);
        assert_eq!(repo.favorites_count(user.id()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_saved_count_follows_saves() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let cook = make_user(&repo, "cook").await;
        let first = make_recipe(&repo, &author, "Pho").await;
        let second = make_recipe(&repo, &author, "Bao").await;

        assert!(repo.add_saved(cook.id(), &first.id).await.unwrap());
        assert!(repo.add_saved(cook.id(), &second.id).await.unwrap());
        assert!(!repo.add_saved(cook.id(), &second.id).await.unwrap());
        assert_eq!(repo.saved_count(cook.id()).await.unwrap(), 2);

        assert!(repo.remove_saved(cook.id(), &first.id).await.unwrap());
        assert_eq!(repo.saved_count(cook.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_account_deletion_releases_every_counter() {
        let (repo, _dir) = temp_repo().await;
        let leaving = make_user(&repo, "leaving").await;
        let chef = make_user(&repo, "chef").await;
        let fan = make_user(&repo, "fan").await;
        let own = make_recipe(&repo, &leaving, "Own stew").await;
        let other = make_recipe(&repo, &chef, "Chef curry").await;

        repo.add_follow(leaving.id(), chef.id()).await.unwrap();
        repo.add_follow(fan.id(), leaving.id()).await.unwrap();
        repo.add_favorite(leaving.id(), &other.id).await.unwrap();
        repo.add_favorite(fan.id(), &own.id).await.unwrap();
        repo.add_saved(fan.id(), &own.id).await.unwrap();
        repo.insert_review(&other.id, leaving.id(), 2, "Too salty").await.unwrap();
        repo.insert_review(&other.id, fan.id(), 4, "Great").await.unwrap();
        repo.insert_review(&own.id, fan.id(), 5, "Lovely").await.unwrap();

        let cascade = repo.delete_account_cascade(leaving.id()).await.unwrap().unwrap();
        assert_eq!(cascade.recipe_ids, vec![own.id.clone()]);
        assert_eq!(cascade.reviews_removed, 1);

        assert!(repo.get_user(leaving.id()).await.unwrap().is_none());
        assert!(repo.get_recipe(&own.id).await.unwrap().is_none());

        let other = repo.get_recipe(&other.id).await.unwrap().unwrap();
        assert_eq!(other.likes_count, 0);
        assert_eq!(other.review_count, 1);
        assert_eq!(other.rating, 4.0);

        let chef = repo.get_user(chef.id()).await.unwrap().unwrap();
        assert_eq!(chef.counters.followers_count, 0);
        assert_eq!(chef.counters.total_likes, 0);
        let fan = repo.get_user(fan.id()).await.unwrap().unwrap();
        assert_eq!(fan.counters.following_count, 0);
        assert_eq!(fan.counters.favorites_count, 0);
        assert_eq!(fan.counters.reviews_count, 1);
        assert_eq!(repo.saved_count(fan.id()).await.unwrap(), 0);

        counters_match_sources(&repo, chef.id()).await;
        counters_match_sources(&repo, fan.id()).await;
        assert!(repo.delete_account_cascade(leaving.id()).await.unwrap().is_none());
    }
}
