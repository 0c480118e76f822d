//! Counter maintenance and the profile read model.
//!
//! The counters persisted on `users` are a cache. [`StatsEngine::recompute`]
//! rebuilds them from the relationship tables and writes them back; every
//! profile-serving endpoint reads through [`StatsEngine::enrich`].
//!
//! Stats failures never reach the caller: they are logged and replaced by
//! zeroed stats so a profile page still renders.

use std::sync::Arc;

use serde::Serialize;

use crate::db::{ActivityTotals, Repository};
use crate::errors::AppError;
use crate::models::{RecipeSummary, ReviewSummary, UserProfile};

/// Number of recent recipes and reviews carried by an enriched profile.
pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Aggregated activity of one user.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub recipes_count: i64,
    pub favorites_count: i64,
    pub reviews_count: i64,
    pub saved_recipes_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub total_likes: i64,
    pub total_views: i64,
    pub total_interactions: i64,
    /// Interactions per follower in percent, one decimal. 0 without followers.
    pub engagement_rate: f64,
}

impl From<&ActivityTotals> for Stats {
    fn from(totals: &ActivityTotals) -> Self {
        let c = &totals.counters;
        let total_interactions = c.total_likes + c.total_views;
        Self {
            recipes_count: c.recipes_count,
            favorites_count: c.favorites_count,
            reviews_count: c.reviews_count,
            saved_recipes_count: totals.saved_recipes_count,
            followers_count: c.followers_count,
            following_count: c.following_count,
            total_likes: c.total_likes,
            total_views: c.total_views,
            total_interactions,
            engagement_rate: engagement_rate(total_interactions, c.followers_count),
        }
    }
}

pub fn engagement_rate(total_interactions: i64, followers_count: i64) -> f64 {
    if followers_count <= 0 {
        return 0.0;
    }
    let rate = total_interactions as f64 / followers_count as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Experience tier derived from stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum UserLevel {
    #[serde(rename = "New Cook")]
    NewCook,
    #[serde(rename = "Beginner Chef")]
    BeginnerChef,
    #[serde(rename = "Intermediate Chef")]
    IntermediateChef,
    #[serde(rename = "Advanced Chef")]
    AdvancedChef,
    #[serde(rename = "Expert Chef")]
    ExpertChef,
    #[serde(rename = "Master Chef")]
    MasterChef,
}

impl UserLevel {
    /// Weighted activity points.
    pub fn points(stats: &Stats) -> i64 {
        stats.recipes_count * 10
            + stats.followers_count * 5
            + stats.reviews_count * 3
            + stats.total_likes * 2
            + stats.total_views
    }

    pub fn from_points(points: i64) -> Self {
        match points {
            p if p >= 10_000 => UserLevel::MasterChef,
            p if p >= 5_000 => UserLevel::ExpertChef,
            p if p >= 2_000 => UserLevel::AdvancedChef,
            p if p >= 500 => UserLevel::IntermediateChef,
            p if p >= 100 => UserLevel::BeginnerChef,
            _ => UserLevel::NewCook,
        }
    }

    pub fn for_stats(stats: &Stats) -> Self {
        Self::from_points(Self::points(stats))
    }
}

/// Stats with the derived level, as served by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeveledStats {
    #[serde(flatten)]
    pub stats: Stats,
    pub user_level: UserLevel,
}

/// A user's profile merged with recomputed stats and recent activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProfile {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(flatten)]
    pub stats: Stats,
    pub user_level: UserLevel,
    pub recent_recipes: Vec<RecipeSummary>,
    pub recent_reviews: Vec<ReviewSummary>,
    pub saved_recipes: Vec<RecipeSummary>,
    pub favorites: Vec<RecipeSummary>,
}

/// Recomputes counters and assembles profile read models.
#[derive(Clone)]
pub struct StatsEngine {
    repo: Arc<Repository>,
}

impl StatsEngine {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Recompute a user's stats from the source tables and persist the counters.
    ///
    /// Unknown users and store failures yield zeroed stats.
    pub async fn recompute(&self, user_id: &str) -> Stats {
        match self.try_recompute(user_id).await {
            Ok(Some(stats)) => stats,
            Ok(None) => {
                tracing::warn!(user_id, "Stats requested for unknown user");
                Stats::default()
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to recompute user stats");
                Stats::default()
            }
        }
    }

    async fn try_recompute(&self, user_id: &str) -> Result<Option<Stats>, AppError> {
        let Some(totals) = self.repo.activity_totals(user_id).await? else {
            return Ok(None);
        };

        // Stale counters are only a cache, so a failed write-back is not fatal
        if let Err(e) = self.persist(user_id, &totals).await {
            tracing::warn!(user_id, error = %e, "Failed to persist recomputed counters");
        }

        let stats = Stats::from(&totals);
        tracing::debug!(
            user_id,
            recipes = stats.recipes_count,
            followers = stats.followers_count,
            likes = stats.total_likes,
            views = stats.total_views,
            "Recomputed user stats"
        );
        Ok(Some(stats))
    }

    async fn persist(&self, user_id: &str, totals: &ActivityTotals) -> Result<(), AppError> {
        self.repo.persist_counters(user_id, &totals.counters).await?;
        self.repo.reconcile_recipe_likes(user_id).await
    }

    /// Recomputed stats together with the derived level.
    pub async fn leveled(&self, user_id: &str) -> LeveledStats {
        let stats = self.recompute(user_id).await;
        LeveledStats {
            user_level: UserLevel::for_stats(&stats),
            stats,
        }
    }

    /// Build the enriched profile of a user.
    ///
    /// Only a missing user is an error; stats and activity lists degrade to
    /// empty values.
    pub async fn enrich(&self, user_id: &str) -> Result<EnrichedProfile, AppError> {
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::user_not_found(user_id))?;

        let stats = self.recompute(user_id).await;

        let recent_recipes = self
            .repo
            .recent_recipe_summaries(user_id, RECENT_ACTIVITY_LIMIT)
            .await
            .unwrap_or_else(|e| degrade(user_id, "recent recipes", e));
        let recent_reviews = self
            .repo
            .recent_review_summaries(user_id, RECENT_ACTIVITY_LIMIT)
            .await
            .unwrap_or_else(|e| degrade(user_id, "recent reviews", e));
        let saved_recipes = self
            .repo
            .saved_recipes(user_id)
            .await
            .map(|recipes| recipes.iter().map(RecipeSummary::from).collect())
            .unwrap_or_else(|e| degrade(user_id, "saved recipes", e));
        let favorites = self
            .repo
            .favorite_recipes(user_id)
            .await
            .map(|recipes| recipes.iter().map(RecipeSummary::from).collect())
            .unwrap_or_else(|e| degrade(user_id, "favorites", e));

        Ok(EnrichedProfile {
            profile: user.profile,
            user_level: UserLevel::for_stats(&stats),
            stats,
            recent_recipes,
            recent_reviews,
            saved_recipes,
            favorites,
        })
    }
}

fn degrade<T>(user_id: &str, what: &str, err: AppError) -> Vec<T> {
    tracing::error!(user_id, error = %err, "Failed to load {} for profile", what);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{make_recipe, make_user, temp_repo};

    #[test]
    fn test_engagement_rate_without_followers_is_zero() {
        assert_eq!(engagement_rate(0, 0), 0.0);
        assert_eq!(engagement_rate(12_345, 0), 0.0);
    }

    #[test]
    fn test_engagement_rate_rounds_to_one_decimal() {
        assert_eq!(engagement_rate(1, 3), 33.3);
        assert_eq!(engagement_rate(2, 3), 66.7);
        assert_eq!(engagement_rate(150, 2), 7500.0);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(UserLevel::from_points(0), UserLevel::NewCook);
        assert_eq!(UserLevel::from_points(99), UserLevel::NewCook);
        assert_eq!(UserLevel::from_points(100), UserLevel::BeginnerChef);
        assert_eq!(UserLevel::from_points(499), UserLevel::BeginnerChef);
        assert_eq!(UserLevel::from_points(500), UserLevel::IntermediateChef);
        assert_eq!(UserLevel::from_points(2_000), UserLevel::AdvancedChef);
        assert_eq!(UserLevel::from_points(5_000), UserLevel::ExpertChef);
        assert_eq!(UserLevel::from_points(9_999), UserLevel::ExpertChef);
        assert_eq!(UserLevel::from_points(10_000), UserLevel::MasterChef);
    }

    #[test]
    fn test_level_points_weights() {
        let stats = Stats {
            recipes_count: 1,
            followers_count: 1,
            reviews_count: 1,
            total_likes: 1,
            total_views: 1,
            ..Default::default()
        };
        assert_eq!(UserLevel::points(&stats), 10 + 5 + 3 + 2 + 1);
        assert_eq!(
            serde_json::to_value(UserLevel::IntermediateChef).unwrap(),
            "Intermediate Chef"
        );
        assert_eq!(serde_json::to_value(UserLevel::MasterChef).unwrap(), "Master Chef");
    }

    #[tokio::test]
    async fn test_unknown_user_gets_default_stats() {
        let (repo, _dir) = temp_repo().await;
        let engine = StatsEngine::new(repo);
        assert_eq!(engine.recompute("missing").await, Stats::default());
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let fan = make_user(&repo, "fan").await;
        let recipe = make_recipe(&repo, &author, "Omelette").await;
        repo.add_favorite(fan.id(), &recipe.id).await.unwrap();
        repo.add_follow(fan.id(), author.id()).await.unwrap();

        let engine = StatsEngine::new(repo);
        let first = engine.recompute(author.id()).await;
        let second = engine.recompute(author.id()).await;
        assert_eq!(first, second);
        assert_eq!(first.recipes_count, 1);
        assert_eq!(first.total_likes, 1);
        assert_eq!(first.followers_count, 1);
    }

    #[tokio::test]
    async fn test_recompute_repairs_drifted_counters() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        let fan = make_user(&repo, "fan").await;
        let recipe = make_recipe(&repo, &author, "Soup").await;
        repo.add_favorite(fan.id(), &recipe.id).await.unwrap();
        repo.add_saved(fan.id(), &recipe.id).await.unwrap();
        repo.record_view(&recipe.id, author.id()).await.unwrap();

        // Corrupt the cache
        let drifted = crate::models::UserCounters {
            recipes_count: 7,
            total_likes: 40,
            followers_count: 3,
            ..Default::default()
        };
        repo.persist_counters(author.id(), &drifted).await.unwrap();

        let engine = StatsEngine::new(repo.clone());
        let stats = engine.recompute(author.id()).await;
        assert_eq!(stats.recipes_count, 1);
        assert_eq!(stats.total_likes, 1);
        assert_eq!(stats.total_views, 1);
        assert_eq!(stats.followers_count, 0);
        assert_eq!(stats.engagement_rate, 0.0);

        let stored = repo.get_user(author.id()).await.unwrap().unwrap();
        assert_eq!(stored.counters.recipes_count, 1);
        assert_eq!(stored.counters.total_likes, 1);
        assert_eq!(stored.counters.followers_count, 0);

        let fan_stats = engine.recompute(fan.id()).await;
        assert_eq!(fan_stats.favorites_count, 1);
        assert_eq!(fan_stats.saved_recipes_count, 1);
        assert_eq!(fan_stats.recipes_count, 0);
    }

    #[tokio::test]
    async fn test_enrich_merges_profile_and_activity() {
        let (repo, _dir) = temp_repo().await;
        let author = make_user(&repo, "author").await;
        for i in 0..6 {
            make_recipe(&repo, &author, &format!("Recipe {}", i)).await;
        }

        let engine = StatsEngine::new(repo);
        let profile = engine.enrich(author.id()).await.unwrap();
        assert_eq!(profile.profile.username, "author");
        assert_eq!(profile.stats.recipes_count, 6);
        assert_eq!(profile.recent_recipes.len(), RECENT_ACTIVITY_LIMIT as usize);
        assert_eq!(profile.user_level, UserLevel::NewCook);

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["username"], "author");
        assert_eq!(value["recipesCount"], 6);
        assert_eq!(value["userLevel"], "New Cook");
    }

    #[tokio::test]
    async fn test_enrich_unknown_user_is_not_found() {
        let (repo, _dir) = temp_repo().await;
        let engine = StatsEngine::new(repo);
        let err = engine.enrich("missing").await.unwrap_err();
        assert_eq!(err.error_code(), "USER_NOT_FOUND");
    }
}
