//! Recipe persistence.

use sqlx::Row;

use super::repository::{
    or_missing, recipe_from_row, recipe_summary_from_row, to_json, RECIPE_COLUMNS, RECIPE_SOURCE,
};
use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{Category, Difficulty, Recipe, RecipeInput, RecipeReport, RecipeSummary};

/// Optional filters for recipe listings.
#[derive(Debug, Clone, Default)]
pub struct RecipeScope {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub author_id: Option<String>,
}

impl Repository {
    // ==================== RECIPE OPERATIONS ====================

    /// Create a recipe and count it towards its author in one transaction.
    pub async fn create_recipe(
        &self,
        author_id: &str,
        input: &RecipeInput,
    ) -> Result<Recipe, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO recipes (id, title, description, ingredients, instructions, prep_time,
                   cook_time, servings, difficulty, category, image_url, author_id, nutrition,
                   notes, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(to_json(&input.ingredients))
        .bind(to_json(&input.instructions))
        .bind(input.prep_time)
        .bind(input.cook_time)
        .bind(input.servings)
        .bind(input.difficulty.as_str())
        .bind(input.category.as_str())
        .bind(&input.image_url)
        .bind(author_id)
        .bind(input.nutrition.as_ref().map(|n| to_json(n)))
        .bind(&input.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET recipes_count = recipes_count + 1 WHERE id = ?")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_recipe(&id)
            .await?
            .ok_or_else(|| AppError::recipe_not_found(&id))
    }

    /// Get a recipe with its author summary.
    pub async fn get_recipe(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE r.id = ?",
            RECIPE_COLUMNS, RECIPE_SOURCE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(recipe_from_row))
    }

    /// List recipes newest first, with the total matching the scope.
    pub async fn list_recipes(
        &self,
        scope: &RecipeScope,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Recipe>, i64), AppError> {
        let filter = "(? IS NULL OR r.category = ?) AND (? IS NULL OR r.difficulty = ?) \
                      AND (? IS NULL OR r.author_id = ?)";
        let category = scope.category.map(|c| c.as_str());
        let difficulty = scope.difficulty.map(|d| d.as_str());
        let author_id = scope.author_id.as_deref();

        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE {} ORDER BY r.created_at DESC LIMIT ? OFFSET ?",
            RECIPE_COLUMNS, RECIPE_SOURCE, filter
        ))
        .bind(category)
        .bind(category)
        .bind(difficulty)
        .bind(difficulty)
        .bind(author_id)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM recipes r WHERE {}",
            filter
        ))
        .bind(category)
        .bind(category)
        .bind(difficulty)
        .bind(difficulty)
        .bind(author_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?
        .get("total");

        Ok((rows.iter().map(recipe_from_row).collect(), total))
    }

    /// Every recipe, used to rebuild the search index.
    pub async fn list_all_recipes(&self) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} ORDER BY r.created_at",
            RECIPE_COLUMNS, RECIPE_SOURCE
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recipe_from_row).collect())
    }

    /// Other recipes in the same category, newest first.
    pub async fn similar_recipes(
        &self,
        category: Category,
        exclude_id: &str,
        limit: i64,
    ) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE r.category = ? AND r.id != ? ORDER BY r.created_at DESC LIMIT ?",
            RECIPE_COLUMNS, RECIPE_SOURCE
        ))
        .bind(category.as_str())
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recipe_from_row).collect())
    }

    /// Latest recipes of an author as summaries.
    pub async fn recent_recipe_summaries(
        &self,
        author_id: &str,
        limit: i64,
    ) -> Result<Vec<RecipeSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, title, image_url, rating, views, likes_count, created_at
               FROM recipes WHERE author_id = ? ORDER BY created_at DESC LIMIT ?"#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recipe_summary_from_row).collect())
    }

    /// Latest recipes of an author with full details.
    pub async fn recent_recipes(&self, author_id: &str, limit: i64) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE r.author_id = ? ORDER BY r.created_at DESC LIMIT ?",
            RECIPE_COLUMNS, RECIPE_SOURCE
        ))
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recipe_from_row).collect())
    }

    /// Recipes a user favorited, most recently favorited first.
    pub async fn favorite_recipes(&self, user_id: &str) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM favorites f JOIN {} ON r.id = f.recipe_id \
             WHERE f.user_id = ? ORDER BY f.created_at DESC",
            RECIPE_COLUMNS, RECIPE_SOURCE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recipe_from_row).collect())
    }

    /// Recipes a user saved, most recently saved first.
    pub async fn saved_recipes(&self, user_id: &str) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM saved_recipes s JOIN {} ON r.id = s.recipe_id \
             WHERE s.user_id = ? ORDER BY s.created_at DESC",
            RECIPE_COLUMNS, RECIPE_SOURCE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(recipe_from_row).collect())
    }

    /// Persist the editable fields of a recipe. Counters are not touched.
    pub async fn update_recipe(&self, recipe: &Recipe) -> Result<Recipe, AppError> {
        let result = sqlx::query(
            r#"UPDATE recipes SET
                title = ?, description = ?, ingredients = ?, instructions = ?, prep_time = ?,
                cook_time = ?, servings = ?, difficulty = ?, category = ?, image_url = ?,
                nutrition = ?, notes = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(to_json(&recipe.ingredients))
        .bind(to_json(&recipe.instructions))
        .bind(recipe.prep_time)
        .bind(recipe.cook_time)
        .bind(recipe.servings)
        .bind(recipe.difficulty.as_str())
        .bind(recipe.category.as_str())
        .bind(&recipe.image_url)
        .bind(recipe.nutrition.as_ref().map(|n| to_json(n)))
        .bind(&recipe.notes)
        .bind(now_timestamp())
        .bind(&recipe.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::recipe_not_found(&recipe.id));
        }

        self.get_recipe(&recipe.id)
            .await?
            .ok_or_else(|| AppError::recipe_not_found(&recipe.id))
    }

    /// Count one view on the recipe and on its author's total.
    pub async fn record_view(&self, recipe_id: &str, author_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE recipes SET views = views + 1 WHERE id = ?")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET total_views = total_views + 1 WHERE id = ?")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// File a moderation report against a recipe.
    pub async fn insert_report(
        &self,
        recipe_id: &str,
        reporter_id: &str,
        reason: &str,
    ) -> Result<RecipeReport, AppError> {
        let report = RecipeReport {
            id: uuid::Uuid::new_v4().to_string(),
            recipe_id: recipe_id.to_string(),
            reporter_id: reporter_id.to_string(),
            reason: reason.to_string(),
            created_at: now_timestamp(),
        };

        sqlx::query(
            "INSERT INTO recipe_reports (id, recipe_id, reporter_id, reason, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&report.id)
        .bind(&report.recipe_id)
        .bind(&report.reporter_id)
        .bind(&report.reason)
        .bind(&report.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| or_missing(e, || AppError::recipe_not_found(recipe_id)))?;

        Ok(report)
    }

    /// Number of open reports against a recipe.
    pub async fn report_count(&self, recipe_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM recipe_reports WHERE recipe_id = ?")
            .bind(recipe_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }
}
