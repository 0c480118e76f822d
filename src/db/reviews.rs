//! Review persistence. Every write refreshes the recipe's rating in the same
//! transaction.

use sqlx::{Row, SqliteConnection};

use super::repository::{
    or_missing, review_from_row, review_summary_from_row, REVIEW_COLUMNS, REVIEW_SOURCE,
};
use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{Review, ReviewSummary};

impl Repository {
    // ==================== REVIEW OPERATIONS ====================

    pub async fn get_review(&self, id: &str) -> Result<Option<Review>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE v.id = ?",
            REVIEW_COLUMNS, REVIEW_SOURCE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(review_from_row))
    }

    /// Insert a review unless the author already reviewed this recipe.
    ///
    /// Returns `None` for a duplicate; nothing is written in that case.
    pub async fn insert_review(
        &self,
        recipe_id: &str,
        author_id: &str,
        rating: i64,
        comment: &str,
    ) -> Result<Option<Review>, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"INSERT INTO reviews (id, recipe_id, author_id, rating, comment, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (author_id, recipe_id) DO NOTHING"#,
        )
        .bind(&id)
        .bind(recipe_id)
        .bind(author_id)
        .bind(rating)
        .bind(comment)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| or_missing(e, || AppError::recipe_not_found(recipe_id)))?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("UPDATE users SET reviews_count = reviews_count + 1 WHERE id = ?")
            .bind(author_id)
            .execute(&mut *tx)
            .await?;
        refresh_recipe_rating(&mut *tx, recipe_id).await?;

        tx.commit().await?;

        self.get_review(&id).await
    }

    /// Delete a review. Returns false when it was already gone.
    pub async fn delete_review(&self, review: &Review) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(&review.id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE users SET reviews_count = MAX(reviews_count - 1, 0) WHERE id = ?",
        )
        .bind(&review.author_id)
        .execute(&mut *tx)
        .await?;
        refresh_recipe_rating(&mut *tx, &review.recipe_id).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Reviews of a recipe, newest first, with the total count.
    pub async fn list_reviews(
        &self,
        recipe_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Review>, i64), AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE v.recipe_id = ? ORDER BY v.created_at DESC LIMIT ? OFFSET ?",
            REVIEW_COLUMNS, REVIEW_SOURCE
        ))
        .bind(recipe_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM reviews WHERE recipe_id = ?")
            .bind(recipe_id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        Ok((rows.iter().map(review_from_row).collect(), total))
    }

    /// Latest reviews written by a user, with the reviewed recipe's title.
    pub async fn recent_review_summaries(
        &self,
        author_id: &str,
        limit: i64,
    ) -> Result<Vec<ReviewSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT v.id, v.rating, v.comment, v.recipe_id, r.title AS recipe_title, v.created_at
               FROM reviews v LEFT JOIN recipes r ON r.id = v.recipe_id
               WHERE v.author_id = ? ORDER BY v.created_at DESC LIMIT ?"#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(review_summary_from_row).collect())
    }
}

/// Recompute a recipe's average rating (one decimal) and review count.
pub(super) async fn refresh_recipe_rating(
    conn: &mut SqliteConnection,
    recipe_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE recipes SET
            rating = COALESCE((SELECT ROUND(AVG(rating), 1) FROM reviews WHERE recipe_id = ?), 0),
            review_count = (SELECT COUNT(*) FROM reviews WHERE recipe_id = ?)
        WHERE id = ?"#,
    )
    .bind(recipe_id)
    .bind(recipe_id)
    .bind(recipe_id)
    .execute(conn)
    .await?;
    Ok(())
}
