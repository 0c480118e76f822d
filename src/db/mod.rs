//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. Relationship sets
//! (follows, favorites, saved recipes) live in join tables; the counters on
//! `users` and `recipes` are caches over them.

mod notifications;
mod recipes;
mod relations;
mod repository;
mod reviews;
mod users;

pub use notifications::*;
pub use recipes::*;
pub use relations::*;
pub use repository::*;
pub use users::*;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Format a timestamp the way every table stores it.
///
/// Fixed width (millisecond precision, `Z` suffix) so that string comparison
/// in SQL orders timestamps chronologically.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            profile_picture TEXT NOT NULL DEFAULT '/uploads/profile/default-avatar.jpg',
            cover_picture TEXT NOT NULL DEFAULT '/uploads/profile/default-cover.jpg',
            tagline TEXT,
            bio TEXT,
            location TEXT,
            website TEXT,
            cooking_style TEXT,
            social_media TEXT,
            interests TEXT,
            specialties TEXT,
            badges TEXT,
            is_verified INTEGER NOT NULL DEFAULT 0,
            is_pro_chef INTEGER NOT NULL DEFAULT 0,
            recipes_count INTEGER NOT NULL DEFAULT 0,
            favorites_count INTEGER NOT NULL DEFAULT 0,
            reviews_count INTEGER NOT NULL DEFAULT 0,
            followers_count INTEGER NOT NULL DEFAULT 0,
            following_count INTEGER NOT NULL DEFAULT 0,
            total_likes INTEGER NOT NULL DEFAULT 0,
            total_views INTEGER NOT NULL DEFAULT 0,
            reset_token_hash TEXT,
            reset_token_expires TEXT,
            member_since TEXT NOT NULL,
            last_active TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            ingredients TEXT NOT NULL,
            instructions TEXT NOT NULL,
            prep_time INTEGER NOT NULL,
            cook_time INTEGER NOT NULL,
            servings INTEGER NOT NULL,
            difficulty TEXT NOT NULL,
            category TEXT NOT NULL,
            image_url TEXT,
            author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            rating REAL NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0,
            likes_count INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            nutrition TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (author_id, recipe_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            recipient_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            sender_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            recipe_id TEXT REFERENCES recipes(id) ON DELETE SET NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS follows (
            follower_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            followee_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (follower_id, followee_id)
        );

        CREATE TABLE IF NOT EXISTS favorites (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, recipe_id)
        );

        CREATE TABLE IF NOT EXISTS saved_recipes (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, recipe_id)
        );

        CREATE TABLE IF NOT EXISTS recipe_reports (
            id TEXT PRIMARY KEY,
            recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            reporter_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            reason TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_recipes_author ON recipes(author_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category, created_at);
        CREATE INDEX IF NOT EXISTS idx_reviews_recipe ON reviews(recipe_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_reviews_author ON reviews(author_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_unread ON notifications(recipient_id, read);
        CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id);
        CREATE INDEX IF NOT EXISTS idx_favorites_recipe ON favorites(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_saved_recipe ON saved_recipes(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_reports_recipe ON recipe_reports(recipe_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_users_chefs ON users(recipes_count, followers_count);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
