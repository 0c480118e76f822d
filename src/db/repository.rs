//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. The
//! operations are split by collection across the sibling modules; this file
//! holds the shared handle and the row conversion helpers.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Badge, Category, Difficulty, Recipe, RecipeSummary, Review, ReviewSummary, SocialMedia, User,
    UserCounters, UserProfile, UserSummary,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(super) const USER_COLUMNS: &str = "id, name, username, email, profile_picture, cover_picture, \
    tagline, bio, location, website, cooking_style, social_media, interests, specialties, badges, \
    is_verified, is_pro_chef, recipes_count, favorites_count, reviews_count, followers_count, \
    following_count, total_likes, total_views, member_since, last_active";

pub(super) const SUMMARY_COLUMNS: &str =
    "id, username, name, profile_picture, followers_count, recipes_count";

/// Recipe columns joined with the author summary. Use with [`RECIPE_SOURCE`].
pub(super) const RECIPE_COLUMNS: &str = "r.id, r.title, r.description, r.ingredients, \
    r.instructions, r.prep_time, r.cook_time, r.servings, r.difficulty, r.category, r.image_url, \
    r.author_id, r.rating, r.review_count, r.likes_count, r.views, r.nutrition, r.notes, \
    r.created_at, r.updated_at, u.username AS author_username, u.name AS author_name, \
    u.profile_picture AS author_picture, u.followers_count AS author_followers, \
    u.recipes_count AS author_recipes";

pub(super) const RECIPE_SOURCE: &str = "recipes r LEFT JOIN users u ON u.id = r.author_id";

pub(super) const REVIEW_COLUMNS: &str = "v.id, v.recipe_id, v.author_id, v.rating, v.comment, \
    v.created_at, v.updated_at, u.username AS author_username, u.name AS author_name, \
    u.profile_picture AS author_picture, u.followers_count AS author_followers, \
    u.recipes_count AS author_recipes";

pub(super) const REVIEW_SOURCE: &str = "reviews v LEFT JOIN users u ON u.id = v.author_id";

// Helper functions for row conversion

pub(super) fn user_from_row(row: &SqliteRow) -> User {
    let is_verified: i32 = row.get("is_verified");
    let is_pro_chef: i32 = row.get("is_pro_chef");
    User {
        profile: UserProfile {
            id: row.get("id"),
            name: row.get("name"),
            username: row.get("username"),
            email: row.get("email"),
            profile_picture: row.get("profile_picture"),
            cover_picture: row.get("cover_picture"),
            tagline: row.get("tagline"),
            bio: row.get("bio"),
            location: row.get("location"),
            website: row.get("website"),
            cooking_style: row.get("cooking_style"),
            social_media: parse_json::<SocialMedia>(row.get("social_media")),
            interests: parse_json(row.get("interests")),
            specialties: parse_json(row.get("specialties")),
            badges: parse_json::<Vec<Badge>>(row.get("badges")),
            is_verified: is_verified != 0,
            is_pro_chef: is_pro_chef != 0,
            member_since: row.get("member_since"),
            last_active: row.get("last_active"),
        },
        counters: UserCounters {
            recipes_count: row.get("recipes_count"),
            favorites_count: row.get("favorites_count"),
            reviews_count: row.get("reviews_count"),
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
            total_likes: row.get("total_likes"),
            total_views: row.get("total_views"),
        },
    }
}

pub(super) fn summary_from_row(row: &SqliteRow) -> UserSummary {
    UserSummary {
        id: row.get("id"),
        username: row.get("username"),
        name: row.get("name"),
        profile_picture: row.get("profile_picture"),
        followers_count: row.get("followers_count"),
        recipes_count: row.get("recipes_count"),
    }
}

/// Author summary from the `author_*` aliases, absent when the join missed.
fn author_from_row(row: &SqliteRow, author_id: &str) -> Option<UserSummary> {
    let username: Option<String> = row.get("author_username");
    username.map(|username| UserSummary {
        id: author_id.to_string(),
        username,
        name: row.get::<Option<String>, _>("author_name").unwrap_or_default(),
        profile_picture: row
            .get::<Option<String>, _>("author_picture")
            .unwrap_or_default(),
        followers_count: row.get::<Option<i64>, _>("author_followers").unwrap_or(0),
        recipes_count: row.get::<Option<i64>, _>("author_recipes").unwrap_or(0),
    })
}

pub(super) fn recipe_from_row(row: &SqliteRow) -> Recipe {
    let author_id: String = row.get("author_id");
    let difficulty: String = row.get("difficulty");
    let category: String = row.get("category");
    let nutrition: Option<String> = row.get("nutrition");
    Recipe {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        ingredients: parse_json(row.get("ingredients")),
        instructions: parse_json(row.get("instructions")),
        prep_time: row.get("prep_time"),
        cook_time: row.get("cook_time"),
        servings: row.get("servings"),
        difficulty: Difficulty::parse(&difficulty).unwrap_or(Difficulty::Medium),
        category: Category::parse(&category).unwrap_or(Category::Dinner),
        image_url: row.get("image_url"),
        rating: row.get("rating"),
        review_count: row.get("review_count"),
        likes_count: row.get("likes_count"),
        views: row.get("views"),
        nutrition: nutrition.and_then(|s| serde_json::from_str(&s).ok()),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        author: author_from_row(row, &author_id),
        author_id,
    }
}

pub(super) fn recipe_summary_from_row(row: &SqliteRow) -> RecipeSummary {
    RecipeSummary {
        id: row.get("id"),
        title: row.get("title"),
        image_url: row.get("image_url"),
        rating: row.get("rating"),
        views: row.get("views"),
        likes_count: row.get("likes_count"),
        created_at: row.get("created_at"),
    }
}

pub(super) fn review_from_row(row: &SqliteRow) -> Review {
    let author_id: String = row.get("author_id");
    Review {
        id: row.get("id"),
        recipe_id: row.get("recipe_id"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        author: author_from_row(row, &author_id),
        author_id,
    }
}

pub(super) fn review_summary_from_row(row: &SqliteRow) -> ReviewSummary {
    ReviewSummary {
        id: row.get("id"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        recipe_id: row.get("recipe_id"),
        recipe_title: row.get("recipe_title"),
        created_at: row.get("created_at"),
    }
}

/// Decode a JSON text column, falling back to the empty value.
pub(super) fn parse_json<T: DeserializeOwned + Default>(s: Option<String>) -> T {
    s.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Report a write that lost its referenced row as `missing()`; other errors pass through.
pub(super) fn or_missing(err: sqlx::Error, missing: impl FnOnce() -> AppError) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => missing(),
        _ => err.into(),
    }
}
