//! User persistence: accounts, profiles, counters and credential fields.

use sqlx::Row;

use super::repository::{summary_from_row, to_json, user_from_row, SUMMARY_COLUMNS, USER_COLUMNS};
use super::{now_timestamp, Repository};
use crate::errors::{codes, AppError};
use crate::models::{Badge, ChefEntry, SocialMedia, User, UserCounters, UserProfile, UserSummary};

/// Fields required to create an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Stored login material for one account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password_hash: String,
}

/// A pending password reset.
#[derive(Debug, Clone)]
pub struct ResetTicket {
    pub token_hash: String,
    pub expires_at: String,
}

/// Limit of the top chefs listing.
pub const TOP_CHEFS_LIMIT: i64 = 50;

impl Repository {
    // ==================== USER OPERATIONS ====================

    /// Create a new user with zeroed counters.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        let result = sqlx::query(
            r#"INSERT INTO users (id, name, username, email, password_hash, social_media,
                   interests, specialties, badges, member_since, last_active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, '{}', '[]', '[]', '[]', ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&new_user.name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.is_unique_violation() {
                return Err(if db_err.message().contains("users.email") {
                    AppError::invalid_state(codes::EMAIL_EXISTS, "Email already registered")
                } else {
                    AppError::invalid_state(codes::USERNAME_EXISTS, "Username already taken")
                });
            }
        }
        result?;

        self.get_user(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn user_exists(&self, id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Get the compact author reference for a user.
    pub async fn get_user_summary(&self, id: &str) -> Result<Option<UserSummary>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = ?",
            SUMMARY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(summary_from_row))
    }

    /// Look up login material by (lowercased) email.
    pub async fn get_credentials(&self, email: &str) -> Result<Option<Credentials>, AppError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Credentials {
            user_id: row.get("id"),
            password_hash: row.get("password_hash"),
        }))
    }

    /// Login material of an account by id.
    pub async fn get_credentials_by_id(&self, id: &str) -> Result<Option<Credentials>, AppError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Credentials {
            user_id: row.get("id"),
            password_hash: row.get("password_hash"),
        }))
    }

    /// Find the user registered under an email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Whether another account already uses this username.
    pub async fn username_taken(
        &self,
        username: &str,
        except_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ? AND id != ?")
            .bind(username)
            .bind(except_id.unwrap_or(""))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Whether another account already uses this email.
    pub async fn email_taken(&self, email: &str, except_id: Option<&str>) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(except_id.unwrap_or(""))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Persist the editable profile fields. Counters are not touched.
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let now = now_timestamp();
        let result = sqlx::query(
            r#"UPDATE users SET
                name = ?, username = ?, email = COALESCE(?, email), tagline = ?, bio = ?, location = ?,
                website = ?, cooking_style = ?, social_media = ?, interests = ?, specialties = ?,
                is_pro_chef = ?, last_active = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&profile.name)
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.tagline)
        .bind(&profile.bio)
        .bind(&profile.location)
        .bind(&profile.website)
        .bind(&profile.cooking_style)
        .bind(to_json::<SocialMedia>(&profile.social_media))
        .bind(to_json(&profile.interests))
        .bind(to_json(&profile.specialties))
        .bind(profile.is_pro_chef as i32)
        .bind(&now)
        .bind(&now)
        .bind(&profile.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found(&profile.id));
        }
        Ok(())
    }

    pub async fn set_profile_picture(&self, id: &str, url: &str) -> Result<(), AppError> {
        self.set_picture_column("profile_picture", id, url).await
    }

    pub async fn set_cover_picture(&self, id: &str, url: &str) -> Result<(), AppError> {
        self.set_picture_column("cover_picture", id, url).await
    }

    async fn set_picture_column(&self, column: &str, id: &str, url: &str) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            "UPDATE users SET {} = ?, updated_at = ? WHERE id = ?",
            column
        ))
        .bind(url)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found(id));
        }
        Ok(())
    }

    pub async fn touch_last_active(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_active = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the password hash and invalidate any pending reset.
    pub async fn set_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE users SET password_hash = ?, reset_token_hash = NULL,
                   reset_token_expires = NULL, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(password_hash)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn store_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET reset_token_hash = ?, reset_token_expires = ? WHERE id = ?")
            .bind(token_hash)
            .bind(expires_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_reset_ticket(&self, id: &str) -> Result<Option<ResetTicket>, AppError> {
        let row = sqlx::query(
            "SELECT reset_token_hash, reset_token_expires FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|row| {
            let token_hash: Option<String> = row.get("reset_token_hash");
            let expires_at: Option<String> = row.get("reset_token_expires");
            Some(ResetTicket {
                token_hash: token_hash?,
                expires_at: expires_at?,
            })
        }))
    }

    pub async fn save_badges(&self, id: &str, badges: &[Badge]) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET badges = ?, updated_at = ? WHERE id = ?")
            .bind(to_json(badges))
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Overwrite the cached counters with recomputed values.
    pub async fn persist_counters(
        &self,
        id: &str,
        counters: &UserCounters,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE users SET
                recipes_count = ?, favorites_count = ?, reviews_count = ?, followers_count = ?,
                following_count = ?, total_likes = ?, total_views = ?
            WHERE id = ?"#,
        )
        .bind(counters.recipes_count)
        .bind(counters.favorites_count)
        .bind(counters.reviews_count)
        .bind(counters.followers_count)
        .bind(counters.following_count)
        .bind(counters.total_likes)
        .bind(counters.total_views)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Top chefs ordered by the persisted counters.
    pub async fn list_chefs(&self) -> Result<Vec<ChefEntry>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, username, name, profile_picture, bio, recipes_count, followers_count,
                      is_verified, social_media, created_at
               FROM users
               ORDER BY recipes_count DESC, followers_count DESC, created_at DESC
               LIMIT ?"#,
        )
        .bind(TOP_CHEFS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let is_verified: i32 = row.get("is_verified");
                let social_media: Option<String> = row.get("social_media");
                ChefEntry {
                    id: row.get("id"),
                    username: row.get("username"),
                    name: row.get("name"),
                    profile_picture: row.get("profile_picture"),
                    bio: row.get("bio"),
                    recipes_count: row.get("recipes_count"),
                    followers_count: row.get("followers_count"),
                    is_verified: is_verified != 0,
                    social_media: social_media
                        .and_then(|s| serde_json::from_str(&s).ok())
                        .unwrap_or_default(),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    /// Users following `id`, most recent first.
    pub async fn list_followers(
        &self,
        id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<UserSummary>, i64), AppError> {
        self.list_follow_side(
            "SELECT u.id, u.username, u.name, u.profile_picture, u.followers_count, u.recipes_count
             FROM follows f JOIN users u ON u.id = f.follower_id
             WHERE f.followee_id = ? ORDER BY f.created_at DESC LIMIT ? OFFSET ?",
            "SELECT COUNT(*) AS total FROM follows WHERE followee_id = ?",
            id,
            offset,
            limit,
        )
        .await
    }

    /// Users `id` follows, most recent first.
    pub async fn list_following(
        &self,
        id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<UserSummary>, i64), AppError> {
        self.list_follow_side(
            "SELECT u.id, u.username, u.name, u.profile_picture, u.followers_count, u.recipes_count
             FROM follows f JOIN users u ON u.id = f.followee_id
             WHERE f.follower_id = ? ORDER BY f.created_at DESC LIMIT ? OFFSET ?",
            "SELECT COUNT(*) AS total FROM follows WHERE follower_id = ?",
            id,
            offset,
            limit,
        )
        .await
    }

    async fn list_follow_side(
        &self,
        page_sql: &str,
        count_sql: &str,
        id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<UserSummary>, i64), AppError> {
        let rows = sqlx::query(page_sql)
            .bind(id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query(count_sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
            .get("total");

        Ok((rows.iter().map(summary_from_row).collect(), total))
    }
}
