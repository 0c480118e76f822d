//! Notification persistence.

use sqlx::{sqlite::SqliteRow, Row};

use super::Repository;
use crate::errors::AppError;
use crate::models::{Notification, NotificationKind, NotificationRecipe, NotificationSender};

/// A notification about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub recipe_id: Option<String>,
}

const NOTIFICATION_COLUMNS: &str = "n.id, n.recipient_id, n.sender_id, n.kind, n.title, \
    n.message, n.recipe_id, n.read, n.created_at, s.username AS sender_username, \
    s.name AS sender_name, s.profile_picture AS sender_picture, r.title AS recipe_title, \
    r.image_url AS recipe_image";

const NOTIFICATION_SOURCE: &str = "notifications n \
    LEFT JOIN users s ON s.id = n.sender_id \
    LEFT JOIN recipes r ON r.id = n.recipe_id";

impl Repository {
    // ==================== NOTIFICATION OPERATIONS ====================

    /// Whether an identical notification was written at or after `since`.
    ///
    /// Sender and recipe only take part in the match when present.
    pub async fn has_recent_duplicate(
        &self,
        notification: &NewNotification,
        since: &str,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            r#"SELECT 1 FROM notifications
               WHERE recipient_id = ? AND kind = ?
                 AND (? IS NULL OR sender_id = ?)
                 AND (? IS NULL OR recipe_id = ?)
                 AND created_at >= ?
               LIMIT 1"#,
        )
        .bind(&notification.recipient_id)
        .bind(notification.kind.as_str())
        .bind(&notification.sender_id)
        .bind(&notification.sender_id)
        .bind(&notification.recipe_id)
        .bind(&notification.recipe_id)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Write a notification stamped with `created_at`.
    pub async fn insert_notification(
        &self,
        notification: &NewNotification,
        created_at: &str,
    ) -> Result<Notification, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"INSERT INTO notifications (id, recipient_id, sender_id, kind, title, message,
                   recipe_id, read, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(&id)
        .bind(&notification.recipient_id)
        .bind(&notification.sender_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.recipe_id)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id,
            recipient_id: notification.recipient_id.clone(),
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            read: false,
            created_at: created_at.to_string(),
            sender_id: notification.sender_id.clone(),
            sender: None,
            recipe_id: notification.recipe_id.clone(),
            recipe: None,
        })
    }

    /// Get a notification with its sender and recipe summaries.
    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE n.id = ?",
            NOTIFICATION_COLUMNS, NOTIFICATION_SOURCE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(notification_from_row))
    }

    /// A recipient's notifications, newest first, with the total count.
    pub async fn list_notifications(
        &self,
        recipient_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Notification>, i64), AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE n.recipient_id = ? \
             ORDER BY n.created_at DESC, n.rowid DESC LIMIT ? OFFSET ?",
            NOTIFICATION_COLUMNS, NOTIFICATION_SOURCE
        ))
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM notifications WHERE recipient_id = ?")
                .bind(recipient_id)
                .fetch_one(&self.pool)
                .await?
                .get("total");

        Ok((rows.iter().filter_map(notification_from_row).collect(), total))
    }

    pub async fn unread_count(&self, recipient_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM notifications WHERE recipient_id = ? AND read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("total"))
    }

    /// Mark one notification read. Returns false when the recipient owns no such notification.
    pub async fn mark_notification_read(
        &self,
        id: &str,
        recipient_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND recipient_id = ?")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<u64, AppError> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE recipient_id = ? AND read = 0")
                .bind(recipient_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_notification(&self, id: &str, recipient_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND recipient_id = ?")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_notifications(&self, recipient_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = ?")
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Rows with an unknown kind are skipped.
fn notification_from_row(row: &SqliteRow) -> Option<Notification> {
    let kind: String = row.get("kind");
    let kind = NotificationKind::parse(&kind)?;
    let read: i32 = row.get("read");
    let sender_id: Option<String> = row.get("sender_id");
    let recipe_id: Option<String> = row.get("recipe_id");

    let sender_username: Option<String> = row.get("sender_username");
    let sender = match (&sender_id, sender_username) {
        (Some(id), Some(username)) => Some(NotificationSender {
            id: id.clone(),
            username,
            name: row.get::<Option<String>, _>("sender_name").unwrap_or_default(),
            profile_picture: row
                .get::<Option<String>, _>("sender_picture")
                .unwrap_or_default(),
        }),
        _ => None,
    };

    let recipe_title: Option<String> = row.get("recipe_title");
    let recipe = match (&recipe_id, recipe_title) {
        (Some(id), Some(title)) => Some(NotificationRecipe {
            id: id.clone(),
            title,
            image_url: row.get("recipe_image"),
        }),
        _ => None,
    };

    Some(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        kind,
        title: row.get("title"),
        message: row.get("message"),
        read: read != 0,
        created_at: row.get("created_at"),
        sender_id,
        sender,
        recipe_id,
        recipe,
    })
}
