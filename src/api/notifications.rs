//! Notification API endpoints. Every route acts on the caller's own inbox.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{success, ApiResult, MessageBody, ValidQuery};
use crate::auth::AuthUser;
use crate::errors::{codes, AppError};
use crate::models::{Notification, PageQuery, Pagination};
use crate::AppState;

/// Default page size of the inbox.
const INBOX_PAGE_SIZE: i64 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub message: String,
    pub affected: u64,
}

fn notification_not_found(id: &str) -> AppError {
    AppError::not_found(
        codes::NOTIFICATION_NOT_FOUND,
        format!("Notification {} not found", id),
    )
}

/// GET /api/notifications - The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<NotificationPage> {
    let (page, limit) = page.resolve(INBOX_PAGE_SIZE)?;
    let (notifications, total) = state
        .repo
        .list_notifications(&actor.id, PageQuery::offset(page, limit), limit)
        .await?;
    let unread_count = state.repo.unread_count(&actor.id).await?;

    success(NotificationPage {
        notifications,
        pagination: Pagination::new(page, limit, total),
        unread_count,
    })
}

/// GET /api/notifications/unread-count
pub async fn unread_count(State(state): State<AppState>, actor: AuthUser) -> ApiResult<UnreadCount> {
    success(UnreadCount {
        unread_count: state.repo.unread_count(&actor.id).await?,
    })
}

/// PATCH /api/notifications/{id}/read - Mark one notification read.
pub async fn mark_read(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    if !state.repo.mark_notification_read(&id, &actor.id).await? {
        return Err(notification_not_found(&id));
    }
    let notification = state
        .repo
        .get_notification(&id)
        .await?
        .ok_or_else(|| notification_not_found(&id))?;
    success(notification)
}

/// PATCH /api/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, actor: AuthUser) -> ApiResult<BulkResult> {
    let affected = state.repo.mark_all_notifications_read(&actor.id).await?;
    success(BulkResult {
        message: "All notifications marked as read".to_string(),
        affected,
    })
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<MessageBody> {
    if !state.repo.delete_notification(&id, &actor.id).await? {
        return Err(notification_not_found(&id));
    }
    success(MessageBody::new("Notification deleted"))
}

/// DELETE /api/notifications - Clear the caller's inbox.
pub async fn clear_notifications(
    State(state): State<AppState>,
    actor: AuthUser,
) -> ApiResult<BulkResult> {
    let affected = state.repo.clear_notifications(&actor.id).await?;
    tracing::info!(user_id = %actor.id, affected, "Notifications cleared");
    success(BulkResult {
        message: "All notifications cleared".to_string(),
        affected,
    })
}
