//! Review API endpoints.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{created, success, ApiResult, MessageBody, ValidJson, ValidQuery};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{AddReviewRequest, PageQuery, Pagination, Review, DEFAULT_PAGE_SIZE};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// GET /api/recipes/{id}/reviews - Reviews of a recipe, newest first.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<ReviewPage> {
    if state.repo.get_recipe(&recipe_id).await?.is_none() {
        return Err(AppError::recipe_not_found(&recipe_id));
    }

    let (page, limit) = page.resolve(DEFAULT_PAGE_SIZE)?;
    let (reviews, total) = state
        .repo
        .list_reviews(&recipe_id, PageQuery::offset(page, limit), limit)
        .await?;

    success(ReviewPage {
        reviews,
        pagination: Pagination::new(page, limit, total),
    })
}

/// POST /api/recipes/{id}/reviews - Review a recipe.
pub async fn add_review(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(recipe_id): Path<String>,
    ValidJson(request): ValidJson<AddReviewRequest>,
) -> ApiResult<Review> {
    created(state.social.add_review(&actor, &recipe_id, &request).await?)
}

/// DELETE /api/recipes/{id}/reviews/{review_id} - Delete the caller's review.
pub async fn delete_review(
    State(state): State<AppState>,
    actor: AuthUser,
    Path((recipe_id, review_id)): Path<(String, String)>,
) -> ApiResult<MessageBody> {
    state
        .social
        .delete_review(&actor, &recipe_id, &review_id)
        .await?;
    success(MessageBody::new("Review deleted successfully"))
}
