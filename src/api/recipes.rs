//! Recipe API endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
};
use serde::{Deserialize, Serialize};

use super::{created, success, ApiResult, MessageBody, ValidJson, ValidQuery};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::db::RecipeScope;
use crate::errors::{codes, AppError};
use crate::models::{
    Category, Difficulty, PageQuery, Pagination, Recipe, RecipeFilter, RecipeInput, RecipePage,
    RecipeReport, ReportRequest, Review, ShareRequest, UpdateRecipeRequest, DEFAULT_PAGE_SIZE,
};
use crate::services::ImageKind;
use crate::social::{FavoriteOutcome, SaveOutcome};
use crate::AppState;

/// Latest reviews shown on a recipe page.
const DETAIL_REVIEW_LIMIT: i64 = 5;
/// Same-category suggestions shown on a recipe page.
const SIMILAR_RECIPE_LIMIT: i64 = 4;

/// A recipe page: the recipe plus what the viewer needs around it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub reviews: Vec<Review>,
    pub similar_recipes: Vec<Recipe>,
    pub is_favorite: bool,
    pub is_saved: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShareLink {
    pub platform: String,
    pub url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub url: String,
}

/// Parse an optional filter value. "All" and blanks mean no filter.
fn parse_filter<T>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
) -> Result<Option<T>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => parse(v)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("Unknown {} '{}'", field, v))),
    }
}

async fn recipe_page(
    state: &AppState,
    scope: &RecipeScope,
    page: PageQuery,
) -> Result<RecipePage, AppError> {
    let (page, limit) = page.resolve(DEFAULT_PAGE_SIZE)?;
    let (recipes, total) = state
        .repo
        .list_recipes(scope, PageQuery::offset(page, limit), limit)
        .await?;
    Ok(RecipePage {
        recipes,
        pagination: Pagination::new(page, limit, total),
    })
}

/// GET /api/recipes - List recipes, optionally filtered.
pub async fn list_recipes(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<RecipeFilter>,
) -> ApiResult<RecipePage> {
    let scope = RecipeScope {
        category: parse_filter(filter.category.as_deref(), Category::parse, "category")?,
        difficulty: parse_filter(filter.difficulty.as_deref(), Difficulty::parse, "difficulty")?,
        author_id: None,
    };
    let page = PageQuery {
        page: filter.page,
        limit: filter.limit,
    };
    success(recipe_page(&state, &scope, page).await?)
}

/// GET /api/recipes/category/{category} - Recipes of one category.
pub async fn recipes_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<RecipePage> {
    let category = Category::parse(&category)
        .ok_or_else(|| AppError::validation(format!("Unknown category '{}'", category)))?;
    let scope = RecipeScope {
        category: Some(category),
        ..Default::default()
    };
    success(recipe_page(&state, &scope, page).await?)
}

/// GET /api/recipes/user/{user_id} - Recipes of one author.
pub async fn user_recipes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<RecipePage> {
    if !state.repo.user_exists(&user_id).await? {
        return Err(AppError::user_not_found(&user_id));
    }
    let scope = RecipeScope {
        author_id: Some(user_id),
        ..Default::default()
    };
    success(recipe_page(&state, &scope, page).await?)
}

/// GET /api/recipes/user/me - The caller's recipes.
pub async fn my_recipes(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidQuery(page): ValidQuery<PageQuery>,
) -> ApiResult<RecipePage> {
    let scope = RecipeScope {
        author_id: Some(actor.id),
        ..Default::default()
    };
    success(recipe_page(&state, &scope, page).await?)
}

/// GET /api/recipes/search?q= - Full-text search.
pub async fn search_recipes(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<SearchParams>,
) -> ApiResult<RecipePage> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::validation("Search query is required"));
    }

    let (page, limit) = PageQuery {
        page: params.page,
        limit: params.limit,
    }
    .resolve(DEFAULT_PAGE_SIZE)?;
    let hits = state
        .search
        .search(query, limit as usize, PageQuery::offset(page, limit) as usize)?;

    // The index can briefly lag the database, so vanished ids are skipped
    let mut recipes = Vec::with_capacity(hits.hits.len());
    for hit in &hits.hits {
        if let Some(recipe) = state.repo.get_recipe(&hit.recipe_id).await? {
            recipes.push(recipe);
        }
    }

    success(RecipePage {
        recipes,
        pagination: Pagination::new(page, limit, hits.total as i64),
    })
}

/// GET /api/recipes/{id} - A recipe with reviews and suggestions. Counts a view.
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<RecipeDetail> {
    let existing = state
        .repo
        .get_recipe(&id)
        .await?
        .ok_or_else(|| AppError::recipe_not_found(&id))?;

    if let Err(e) = state.repo.record_view(&id, &existing.author_id).await {
        tracing::warn!(recipe_id = %id, error = %e, "Failed to record recipe view");
    }
    let recipe = state.repo.get_recipe(&id).await?.unwrap_or(existing);

    let (reviews, _) = state.repo.list_reviews(&id, 0, DETAIL_REVIEW_LIMIT).await?;
    let similar_recipes = state
        .repo
        .similar_recipes(recipe.category, &id, SIMILAR_RECIPE_LIMIT)
        .await?;

    let (is_favorite, is_saved) = match viewer.id() {
        Some(viewer_id) => (
            state.repo.is_favorite(viewer_id, &id).await?,
            state.repo.is_saved(viewer_id, &id).await?,
        ),
        None => (false, false),
    };

    success(RecipeDetail {
        recipe,
        reviews,
        similar_recipes,
        is_favorite,
        is_saved,
    })
}

/// POST /api/recipes - Publish a recipe.
pub async fn create_recipe(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidJson(input): ValidJson<RecipeInput>,
) -> ApiResult<Recipe> {
    created(state.social.create_recipe(&actor, &input).await?)
}

/// PUT /api/recipes/{id} - Update a recipe. Author only.
pub async fn update_recipe(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateRecipeRequest>,
) -> ApiResult<Recipe> {
    success(state.social.update_recipe(&actor, &id, &request).await?)
}

/// DELETE /api/recipes/{id} - Delete a recipe. Author only.
pub async fn delete_recipe(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<MessageBody> {
    state.social.delete_recipe(&actor, &id).await?;
    success(MessageBody::new("Recipe deleted successfully"))
}

/// POST /api/recipes/upload-image - Store a recipe image, returning its URL.
pub async fn upload_recipe_image(
    State(state): State<AppState>,
    _actor: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UploadedImage> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let url = state.images.store(ImageKind::Recipe, content_type, &body).await?;
    created(UploadedImage { url })
}

fn build(base: &str, params: &[(&str, &str)]) -> Result<String, AppError> {
    url::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| AppError::Internal(format!("Failed to build share URL: {}", e)))
}

/// Build the share URL of a recipe for a platform.
pub fn share_url(
    public_url: &str,
    recipe_id: &str,
    title: &str,
    platform: &str,
) -> Result<String, AppError> {
    let recipe_url = format!("{}/recipes/{}", public_url.trim_end_matches('/'), recipe_id);
    let message = format!("{} {}", title, recipe_url);
    match platform {
        "twitter" => build(
            "https://twitter.com/intent/tweet",
            &[("text", title), ("url", recipe_url.as_str())],
        ),
        "facebook" => build(
            "https://www.facebook.com/sharer/sharer.php",
            &[("u", recipe_url.as_str())],
        ),
        "whatsapp" => build("https://wa.me/", &[("text", message.as_str())]),
        "copy" => Ok(recipe_url),
        other => Err(AppError::validation_code(
            codes::UNSUPPORTED_PLATFORM,
            format!("Unsupported platform '{}'", other),
        )),
    }
}

/// POST /api/recipes/{id}/share - Share link for a platform.
pub async fn share_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<ShareRequest>,
) -> ApiResult<ShareLink> {
    let recipe = state
        .repo
        .get_recipe(&id)
        .await?
        .ok_or_else(|| AppError::recipe_not_found(&id))?;

    let platform = request.platform.trim().to_lowercase();
    let url = share_url(&state.config.public_url, &recipe.id, &recipe.title, &platform)?;
    let message = if platform == "copy" {
        "Link copied to clipboard".to_string()
    } else {
        format!("Share URL generated for {}", platform)
    };

    success(ShareLink {
        platform,
        url,
        message,
    })
}

/// POST /api/recipes/{id}/report - Flag a recipe for moderation.
pub async fn report_recipe(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<ReportRequest>,
) -> ApiResult<RecipeReport> {
    let reason = request.reason()?;
    created(state.social.report_recipe(&actor, &id, reason).await?)
}

// ==================== FAVORITES & SAVES ====================

/// POST /api/recipes/{id}/favorite
pub async fn add_favorite(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<FavoriteOutcome> {
    success(state.social.add_favorite(&actor, &id).await?)
}

/// DELETE /api/recipes/{id}/favorite
pub async fn remove_favorite(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<FavoriteOutcome> {
    success(state.social.remove_favorite(&actor, &id).await?)
}

/// POST /api/recipes/{id}/favorite/toggle
pub async fn toggle_favorite(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<FavoriteOutcome> {
    success(state.social.toggle_favorite(&actor, &id).await?)
}

/// POST /api/recipes/{id}/save
pub async fn save_recipe(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<SaveOutcome> {
    success(state.social.save_recipe(&actor, &id).await?)
}

/// DELETE /api/recipes/{id}/save
pub async fn unsave_recipe(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<SaveOutcome> {
    success(state.social.unsave_recipe(&actor, &id).await?)
}

/// GET /api/recipes/favorites/me - Recipes the caller favorited.
pub async fn my_favorites(State(state): State<AppState>, actor: AuthUser) -> ApiResult<Vec<Recipe>> {
    success(state.repo.favorite_recipes(&actor.id).await?)
}

/// GET /api/recipes/saved/me - Recipes the caller saved.
pub async fn my_saved(State(state): State<AppState>, actor: AuthUser) -> ApiResult<Vec<Recipe>> {
    success(state.repo.saved_recipes(&actor.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_urls() {
        let base = "http://localhost:4200";
        assert_eq!(
            share_url(base, "r1", "Tea", "copy").unwrap(),
            "http://localhost:4200/recipes/r1"
        );
        assert_eq!(
            share_url(base, "r1", "Mac & Cheese", "twitter").unwrap(),
            "https://twitter.com/intent/tweet?text=Mac+%26+Cheese&url=http%3A%2F%2Flocalhost%3A4200%2Frecipes%2Fr1"
        );
        assert!(share_url(base, "r1", "Tea", "facebook")
            .unwrap()
            .starts_with("https://www.facebook.com/sharer/sharer.php?u="));
        assert!(share_url(base, "r1", "Tea", "whatsapp")
            .unwrap()
            .starts_with("https://wa.me/?text=Tea+"));
    }

    #[test]
    fn test_unsupported_platform() {
        let err = share_url("http://x", "r1", "Tea", "myspace").unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_PLATFORM");
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(None, Category::parse, "category").unwrap(), None);
        assert_eq!(parse_filter(Some("All"), Category::parse, "category").unwrap(), None);
        assert_eq!(
            parse_filter(Some("Soups"), Category::parse, "category").unwrap(),
            Some(Category::Soups)
        );
        assert!(parse_filter(Some("Pizza"), Category::parse, "category").is_err());
    }
}
